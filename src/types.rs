use serde::{Deserialize, Serialize};

/// Parameterization used for categorical main effects and their interactions.
///
/// Center-point codes the k-th smallest level as +1 in column k and the
/// largest level as -1 in every column; dummy coding drops the -1 row so the
/// largest level is all zeros. Direct effects ignore the coding entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Coding {
    CenterPoint,
    Dummy,
}

impl Coding {
    /// Resolve the `params` option value. Anything other than `"dummy"`
    /// (including an unset option) selects the full-rank center-point scheme.
    pub fn from_option(value: Option<&str>) -> Self {
        match value {
            Some("dummy") => Coding::Dummy,
            _ => Coding::CenterPoint,
        }
    }
}

/// Role under which a variable is registered into a model.
///
/// `NewInteraction` opens a fresh interaction group with the named variable
/// as its first term; `Interaction` appends to the most recently opened
/// group. Both auto-register the variable as a categorical main effect when
/// it is not already present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariableRole {
    Dependent,
    Main,
    Direct,
    NewInteraction,
    Interaction,
}
