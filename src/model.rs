use crate::dataset::Dataset;
use crate::types::VariableRole;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("variable '{name}' not found in dataset '{dataset}'")]
    VariableNotFound { name: String, dataset: String },
    #[error("interaction term '{0}' arrived before any interaction was opened")]
    NoOpenInteraction(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectKind {
    Categorical,
    Direct,
}

/// One registered main effect. `var` indexes the dataset; direct effects
/// enter the design matrix as their raw numeric value.
#[derive(Debug, Clone)]
pub struct MainEffect {
    pub var: usize,
    pub name: String,
    pub kind: EffectKind,
}

/// An interaction group. `terms` index into the model's main-effect list,
/// not into the dataset.
#[derive(Debug, Clone)]
pub struct Interaction {
    pub terms: Vec<usize>,
    pub name: String,
}

/// A parsed model: dependent variable, ordered main effects, ordered
/// interaction groups.
#[derive(Debug, Clone)]
pub struct Model {
    pub dv: usize,
    pub dv_name: String,
    pub main_effects: Vec<MainEffect>,
    pub interactions: Vec<Interaction>,
}

impl Model {
    pub fn new(ds: &Dataset, dv_name: &str) -> Result<Self, ModelError> {
        let mut model = Model {
            dv: 0,
            dv_name: String::new(),
            main_effects: Vec::new(),
            interactions: Vec::new(),
        };
        model.add_variable(ds, dv_name, VariableRole::Dependent)?;
        Ok(model)
    }

    /// Register one variable under the given role.
    ///
    /// Duplicate main effects and duplicate terms within one interaction are
    /// warnings, not errors. An interaction term that has no main effect yet
    /// is auto-registered as a categorical main effect, with a warning.
    pub fn add_variable(
        &mut self,
        ds: &Dataset,
        name: &str,
        role: VariableRole,
    ) -> Result<(), ModelError> {
        let var = ds
            .find_var(name)
            .ok_or_else(|| ModelError::VariableNotFound {
                name: name.to_string(),
                dataset: ds.handle().to_string(),
            })?;

        if role == VariableRole::Dependent {
            self.dv = var;
            self.dv_name = name.to_string();
            return Ok(());
        }

        let existing = self.main_effects.iter().position(|e| e.var == var);

        let term = match (existing, role) {
            (Some(_), VariableRole::Main | VariableRole::Direct) => {
                log::warn!("variable already exists in model: {name}");
                return Ok(());
            }
            (Some(i), _) => i,
            (None, _) => {
                if matches!(
                    role,
                    VariableRole::NewInteraction | VariableRole::Interaction
                ) {
                    log::warn!(
                        "interaction variable will also be added as a main effect: {name}"
                    );
                }
                self.main_effects.push(MainEffect {
                    var,
                    name: name.to_string(),
                    kind: if role == VariableRole::Direct {
                        EffectKind::Direct
                    } else {
                        EffectKind::Categorical
                    },
                });
                self.main_effects.len() - 1
            }
        };

        match role {
            VariableRole::NewInteraction => {
                self.interactions.push(Interaction {
                    terms: vec![term],
                    name: name.to_string(),
                });
            }
            VariableRole::Interaction => {
                let group = self
                    .interactions
                    .last_mut()
                    .ok_or_else(|| ModelError::NoOpenInteraction(name.to_string()))?;
                if group.terms.contains(&term) {
                    log::warn!("interaction variable already exists: {name}");
                    return Ok(());
                }
                group.terms.push(term);
                group.name = format!("{}*{}", group.name, name);
            }
            _ => {}
        }

        Ok(())
    }
}
