#![deny(dead_code)]
#![deny(unused_imports)]

pub mod command;
pub mod construction;
pub mod dataset;
pub mod estimate;
pub mod linalg;
pub mod model;
pub mod newton;
pub mod probability;
pub mod report;
pub mod session;
pub mod tabulate;
pub mod types;

pub use construction::{build_design, ConstructionError, Design};
pub use dataset::{compare_values, values_equal, Dataset, DatasetError, SYSMIS};
pub use estimate::{
    fit, EstimationError, FitOptions, FitResult, FitTests, ParameterEstimate, EPSILON, MAX_ITER,
};
pub use model::{EffectKind, Interaction, MainEffect, Model, ModelError};
pub use newton::{newton_raphson, NewtonError, NewtonStep};
pub use session::{Options, Session};
pub use tabulate::{frequency_table, tabulate, Crosstab, FrequencyTable, Tabulation};
pub use types::{Coding, VariableRole};
