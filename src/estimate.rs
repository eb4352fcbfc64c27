use crate::construction::{build_design, ConstructionError, Design};
use crate::dataset::Dataset;
use crate::model::Model;
use crate::newton::{newton_raphson, NewtonError};
use crate::probability::chi_square_upper_tail;
use crate::tabulate::{tabulate, Tabulation};
use crate::types::Coding;
use ndarray::{Array1, Array2};
use thiserror::Error;

pub const MAX_ITER: usize = 30;
pub const EPSILON: f64 = 1e-8;

#[derive(Debug, Error)]
pub enum EstimationError {
    #[error(transparent)]
    Construction(#[from] ConstructionError),
}

#[derive(Debug, Clone)]
pub struct FitOptions {
    pub max_iter: usize,
    pub epsilon: f64,
    pub coding: Coding,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            max_iter: MAX_ITER,
            epsilon: EPSILON,
            coding: Coding::CenterPoint,
        }
    }
}

/// One row of the parameter table. `response` is the response-equation
/// index j; undefined statistics carry NaN with `p_value` set to -1.
#[derive(Debug, Clone)]
pub struct ParameterEstimate {
    pub label: String,
    pub response: usize,
    pub estimate: f64,
    pub std_err: f64,
    pub wald: f64,
    pub p_value: f64,
}

/// The two goodness-of-fit tests, computed only on convergence.
#[derive(Debug, Clone, Copy)]
pub struct FitTests {
    /// Fitted model against the zero-parameter baseline.
    pub chi_intercept: f64,
    pub df_intercept: f64,
    pub p_intercept: f64,
    /// Fitted model against the saturated model.
    pub chi_saturated: f64,
    pub df_saturated: f64,
    pub p_saturated: f64,
}

pub struct FitResult {
    pub tabulation: Tabulation,
    pub design: Design,
    pub beta: Array1<f64>,
    pub info_inverse: Array2<f64>,
    pub iterations: usize,
    pub converged: bool,
    pub failure: Option<NewtonError>,
    /// Log-likelihood recorded on the first iteration, at beta = 0.
    pub log_likelihood0: f64,
    pub log_likelihood: f64,
    pub deviance: f64,
    pub tests: Option<FitTests>,
    pub parameters: Vec<ParameterEstimate>,
}

/// Fit a multinomial logistic regression model by Newton-Raphson.
///
/// Numeric failures inside an iteration (stage 11/12) are not errors at
/// this level: the fit completes with `converged = false` and the failed
/// stage recorded, so the caller can still render a non-converged report.
pub fn fit(ds: &Dataset, model: &Model, options: &FitOptions) -> Result<FitResult, EstimationError> {
    let tabulation = tabulate(ds, model);
    let design = build_design(&tabulation, model, options.coding)?;

    let order = design.n_params() * design.n_response_levels().saturating_sub(1);
    let mut beta = Array1::<f64>::zeros(order);
    let mut info_inverse = Array2::<f64>::zeros((order, order));
    let mut log_likelihood = 0.0;
    let mut log_likelihood0 = 0.0;
    let mut deviance = 0.0;
    let mut iterations = 0;
    let mut converged = false;
    let mut failure = None;

    while iterations < options.max_iter && !converged {
        let previous = beta.clone();
        match newton_raphson(&design, &previous) {
            Ok(step) => {
                beta = step.beta;
                info_inverse = step.info_inverse;
                log_likelihood = step.log_likelihood;
                deviance = step.deviance;
                converged = beta
                    .iter()
                    .zip(previous.iter())
                    .all(|(b, b0)| (b - b0).abs() <= options.epsilon * b0.abs());
                if iterations == 0 {
                    log_likelihood0 = log_likelihood;
                }
                log::debug!(
                    "iteration {iterations}: log-likelihood {log_likelihood:.6}, \
                     deviance {deviance:.6}, converged {converged}"
                );
                iterations += 1;
            }
            Err(e) => {
                log::warn!(
                    "newton-raphson failed at iteration {iterations} (stage {}): {e}",
                    e.stage()
                );
                failure = Some(e);
                converged = false;
                break;
            }
        }
    }

    let tests = if converged {
        let k = design.n_params() as f64;
        let j = design.n_response_levels() as f64;
        let n = design.n_populations() as f64;

        let chi_intercept = 2.0 * (log_likelihood - log_likelihood0);
        let df_intercept = k * (j - 1.0) - j - 1.0;
        let chi_saturated = deviance;
        let df_saturated = n * (j - 1.0) - k * (j - 1.0);
        Some(FitTests {
            chi_intercept,
            df_intercept,
            p_intercept: chi_square_upper_tail(chi_intercept, df_intercept),
            chi_saturated,
            df_saturated,
            p_saturated: chi_square_upper_tail(chi_saturated, df_saturated),
        })
    } else {
        None
    };

    let parameters = parameter_table(&design, &beta, &info_inverse, converged);

    Ok(FitResult {
        tabulation,
        design,
        beta,
        info_inverse,
        iterations,
        converged,
        failure,
        log_likelihood0,
        log_likelihood,
        deviance,
        tests,
        parameters,
    })
}

/// Wald statistics per parameter: defined only when the fit converged and
/// the corresponding diagonal of the inverse information is positive.
fn parameter_table(
    design: &Design,
    beta: &Array1<f64>,
    info_inverse: &Array2<f64>,
    converged: bool,
) -> Vec<ParameterEstimate> {
    let k = design.n_params();
    let n_eqs = design.n_response_levels().saturating_sub(1);
    let mut rows = Vec::with_capacity(k * n_eqs);
    for col in 0..k {
        for j in 0..n_eqs {
            let idx = j * k + col;
            let estimate = beta[idx];
            let variance = info_inverse[[idx, idx]];
            let (std_err, wald, p_value) = if converged && variance > 0.0 {
                let std_err = variance.sqrt();
                let wald = (estimate / std_err).powi(2);
                (std_err, wald, chi_square_upper_tail(wald, 1.0))
            } else {
                (f64::NAN, f64::NAN, -1.0)
            };
            rows.push(ParameterEstimate {
                label: design.labels[col].clone(),
                response: j,
                estimate,
                std_err,
                wald,
                p_value,
            });
        }
    }
    rows
}
