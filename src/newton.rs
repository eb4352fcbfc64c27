use crate::construction::Design;
use crate::linalg::{
    cholesky_upper_in_place, invert_upper_in_place, upper_self_product, FactorError,
};
use ndarray::{Array1, Array2};
use statrs::function::gamma::ln_gamma;
use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum NewtonError {
    #[error("information matrix is not positive definite")]
    NotPositiveDefinite,
    #[error("singular triangular system while inverting the information matrix")]
    SingularInversion,
}

impl NewtonError {
    /// Stage code of the failed primitive, matching the original estimator's
    /// return values: 11 for the Cholesky factorization, 12 for the
    /// triangular back-substitution.
    pub fn stage(&self) -> u32 {
        match self {
            NewtonError::NotPositiveDefinite => 11,
            NewtonError::SingularInversion => 12,
        }
    }
}

impl From<FactorError> for NewtonError {
    fn from(e: FactorError) -> Self {
        match e {
            FactorError::NotPositiveDefinite => NewtonError::NotPositiveDefinite,
            FactorError::ZeroDiagonal => NewtonError::SingularInversion,
        }
    }
}

/// Output of one Newton-Raphson iteration. The log-likelihood and deviance
/// are evaluated at the *incoming* parameter vector, before the update.
#[derive(Debug)]
pub struct NewtonStep {
    pub beta: Array1<f64>,
    /// Inverse of the observed information matrix, `(X'WX)^-1`.
    pub info_inverse: Array2<f64>,
    pub log_likelihood: f64,
    pub deviance: f64,
}

/// One Newton-Raphson step for the multinomial log-likelihood.
///
/// The parameter vector is laid out column-major by response equation:
/// entry `j*K + k` is the coefficient of design column `k` in the equation
/// for response category `j`, for `j < J-1`; the largest response category
/// is the omitted reference.
pub fn newton_raphson(design: &Design, beta0: &Array1<f64>) -> Result<NewtonStep, NewtonError> {
    let n_pops = design.n_populations();
    let k = design.n_params();
    let j_levels = design.n_response_levels();
    let n_eqs = j_levels.saturating_sub(1);
    let order = k * n_eqs;

    let mut g = Array1::<f64>::zeros(order);
    let mut h = Array2::<f64>::zeros((order, order));
    let mut pi = vec![0.0; j_levels];
    let mut log_likelihood = 0.0;
    let mut deviance = 0.0;

    for i in 0..n_pops {
        let n_i = design.totals[i];

        let mut denom = 1.0;
        for j in 0..n_eqs {
            let mut eta = 0.0;
            for col in 0..k {
                eta += design.x[[i, col]] * beta0[j * k + col];
            }
            pi[j] = eta.exp();
            denom += pi[j];
        }
        for p in pi.iter_mut().take(n_eqs) {
            *p /= denom;
        }
        pi[j_levels - 1] = 1.0 / denom;

        log_likelihood += ln_gamma(n_i + 1.0);
        for j in 0..j_levels {
            let y_ij = design.y[[i, j]];
            log_likelihood += -ln_gamma(y_ij + 1.0) + y_ij * pi[j].ln();
            if y_ij > 0.0 {
                deviance += 2.0 * y_ij * (y_ij / (n_i * pi[j])).ln();
            }
        }

        for j in 0..n_eqs {
            let q1 = design.y[[i, j]] - n_i * pi[j];
            let w1 = n_i * pi[j] * (1.0 - pi[j]);
            for col in 0..k {
                let row = j * k + col;
                let x_ik = design.x[[i, col]];
                g[row] += q1 * x_ik;

                for col2 in col..k {
                    let entry = w1 * x_ik * design.x[[i, col2]];
                    h[[row, j * k + col2]] += entry;
                    h[[j * k + col2, row]] = h[[row, j * k + col2]];
                }

                for j2 in (j + 1)..n_eqs {
                    let w2 = -n_i * pi[j] * pi[j2];
                    for col2 in 0..k {
                        let entry = w2 * x_ik * design.x[[i, col2]];
                        h[[row, j2 * k + col2]] += entry;
                        h[[j2 * k + col2, row]] = h[[row, j2 * k + col2]];
                    }
                }
            }
        }
    }

    // Right-hand side of the update: X'WX beta0 + X'(y - mu).
    let rhs = &g + &h.dot(beta0);

    cholesky_upper_in_place(&mut h)?;
    invert_upper_in_place(&mut h)?;
    let mut info_inverse = Array2::<f64>::zeros((order, order));
    upper_self_product(&h, &mut info_inverse);

    let beta = info_inverse.dot(&rhs);

    Ok(NewtonStep {
        beta,
        info_inverse,
        log_likelihood,
        deviance,
    })
}
