use statrs::distribution::{ChiSquared, ContinuousCDF};

/// Upper-tail probability of the chi-square distribution with `df` degrees
/// of freedom. Total over its inputs: returns NaN when `df` is not a valid
/// (positive, finite) degrees-of-freedom value.
pub fn chi_square_upper_tail(x: f64, df: f64) -> f64 {
    match ChiSquared::new(df) {
        Ok(dist) => 1.0 - dist.cdf(x),
        Err(_) => f64::NAN,
    }
}
