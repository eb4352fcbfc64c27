use ndarray::Array2;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FactorError {
    #[error("matrix is not positive definite")]
    NotPositiveDefinite,
    #[error("zero diagonal encountered during triangular inversion")]
    ZeroDiagonal,
}

/// In-place upper Cholesky factorization: overwrite the upper triangle of a
/// symmetric positive-definite `a` with `U` such that `U' U = a`. The lower
/// triangle is left untouched and must not be read afterwards.
///
/// The pivot test is a strict `sum >= a[i][i]` with no tolerance; a
/// semi-definite or indefinite matrix fails rather than producing a zero
/// pivot downstream.
pub fn cholesky_upper_in_place(a: &mut Array2<f64>) -> Result<(), FactorError> {
    let order = a.nrows();
    for i in 0..order {
        let mut sum = 0.0;
        for j in 0..i {
            sum += a[[j, i]] * a[[j, i]];
        }
        if sum >= a[[i, i]] {
            return Err(FactorError::NotPositiveDefinite);
        }
        a[[i, i]] = (a[[i, i]] - sum).sqrt();
        for j in (i + 1)..order {
            let mut sum = 0.0;
            for k in 0..i {
                sum += a[[k, i]] * a[[k, j]];
            }
            a[[i, j]] = (a[[i, j]] - sum) / a[[i, i]];
        }
    }
    Ok(())
}

/// In-place inversion of an upper-triangular matrix by back-substitution.
pub fn invert_upper_in_place(u: &mut Array2<f64>) -> Result<(), FactorError> {
    let order = u.nrows();
    if order == 0 {
        return Ok(());
    }
    if u[[0, 0]] == 0.0 {
        return Err(FactorError::ZeroDiagonal);
    }
    u[[0, 0]] = 1.0 / u[[0, 0]];
    for i in 1..order {
        if u[[i, i]] == 0.0 {
            return Err(FactorError::ZeroDiagonal);
        }
        u[[i, i]] = 1.0 / u[[i, i]];
        for j in 0..i {
            let mut sum = 0.0;
            for k in j..i {
                sum += u[[j, k]] * u[[k, i]];
            }
            u[[j, i]] = -sum * u[[i, i]];
        }
    }
    Ok(())
}

/// Given the upper-triangular `U^-1`, write `A^-1 = U^-1 (U^-1)'` into
/// `out`: `out[i][j] = sum over k >= max(i, j) of in[i][k] * in[j][k]`.
pub fn upper_self_product(input: &Array2<f64>, out: &mut Array2<f64>) {
    let order = input.nrows();
    for i in 0..order {
        for j in 0..order {
            let mut sum = 0.0;
            for k in i.max(j)..order {
                sum += input[[i, k]] * input[[j, k]];
            }
            out[[i, j]] = sum;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn cholesky_reproduces_a_known_factor() {
        let mut a = array![[4.0, 2.0], [2.0, 3.0]];
        cholesky_upper_in_place(&mut a).expect("matrix is positive definite");
        assert_abs_diff_eq!(a[[0, 0]], 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(a[[0, 1]], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(a[[1, 1]], 2.0_f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn indefinite_matrix_is_rejected() {
        let mut a = array![[1.0, 2.0], [2.0, 1.0]];
        assert_eq!(
            cholesky_upper_in_place(&mut a),
            Err(FactorError::NotPositiveDefinite)
        );
    }

    #[test]
    fn non_positive_leading_entry_is_rejected() {
        let mut a = array![[0.0, 0.0], [0.0, 1.0]];
        assert_eq!(
            cholesky_upper_in_place(&mut a),
            Err(FactorError::NotPositiveDefinite)
        );
    }

    #[test]
    fn zero_diagonal_fails_inversion() {
        let mut u = array![[1.0, 1.0], [0.0, 0.0]];
        assert_eq!(invert_upper_in_place(&mut u), Err(FactorError::ZeroDiagonal));
    }

    #[test]
    fn factor_invert_product_yields_the_inverse() {
        let a = array![[4.0, 2.0], [2.0, 3.0]];
        let mut u = a.clone();
        cholesky_upper_in_place(&mut u).unwrap();
        invert_upper_in_place(&mut u).unwrap();
        let mut inv = Array2::zeros((2, 2));
        upper_self_product(&u, &mut inv);

        // A * A^-1 = I
        let product = a.dot(&inv);
        for i in 0..2 {
            for j in 0..2 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_abs_diff_eq!(product[[i, j]], expected, epsilon = 1e-12);
            }
        }
        // and the inverse is symmetric
        assert_abs_diff_eq!(inv[[0, 1]], inv[[1, 0]], epsilon = 1e-12);
    }

    #[test]
    fn empty_system_is_a_no_op() {
        let mut a = Array2::<f64>::zeros((0, 0));
        assert!(cholesky_upper_in_place(&mut a).is_ok());
        assert!(invert_upper_in_place(&mut a).is_ok());
    }
}
