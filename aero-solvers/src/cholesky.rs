//! Cholesky factorization and solve
//!
//! For symmetric positive-definite sub-systems. Not used by the default
//! panel system, exposed for structural and auxiliary solves.

use ndarray::{Array1, Array2};
use thiserror::Error;

/// Errors from the Cholesky routines
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CholeskyError {
    #[error("matrix is not positive definite")]
    NotPositiveDefinite,
    #[error("matrix dimensions mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

/// Computes the lower-triangular factor L with `A = L Lᵀ`.
pub fn cholesky_factorize(a: &Array2<f64>) -> Result<Array2<f64>, CholeskyError> {
    let n = a.nrows();
    if n != a.ncols() {
        return Err(CholeskyError::DimensionMismatch {
            expected: n,
            got: a.ncols(),
        });
    }

    let mut l = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..=i {
            let mut s = 0.0;
            for k in 0..j {
                s += l[[i, k]] * l[[j, k]];
            }
            if i == j {
                let d = a[[i, i]] - s;
                if d <= 0.0 {
                    return Err(CholeskyError::NotPositiveDefinite);
                }
                l[[i, j]] = d.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - s) / l[[j, j]];
            }
        }
    }
    Ok(l)
}

/// Solves `L Lᵀ x = b` from the precomputed factor.
pub fn cholesky_solve(l: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>, CholeskyError> {
    let n = l.nrows();
    if b.len() != n {
        return Err(CholeskyError::DimensionMismatch {
            expected: n,
            got: b.len(),
        });
    }

    let mut x = b.clone();

    // forward substitution with L
    for i in 0..n {
        if l[[i, i]].abs() < 1.0e-10 {
            return Err(CholeskyError::NotPositiveDefinite);
        }
        let mut s = x[i];
        for k in 0..i {
            s -= l[[i, k]] * x[k];
        }
        x[i] = s / l[[i, i]];
    }

    // back substitution with Lᵀ
    for i in (0..n).rev() {
        let mut s = x[i];
        for j in (i + 1)..n {
            s -= l[[j, i]] * x[j];
        }
        x[i] = s / l[[i, i]];
    }

    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_cholesky_spd() {
        let a = array![[4.0, 2.0, 0.0], [2.0, 5.0, 1.0], [0.0, 1.0, 3.0]];
        let l = cholesky_factorize(&a).expect("factorize");

        // L Lᵀ reproduces A
        let llt = l.dot(&l.t());
        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(llt[[i, j]], a[[i, j]], epsilon = 1e-12);
            }
        }

        let b = array![1.0, -2.0, 3.0];
        let x = cholesky_solve(&l, &b).expect("solve");
        let ax = a.dot(&x);
        for i in 0..3 {
            assert_relative_eq!(ax[i], b[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_cholesky_not_spd() {
        let a = array![[1.0, 2.0], [2.0, 1.0]];
        assert!(cholesky_factorize(&a).is_err());
    }
}
