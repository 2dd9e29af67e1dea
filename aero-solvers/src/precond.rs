//! Approximate factorizations used as preconditioners
//!
//! Band-limited incomplete-LU (Crout) and symmetric Gauss-Seidel, both
//! produced in combined LU form: L unit lower triangular below the
//! diagonal, U on and above. These are approximate factorizations, not
//! exact solves.

use ndarray::{Array1, Array2};
use thiserror::Error;

const DIAG_EPS: f64 = 1.0e-30;

/// Errors from preconditioner construction
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PrecondError {
    #[error("factorization has a zero diagonal and is singular")]
    SingularFactor,
    #[error("matrix is not square: {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },
}

/// Incomplete LU factorization by Crout's algorithm, band-limited.
///
/// Entries further than `bandwidth` indices from the diagonal are dropped
/// from the output factors. Returns the combined LU form.
pub fn ilu_banded(a: &Array2<f64>, bandwidth: usize) -> Result<Array2<f64>, PrecondError> {
    let n = a.nrows();
    if n != a.ncols() {
        return Err(PrecondError::NotSquare {
            rows: n,
            cols: a.ncols(),
        });
    }

    let mut ilu = a.clone();
    for k in 0..n {
        for i in 0..k {
            if a[[k, i]].abs() > 0.0 {
                for l in k..n {
                    ilu[[k, l]] = a[[k, l]] - ilu[[k, i]] * ilu[[i, l]];
                }
            }
        }
        for i in 0..k {
            for l in (k + 1)..n {
                let update = ilu[[i, k]] * ilu[[l, i]];
                ilu[[l, k]] -= update;
            }
        }
        let pivot = ilu[[k, k]];
        if pivot.abs() < DIAG_EPS {
            return Err(PrecondError::SingularFactor);
        }
        for i in (k + 1)..n {
            ilu[[i, k]] /= pivot;
        }
    }

    // band drop rule, applied symmetrically
    for i in 0..n {
        for j in 0..n {
            if i.abs_diff(j) > bandwidth {
                ilu[[i, j]] = 0.0;
            }
        }
    }

    for i in 0..n {
        if ilu[[i, i]].abs() < DIAG_EPS {
            return Err(PrecondError::SingularFactor);
        }
    }
    Ok(ilu)
}

/// Symmetric Gauss-Seidel preconditioner in LU form.
///
/// With `A = D - E - F` (diagonal, strict lower, strict upper), the factor
/// pair is `L = I - E D⁻¹` (unit lower) and `U = D - F`, stored combined.
pub fn sgs(a: &Array2<f64>) -> Result<Array2<f64>, PrecondError> {
    let n = a.nrows();
    if n != a.ncols() {
        return Err(PrecondError::NotSquare {
            rows: n,
            cols: a.ncols(),
        });
    }
    for i in 0..n {
        if a[[i, i]].abs() < DIAG_EPS {
            return Err(PrecondError::SingularFactor);
        }
    }

    let mut lu = a.clone();
    for i in 0..n {
        for j in 0..i {
            lu[[i, j]] = a[[i, j]] / a[[i, i]];
        }
    }
    Ok(lu)
}

/// Applies a combined-LU preconditioner: solves `L U z = r`.
///
/// L is taken as unit lower triangular (the strict lower part of `lu`),
/// U as the diagonal and above.
pub fn apply_banded_lu(lu: &Array2<f64>, r: &Array1<f64>) -> Array1<f64> {
    let n = lu.nrows();
    let mut z = r.clone();

    // forward: L y = r, unit diagonal
    for i in 0..n {
        for j in 0..i {
            let update = lu[[i, j]] * z[j];
            z[i] -= update;
        }
    }

    // backward: U z = y
    for i in (0..n).rev() {
        for j in (i + 1)..n {
            let update = lu[[i, j]] * z[j];
            z[i] -= update;
        }
        z[i] /= lu[[i, i]];
    }

    z
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_ilu_full_band_is_exact() {
        // with a bandwidth covering the whole matrix the incomplete
        // factorization of a banded SPD matrix is exact
        let a = array![
            [4.0, -1.0, 0.0, 0.0],
            [-1.0, 4.0, -1.0, 0.0],
            [0.0, -1.0, 4.0, -1.0],
            [0.0, 0.0, -1.0, 4.0]
        ];
        let ilu = ilu_banded(&a, 4).expect("factorize");
        let b = array![1.0, 2.0, 3.0, 4.0];
        let z = apply_banded_lu(&ilu, &b);
        let az = a.dot(&z);
        for i in 0..4 {
            assert_relative_eq!(az[i], b[i], epsilon = 1e-10);
        }
    }

    #[test]
    fn test_ilu_band_drop() {
        let a = array![
            [4.0, -1.0, 0.5, 0.1],
            [-1.0, 4.0, -1.0, 0.5],
            [0.5, -1.0, 4.0, -1.0],
            [0.1, 0.5, -1.0, 4.0]
        ];
        let ilu = ilu_banded(&a, 1).expect("factorize");
        for i in 0usize..4 {
            for j in 0usize..4 {
                if i.abs_diff(j) > 1 {
                    assert_eq!(ilu[[i, j]], 0.0);
                }
            }
        }
    }

    #[test]
    fn test_sgs_preconditioner_improves_residual() {
        let a = array![[5.0, 1.0, 0.0], [1.0, 5.0, 1.0], [0.0, 1.0, 5.0]];
        let lu = sgs(&a).expect("factorize");
        let r = array![1.0, 1.0, 1.0];
        let z = apply_banded_lu(&lu, &r);
        // z is a better approximation of A⁻¹r than r/diag alone
        let az = a.dot(&z);
        let mut err = 0.0;
        for i in 0..3 {
            err += (az[i] - r[i]).powi(2);
        }
        assert!(err.sqrt() < 0.5);
    }

    #[test]
    fn test_sgs_zero_diagonal() {
        let a = array![[0.0, 1.0], [1.0, 1.0]];
        assert!(sgs(&a).is_err());
    }
}
