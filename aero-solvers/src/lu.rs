//! LU decomposition solver
//!
//! Production solve for the influence matrix. Uses BLAS/LAPACK via
//! `ndarray-linalg` when the feature is enabled, with a pure-Rust
//! factorization fallback otherwise. The factorization is computed once
//! and back-substituted against the six unit right-hand-side columns.

use ndarray::{Array1, Array2};
use thiserror::Error;

#[cfg(feature = "ndarray-linalg")]
use ndarray_linalg::Solve;

use crate::small;

/// Pivot magnitude below which the matrix is declared singular.
const PIVOT_EPS: f64 = 1.0e-30;

/// Errors from LU factorization and solve
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LuError {
    #[error("matrix is singular or nearly singular")]
    SingularMatrix,
    #[error("matrix dimensions mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

/// LU factorization with partial pivoting
///
/// L is unit lower triangular, stored below the diagonal of `lu`;
/// U occupies the diagonal and above.
#[derive(Debug, Clone)]
pub struct LuFactorization {
    /// Combined L and U factors
    pub lu: Array2<f64>,
    /// Row pivot indices
    pub pivots: Vec<usize>,
    /// Matrix dimension
    pub n: usize,
}

impl LuFactorization {
    /// Solves `A x = b` from the precomputed factorization.
    pub fn solve(&self, b: &Array1<f64>) -> Result<Array1<f64>, LuError> {
        if b.len() != self.n {
            return Err(LuError::DimensionMismatch {
                expected: self.n,
                got: b.len(),
            });
        }
        let mut x = b.clone();
        self.solve_in_place(&mut x)?;
        Ok(x)
    }

    /// In-place back substitution against a single right-hand side.
    pub fn solve_in_place(&self, x: &mut Array1<f64>) -> Result<(), LuError> {
        if x.len() != self.n {
            return Err(LuError::DimensionMismatch {
                expected: self.n,
                got: x.len(),
            });
        }

        // apply the row permutation
        for i in 0..self.n {
            let p = self.pivots[i];
            if p != i {
                x.swap(i, p);
            }
        }

        // forward substitution: L y = P b
        for i in 0..self.n {
            for j in 0..i {
                let update = self.lu[[i, j]] * x[j];
                x[i] -= update;
            }
        }

        // backward substitution: U x = y
        for i in (0..self.n).rev() {
            for j in (i + 1)..self.n {
                let update = self.lu[[i, j]] * x[j];
                x[i] -= update;
            }
            let u_ii = self.lu[[i, i]];
            if u_ii.abs() < PIVOT_EPS {
                return Err(LuError::SingularMatrix);
            }
            x[i] /= u_ii;
        }

        Ok(())
    }
}

/// Computes the LU factorization with partial pivoting (pure Rust).
pub fn lu_factorize(a: &Array2<f64>) -> Result<LuFactorization, LuError> {
    let n = a.nrows();
    if n != a.ncols() {
        return Err(LuError::DimensionMismatch {
            expected: n,
            got: a.ncols(),
        });
    }

    let mut lu = a.clone();
    let mut pivots: Vec<usize> = (0..n).collect();

    for k in 0..n {
        let mut max_val = lu[[k, k]].abs();
        let mut max_row = k;
        for i in (k + 1)..n {
            let v = lu[[i, k]].abs();
            if v > max_val {
                max_val = v;
                max_row = i;
            }
        }

        if max_val < PIVOT_EPS {
            return Err(LuError::SingularMatrix);
        }

        if max_row != k {
            for j in 0..n {
                let tmp = lu[[k, j]];
                lu[[k, j]] = lu[[max_row, j]];
                lu[[max_row, j]] = tmp;
            }
            pivots.swap(k, max_row);
        }

        let pivot = lu[[k, k]];
        for i in (k + 1)..n {
            let mult = lu[[i, k]] / pivot;
            lu[[i, k]] = mult;
            for j in (k + 1)..n {
                let update = mult * lu[[k, j]];
                lu[[i, j]] -= update;
            }
        }
    }

    Ok(LuFactorization { lu, pivots, n })
}

/// Solves `A x = b` by LU decomposition.
///
/// Dispatches to LAPACK (`dgetrf`/`dgetrs` equivalents) when built with
/// the `ndarray-linalg` feature, else uses the pure-Rust factorization.
pub fn lu_solve(a: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>, LuError> {
    #[cfg(feature = "ndarray-linalg")]
    {
        a.solve_into(b.clone()).map_err(|_| LuError::SingularMatrix)
    }

    #[cfg(not(feature = "ndarray-linalg"))]
    {
        let factorization = lu_factorize(a)?;
        factorization.solve(b)
    }
}

/// A factorized system matrix ready for repeated back substitution.
///
/// Wraps the LAPACK factorization when the `ndarray-linalg` feature is
/// enabled and the pure-Rust one otherwise, so the production solve can
/// back-substitute its six unit right-hand-side columns from a single
/// factorization either way.
///
/// The BLAS backend's thread count is process-wide state; concurrent
/// analyses in one process must serialize their own thread-count
/// configuration around these calls.
pub enum Factorized {
    #[cfg(feature = "ndarray-linalg")]
    Lapack(ndarray_linalg::LUFactorized<ndarray::OwnedRepr<f64>>),
    Native(LuFactorization),
}

impl Factorized {
    /// Factorizes the matrix, consuming a copy of it.
    pub fn factorize(a: &Array2<f64>) -> Result<Self, LuError> {
        #[cfg(feature = "ndarray-linalg")]
        {
            use ndarray_linalg::FactorizeInto;
            a.clone()
                .factorize_into()
                .map(Factorized::Lapack)
                .map_err(|_| LuError::SingularMatrix)
        }

        #[cfg(not(feature = "ndarray-linalg"))]
        {
            lu_factorize(a).map(Factorized::Native)
        }
    }

    /// Back-substitutes one right-hand side in place.
    pub fn solve_in_place(&self, b: &mut Array1<f64>) -> Result<(), LuError> {
        match self {
            #[cfg(feature = "ndarray-linalg")]
            Factorized::Lapack(f) => {
                use ndarray_linalg::Solve;
                let x = f.solve(b).map_err(|_| LuError::SingularMatrix)?;
                b.assign(&x);
                Ok(())
            }
            Factorized::Native(f) => f.solve_in_place(b),
        }
    }
}

/// Inverts a matrix in place.
///
/// Dispatches to the closed-form 1×1..4×4 paths before falling back to
/// LU-based column solves against the identity.
pub fn invert_matrix(a: &mut Array2<f64>) -> Result<(), LuError> {
    let n = a.nrows();
    if n != a.ncols() {
        return Err(LuError::DimensionMismatch {
            expected: n,
            got: a.ncols(),
        });
    }

    match n {
        0 => return Ok(()),
        1 => {
            if a[[0, 0]].abs() < 1.0e-15 {
                return Err(LuError::SingularMatrix);
            }
            a[[0, 0]] = 1.0 / a[[0, 0]];
            return Ok(());
        }
        2 => {
            let m = [a[[0, 0]], a[[0, 1]], a[[1, 0]], a[[1, 1]]];
            let inv = small::invert22(&m).ok_or(LuError::SingularMatrix)?;
            for i in 0..2 {
                for j in 0..2 {
                    a[[i, j]] = inv[2 * i + j];
                }
            }
            return Ok(());
        }
        3 => {
            let mut m = [0.0; 9];
            for i in 0..3 {
                for j in 0..3 {
                    m[3 * i + j] = a[[i, j]];
                }
            }
            let inv = small::invert33(&m).ok_or(LuError::SingularMatrix)?;
            for i in 0..3 {
                for j in 0..3 {
                    a[[i, j]] = inv[3 * i + j];
                }
            }
            return Ok(());
        }
        4 => {
            let mut m = [0.0; 16];
            for i in 0..4 {
                for j in 0..4 {
                    m[4 * i + j] = a[[i, j]];
                }
            }
            let inv = small::invert44(&m).ok_or(LuError::SingularMatrix)?;
            for i in 0..4 {
                for j in 0..4 {
                    a[[i, j]] = inv[4 * i + j];
                }
            }
            return Ok(());
        }
        _ => {}
    }

    let factorization = lu_factorize(a)?;
    let mut inv = Array2::<f64>::zeros((n, n));
    let mut col = Array1::<f64>::zeros(n);
    for j in 0..n {
        col.fill(0.0);
        col[j] = 1.0;
        factorization.solve_in_place(&mut col)?;
        for i in 0..n {
            inv[[i, j]] = col[i];
        }
    }
    *a = inv;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    /// Deterministic well-conditioned test matrix of size n.
    fn test_matrix(n: usize) -> Array2<f64> {
        let mut a = Array2::<f64>::zeros((n, n));
        for i in 0..n {
            for j in 0..n {
                a[[i, j]] = ((i * 31 + j * 17) % 13) as f64 / 13.0;
            }
            a[[i, i]] += n as f64;
        }
        a
    }

    #[test]
    fn test_lu_solve_matches_direct() {
        let a = array![[4.0, 1.0, 0.0], [1.0, 3.0, 1.0], [0.0, 1.0, 2.0]];
        let b = array![1.0, 2.0, 3.0];
        let x = lu_solve(&a, &b).expect("solve");
        let ax = a.dot(&x);
        for i in 0..3 {
            assert_relative_eq!(ax[i], b[i], epsilon = 1e-10);
        }
    }

    #[test]
    fn test_lu_singular() {
        let a = array![[1.0, 2.0], [2.0, 4.0]];
        let b = array![1.0, 2.0];
        assert!(lu_solve(&a, &b).is_err());
    }

    #[test]
    fn test_lu_factorize_multiple_rhs() {
        let a = test_matrix(8);
        let f = lu_factorize(&a).expect("factorize");
        for k in 0..3 {
            let b = Array1::from_iter((0..8).map(|i| ((i + k) % 5) as f64 - 2.0));
            let x = f.solve(&b).expect("solve");
            let ax = a.dot(&x);
            for i in 0..8 {
                assert_relative_eq!(ax[i], b[i], epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_invert_matrix_all_sizes() {
        for n in [1usize, 2, 3, 4, 8, 50] {
            let a = test_matrix(n);
            let mut inv = a.clone();
            invert_matrix(&mut inv).expect("invert");
            let prod = inv.dot(&a);
            for i in 0..n {
                for j in 0..n {
                    let expected = if i == j { 1.0 } else { 0.0 };
                    assert_relative_eq!(prod[[i, j]], expected, epsilon = 1e-9);
                }
            }
        }
    }

    #[test]
    fn test_gauss_matches_lu() {
        use std::sync::atomic::AtomicBool;

        let n = 20;
        let a = test_matrix(n);
        let mut b = Array2::<f64>::zeros((n, 2));
        for i in 0..n {
            b[[i, 0]] = (i as f64).sin();
            b[[i, 1]] = 1.0 - (i as f64) / n as f64;
        }

        let mut ag = a.clone();
        let mut bg = b.clone();
        crate::gauss::gauss(&mut ag, &mut bg, &AtomicBool::new(false)).expect("gauss");

        let f = lu_factorize(&a).expect("factorize");
        for k in 0..2 {
            let x = f.solve(&b.column(k).to_owned()).expect("solve");
            for i in 0..n {
                assert_relative_eq!(bg[[i, k]], x[i], epsilon = 1e-9);
            }
        }
    }
}
