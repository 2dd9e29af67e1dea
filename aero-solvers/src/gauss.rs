//! Gauss elimination with partial pivoting
//!
//! In-place forward elimination with row interchange on the largest
//! absolute value in the active column, followed by back substitution.
//! Solves several right-hand-side columns simultaneously. A pivot below
//! the numerical-zero threshold signals a singular or near-singular
//! system, e.g. a degenerate mesh.

use std::sync::atomic::{AtomicBool, Ordering};

use ndarray::Array2;
use thiserror::Error;

/// Pivot magnitude below which the system is declared singular.
const PIVOT_EPS: f64 = 1.0e-30;

/// Errors from the Gauss elimination solve
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GaussError {
    #[error("matrix is singular or nearly singular")]
    Singular,
    #[error("matrix dimensions mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
    #[error("operation cancelled")]
    Cancelled,
}

/// Solves `A X = B` in place by Gauss elimination with partial pivoting.
///
/// `a` is destroyed; `b` holds one right-hand side per column and is
/// overwritten with the solution columns. The cancellation flag is polled
/// once per pivot row; a cancelled solve leaves `a` and `b` in an
/// unspecified state.
pub fn gauss(a: &mut Array2<f64>, b: &mut Array2<f64>, cancel: &AtomicBool) -> Result<(), GaussError> {
    let n = a.nrows();
    if n != a.ncols() {
        return Err(GaussError::DimensionMismatch {
            expected: n,
            got: a.ncols(),
        });
    }
    if b.nrows() != n {
        return Err(GaussError::DimensionMismatch {
            expected: n,
            got: b.nrows(),
        });
    }
    let m = b.ncols();

    // forward elimination
    for row in 0..n.saturating_sub(1) {
        if cancel.load(Ordering::Relaxed) {
            return Err(GaussError::Cancelled);
        }

        let mut max = a[[row, row]].abs();
        let mut pivot_row = row;
        for i in (row + 1)..n {
            let v = a[[i, row]].abs();
            if v > max {
                max = v;
                pivot_row = i;
            }
        }
        if max <= PIVOT_EPS {
            return Err(GaussError::Singular);
        }

        if pivot_row != row {
            for j in row..n {
                let tmp = a[[row, j]];
                a[[row, j]] = a[[pivot_row, j]];
                a[[pivot_row, j]] = tmp;
            }
            for k in 0..m {
                let tmp = b[[row, k]];
                b[[row, k]] = b[[pivot_row, k]];
                b[[pivot_row, k]] = tmp;
            }
        }

        for i in (row + 1)..n {
            let factor = -a[[i, row]] / a[[row, row]];
            a[[i, row]] = 0.0;
            for j in (row + 1)..n {
                let update = factor * a[[row, j]];
                a[[i, j]] += update;
            }
            for k in 0..m {
                let update = factor * b[[row, k]];
                b[[i, k]] += update;
            }
        }
    }

    // back substitution
    for row in (0..n).rev() {
        if cancel.load(Ordering::Relaxed) {
            return Err(GaussError::Cancelled);
        }
        if a[[row, row]].abs() < PIVOT_EPS {
            return Err(GaussError::Singular);
        }
        let inv = 1.0 / a[[row, row]];
        for j in (row + 1)..n {
            a[[row, j]] *= inv;
        }
        for k in 0..m {
            b[[row, k]] *= inv;
        }
        for i in 0..row {
            let factor = a[[i, row]];
            for j in (row + 1)..n {
                let update = factor * a[[row, j]];
                a[[i, j]] -= update;
            }
            for k in 0..m {
                let update = factor * b[[row, k]];
                b[[i, k]] -= update;
            }
        }
    }

    Ok(())
}
