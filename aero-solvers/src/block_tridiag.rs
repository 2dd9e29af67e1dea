//! Block-Thomas solver for block-tridiagonal systems
//!
//! Solves systems of `n` blocks of size `p×p`:
//!
//! ```text
//!   | B0 C0                |   | X0   |   | R0   |
//!   | A1 B1 C1             |   |      |   |      |
//!   |     ...              | . |      | = |      |
//!   |      An-2 Bn-2 Cn-2  |   |      |   |      |
//!   |           An-1 Bn-1  |   | Xn-1 |   | Rn-1 |
//! ```
//!
//! by forward elimination of per-block Schur complements and backward
//! substitution. Every diagonal block (after elimination) must be
//! invertible; a singular block propagates as an error.

use ndarray::{Array1, Array2};
use thiserror::Error;

use crate::lu::invert_matrix;

/// Errors from the block-Thomas solve
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlockThomasError {
    #[error("diagonal block {block} is singular")]
    SingularBlock { block: usize },
    #[error("inconsistent block count: a={a}, b={b}, c={c}, r={r}")]
    InconsistentBlocks { a: usize, b: usize, c: usize, r: usize },
}

/// Solves the block-tridiagonal system.
///
/// `a` holds the sub-diagonal blocks (`a[0]` unused), `b` the diagonal,
/// `c` the super-diagonal (`c[n-1]` unused), `r` the right-hand-side
/// block vectors.
pub fn block_thomas(
    a: &[Array2<f64>],
    b: &[Array2<f64>],
    c: &[Array2<f64>],
    r: &[Array1<f64>],
) -> Result<Vec<Array1<f64>>, BlockThomasError> {
    let n = b.len();
    if a.len() != n || c.len() != n || r.len() != n {
        return Err(BlockThomasError::InconsistentBlocks {
            a: a.len(),
            b: b.len(),
            c: c.len(),
            r: r.len(),
        });
    }
    if n == 0 {
        return Ok(Vec::new());
    }

    let mut gam: Vec<Array2<f64>> = Vec::with_capacity(n);
    let mut beta: Vec<Array1<f64>> = Vec::with_capacity(n);

    // forward elimination
    let mut inv = b[0].clone();
    invert_matrix(&mut inv).map_err(|_| BlockThomasError::SingularBlock { block: 0 })?;
    gam.push(inv.dot(&c[0]));
    beta.push(inv.dot(&r[0]));

    for k in 1..n {
        // Schur complement of the diagonal block
        let mut mc = &b[k] - &a[k].dot(&gam[k - 1]);
        invert_matrix(&mut mc).map_err(|_| BlockThomasError::SingularBlock { block: k })?;

        gam.push(mc.dot(&c[k]));
        let dp = &r[k] - &a[k].dot(&beta[k - 1]);
        beta.push(mc.dot(&dp));
    }

    // back substitution
    let mut x = vec![Array1::<f64>::zeros(0); n];
    x[n - 1] = beta[n - 1].clone();
    for k in (0..n - 1).rev() {
        x[k] = &beta[k] - &gam[k].dot(&x[k + 1]);
    }

    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_block_thomas_scalar_blocks() {
        // 1x1 blocks reduce to the classic Thomas algorithm
        let b = vec![array![[2.0]], array![[2.0]], array![[2.0]]];
        let a = vec![array![[0.0]], array![[-1.0]], array![[-1.0]]];
        let c = vec![array![[-1.0]], array![[-1.0]], array![[0.0]]];
        let r = vec![array![1.0], array![0.0], array![1.0]];

        let x = block_thomas(&a, &b, &c, &r).expect("solve");

        // full system check
        assert_relative_eq!(2.0 * x[0][0] - x[1][0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(-x[0][0] + 2.0 * x[1][0] - x[2][0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(-x[1][0] + 2.0 * x[2][0], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_block_thomas_2x2_blocks() {
        let b = vec![
            array![[4.0, 1.0], [1.0, 3.0]],
            array![[5.0, 0.0], [0.0, 5.0]],
        ];
        let a = vec![array![[0.0, 0.0], [0.0, 0.0]], array![[1.0, 0.0], [0.0, 1.0]]];
        let c = vec![array![[1.0, 0.0], [0.0, 1.0]], array![[0.0, 0.0], [0.0, 0.0]]];
        let r = vec![array![1.0, 2.0], array![3.0, 4.0]];

        let x = block_thomas(&a, &b, &c, &r).expect("solve");

        let r0 = b[0].dot(&x[0]) + c[0].dot(&x[1]);
        let r1 = a[1].dot(&x[0]) + b[1].dot(&x[1]);
        for i in 0..2 {
            assert_relative_eq!(r0[i], r[0][i], epsilon = 1e-12);
            assert_relative_eq!(r1[i], r[1][i], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_block_thomas_singular_block() {
        let b = vec![array![[0.0]]];
        let a = vec![array![[0.0]]];
        let c = vec![array![[0.0]]];
        let r = vec![array![1.0]];
        assert!(matches!(
            block_thomas(&a, &b, &c, &r),
            Err(BlockThomasError::SingularBlock { block: 0 })
        ));
    }
}
