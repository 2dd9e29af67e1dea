//! Threaded dense matrix products
//!
//! The multi-threaded multiply statically partitions the output columns
//! into contiguous blocks, one per thread, each written independently.
//! No partial sums cross block boundaries, so no locking is needed and
//! each output element is accumulated in the same order regardless of the
//! partition.

use ndarray::{Array1, Array2, ArrayView2, ArrayViewMut2, Axis};
use ndarray::parallel::prelude::*;

use crate::parallel::clamped_threads;
use crate::small;

/// Multiplies the columns `col0..` of `b` into an output block.
fn mult_block(a: &ArrayView2<f64>, b: &ArrayView2<f64>, col0: usize, mut ab: ArrayViewMut2<f64>) {
    let (m, n) = a.dim();
    let q = ab.ncols();
    for j in 0..q {
        for i in 0..m {
            let mut sum = 0.0;
            for k in 0..n {
                sum += a[[i, k]] * b[[k, col0 + j]];
            }
            ab[[i, j]] = sum;
        }
    }
}

/// Single-thread reference multiply `AB = A·B`.
///
/// Dispatches to the closed-form 2×2 and 3×3 products for square inputs
/// of those sizes.
pub fn mat_mult_single_thread(a: &Array2<f64>, b: &Array2<f64>) -> Array2<f64> {
    let (m, n) = a.dim();
    let q = b.ncols();
    assert_eq!(n, b.nrows(), "inner dimensions must agree");

    if m == 2 && n == 2 && q == 2 {
        let aa = [a[[0, 0]], a[[0, 1]], a[[1, 0]], a[[1, 1]]];
        let bb = [b[[0, 0]], b[[0, 1]], b[[1, 0]], b[[1, 1]]];
        let ab = small::mat_mult22(&aa, &bb);
        return Array2::from_shape_vec((2, 2), ab.to_vec()).expect("2x2 shape");
    }
    if m == 3 && n == 3 && q == 3 {
        let mut aa = [0.0; 9];
        let mut bb = [0.0; 9];
        for i in 0..3 {
            for j in 0..3 {
                aa[3 * i + j] = a[[i, j]];
                bb[3 * i + j] = b[[i, j]];
            }
        }
        let ab = small::mat_mult33(&aa, &bb);
        return Array2::from_shape_vec((3, 3), ab.to_vec()).expect("3x3 shape");
    }

    let mut ab = Array2::<f64>::zeros((m, q));
    mult_block(&a.view(), &b.view(), 0, ab.view_mut());
    ab
}

/// Threaded multiply `AB = A·B` over `n_threads` contiguous column blocks.
///
/// `n_threads` is clamped to the hardware concurrency; zero means one
/// thread per core. With one thread the result is bit-for-bit identical
/// to [`mat_mult_single_thread`].
pub fn mat_mult(a: &Array2<f64>, b: &Array2<f64>, n_threads: usize) -> Array2<f64> {
    let (m, n) = a.dim();
    let q = b.ncols();
    assert_eq!(n, b.nrows(), "inner dimensions must agree");

    let n_threads = clamped_threads(n_threads).min(q.max(1));
    if n_threads <= 1 {
        return mat_mult_single_thread(a, b);
    }

    let block = q / n_threads + 1;
    let mut ab = Array2::<f64>::zeros((m, q));
    ab.axis_chunks_iter_mut(Axis(1), block)
        .into_par_iter()
        .enumerate()
        .for_each(|(iblock, chunk)| {
            mult_block(&a.view(), &b.view(), iblock * block, chunk);
        });
    ab
}

/// Matrix-vector product with fixed-size fast paths.
pub fn mat_vec_mult(a: &Array2<f64>, x: &Array1<f64>) -> Array1<f64> {
    let (m, n) = a.dim();
    assert_eq!(n, x.len(), "dimensions must agree");

    match (m, n) {
        (2, 2) => {
            let mut y = [0.0; 2];
            small::mat_vec_2x2(
                &[a[[0, 0]], a[[0, 1]], a[[1, 0]], a[[1, 1]]],
                &[x[0], x[1]],
                &mut y,
            );
            return Array1::from_vec(y.to_vec());
        }
        (3, 3) => {
            let mut aa = [0.0; 9];
            for i in 0..3 {
                for j in 0..3 {
                    aa[3 * i + j] = a[[i, j]];
                }
            }
            let mut y = [0.0; 3];
            small::mat_vec_3x3(&aa, &[x[0], x[1], x[2]], &mut y);
            return Array1::from_vec(y.to_vec());
        }
        (4, 4) => {
            let mut aa = [0.0; 16];
            for i in 0..4 {
                for j in 0..4 {
                    aa[4 * i + j] = a[[i, j]];
                }
            }
            let mut y = [0.0; 4];
            small::mat_vec_4x4(&aa, &[x[0], x[1], x[2], x[3]], &mut y);
            return Array1::from_vec(y.to_vec());
        }
        _ => {}
    }

    let mut y = Array1::<f64>::zeros(m);
    for i in 0..m {
        let mut sum = 0.0;
        for k in 0..n {
            sum += a[[i, k]] * x[k];
        }
        y[i] = sum;
    }
    y
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn test_pair(m: usize, n: usize, q: usize) -> (Array2<f64>, Array2<f64>) {
        let a = Array2::from_shape_fn((m, n), |(i, j)| ((i * 7 + j * 3) % 11) as f64 - 5.0);
        let b = Array2::from_shape_fn((n, q), |(i, j)| ((i * 5 + j * 13) % 9) as f64 / 3.0);
        (a, b)
    }

    #[test]
    fn test_mat_mult_one_thread_bitwise() {
        let (a, b) = test_pair(17, 23, 19);
        let st = mat_mult_single_thread(&a, &b);
        let mt = mat_mult(&a, &b, 1);
        assert_eq!(st, mt);
    }

    #[test]
    fn test_mat_mult_thread_counts() {
        let (a, b) = test_pair(31, 17, 29);
        let reference = mat_mult_single_thread(&a, &b);
        for n_threads in [1usize, 2, 8] {
            let mt = mat_mult(&a, &b, n_threads);
            for i in 0..31 {
                for j in 0..29 {
                    assert_relative_eq!(mt[[i, j]], reference[[i, j]], epsilon = 1e-10);
                }
            }
        }
    }

    #[test]
    fn test_mat_mult_small_paths() {
        let (a, b) = test_pair(3, 3, 3);
        let st = mat_mult_single_thread(&a, &b);
        let direct = a.dot(&b);
        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(st[[i, j]], direct[[i, j]], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_mat_vec_mult() {
        for n in [2usize, 3, 4, 9] {
            let a = Array2::from_shape_fn((n, n), |(i, j)| (i + 2 * j) as f64);
            let x = Array1::from_iter((0..n).map(|i| i as f64 - 1.0));
            let y = mat_vec_mult(&a, &x);
            let direct = a.dot(&x);
            for i in 0..n {
                assert_relative_eq!(y[i], direct[i], epsilon = 1e-12);
            }
        }
    }
}
