//! Dense linear-algebra kernels for the panel-method engine
//!
//! This crate provides the direct solvers and threaded kernels the
//! boundary-element solver is built on:
//!
//! - **Fixed-size paths**: closed-form 2×2, 3×3 and 4×4 inverts and solves,
//!   used as fast paths before the general routines
//! - **Gauss elimination** with partial pivoting and simultaneous
//!   multi-column right-hand sides
//! - **LU factorization** for the production influence-matrix solve, with
//!   BLAS/LAPACK via `ndarray-linalg` when the feature is enabled and a
//!   pure-Rust fallback otherwise
//! - **Cholesky** factorization/solve for symmetric positive-definite
//!   sub-systems
//! - **Preconditioners**: band-limited incomplete-LU (Crout) and symmetric
//!   Gauss-Seidel, in LU form
//! - **Block-Thomas** solver for block-tridiagonal systems
//! - **Threaded dense multiply** with static column partitioning and a
//!   single-thread reference implementation
//!
//! Every factorization and solve returns a `Result`; a failed solve means
//! the operating point could not be analyzed, never a panic.

pub mod block_tridiag;
pub mod cholesky;
pub mod gauss;
pub mod lu;
pub mod matmult;
pub mod parallel;
pub mod precond;
pub mod small;

pub use block_tridiag::block_thomas;
pub use cholesky::{cholesky_factorize, cholesky_solve};
pub use gauss::gauss;
pub use lu::{invert_matrix, lu_factorize, lu_solve, Factorized, LuFactorization};
pub use matmult::{mat_mult, mat_mult_single_thread, mat_vec_mult};
pub use parallel::{block_ranges, clamped_threads, map_blocks};
pub use precond::{apply_banded_lu, ilu_banded, sgs};
