//! Core traits for the sparse Cholesky solver
//!
//! This module defines the abstractions shared by the factorization and the solvers:
//! - [`RealField`]: scalar types the factorization works with (`f64`, `f32`)
//! - [`LinearOperator`]: matrix-like objects that can perform matrix-vector products
//! - [`ComputePermutation`]: source of a fill-reducing ordering
//! - [`LinearSolverSparse`]: the `set_a` / `solve` contract implemented by direct solvers

use crate::Result;
use crate::sparse::CscMatrix;
use ndarray::{Array1, Array2};
use num_traits::{Float, FromPrimitive, NumAssign, ToPrimitive};
use std::fmt::Debug;

/// Trait for real scalar types that can be used in a Cholesky factorization.
///
/// The factorization takes square roots of pivots and compares them against
/// zero, so only ordered real fields are supported.
///
/// # Implementations
///
/// Provided for:
/// - `f64` (default)
/// - `f32` (for memory-constrained applications)
pub trait RealField:
    Float + NumAssign + FromPrimitive + ToPrimitive + Copy + Send + Sync + Debug + Default + 'static
{
    /// Default tolerance used when comparing reconstructed values
    fn default_tolerance() -> Self;

    /// True when the value is strictly positive and finite, i.e. a valid pivot
    #[inline]
    fn is_valid_pivot(self, threshold: Self) -> bool {
        self.is_finite() && self > threshold
    }
}

impl RealField for f64 {
    #[inline]
    fn default_tolerance() -> Self {
        1e-8
    }
}

impl RealField for f32 {
    #[inline]
    fn default_tolerance() -> Self {
        1e-4
    }
}

/// Trait for linear operators (matrices) that can perform matrix-vector products.
pub trait LinearOperator<T: RealField>: Send + Sync {
    /// Number of rows in the operator
    fn num_rows(&self) -> usize;

    /// Number of columns in the operator
    fn num_cols(&self) -> usize;

    /// Apply the operator: y = A * x
    fn apply(&self, x: &Array1<T>) -> Array1<T>;

    /// Apply the transpose: y = A^T * x
    fn apply_transpose(&self, x: &Array1<T>) -> Array1<T>;

    /// Check if the operator is square
    fn is_square(&self) -> bool {
        self.num_rows() == self.num_cols()
    }
}

/// Computes a fill-reducing ordering for a symmetric sparse matrix.
///
/// The returned vector `p` has one entry per column: `p[k]` is the original
/// index that is moved to position `k`. The ordering algorithm itself (AMD,
/// nested dissection, ...) lives outside this crate.
pub trait ComputePermutation<T: RealField>: Send {
    /// Compute the ordering from the nonzero pattern of `a`
    fn compute(&mut self, a: &CscMatrix<T>) -> Vec<usize>;
}

/// Direct solver for sparse systems `A x = B`.
///
/// `set_a` must succeed before any of the solve methods are called.
pub trait LinearSolverSparse<T: RealField> {
    /// Factorize `a`. Returns false if the matrix could not be factorized.
    fn set_a(&mut self, a: &CscMatrix<T>) -> bool;

    /// Scale-invariant estimate of how well conditioned the factorization is.
    /// Values near zero indicate a nearly singular system.
    fn quality(&self) -> T;

    /// Solve for a dense right hand side, one column at a time
    fn solve(&mut self, b: &Array2<T>, x: &mut Array2<T>) -> Result<()>;

    /// Solve for a sparse right hand side, producing a sparse solution
    fn solve_sparse(&mut self, b: &CscMatrix<T>, x: &mut CscMatrix<T>) -> Result<()>;

    /// When locked, the symbolic analysis of the first matrix is reused by later calls to `set_a`
    fn set_structure_locked(&mut self, locked: bool);

    /// Is the structure locked?
    fn is_structure_locked(&self) -> bool;

    /// True if `set_a` modifies the matrix passed to it
    fn modifies_a(&self) -> bool;

    /// True if `solve` modifies the right hand side passed to it
    fn modifies_b(&self) -> bool;
}
