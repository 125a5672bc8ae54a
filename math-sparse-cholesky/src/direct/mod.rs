//! Direct solvers for sparse symmetric positive definite systems
//!
//! This module provides:
//! - [`UpLookingCholesky`]: symbolic analysis and numeric factorization `A = L L^T`
//! - [`CholeskySparseSolver`]: `set_a` / `solve` front end with optional fill reduction
//! - [`FillReductionPermutation`]: applies an ordering from a [`ComputePermutation`](crate::ComputePermutation)

mod cholesky;
mod fill_reduction;
mod solver;

pub use cholesky::{CholeskyConfig, UpLookingCholesky};
pub use fill_reduction::{FillReductionPermutation, FixedPermutation};
pub use solver::CholeskySparseSolver;
