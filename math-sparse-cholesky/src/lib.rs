//! Sparse Cholesky factorization for symmetric positive definite systems
//!
//! This crate factors a sparse symmetric positive definite matrix `A`, stored
//! in compressed sparse column (CSC) format, as `P A P^T = L L^T` and solves
//! `A X = B` for dense or sparse right hand sides.
//!
//! # Features
//!
//! - **Up-looking Cholesky**: symbolic analysis (elimination tree, postorder,
//!   column counts) followed by a row-by-row numeric factorization
//! - **Structure locking**: refactor matrices with a fixed pattern without
//!   repeating the symbolic analysis
//! - **Triangular solves**: dense and sparse right hand sides, with the
//!   nonzero pattern of sparse solutions found by graph reachability
//! - **Fill-reducing orderings**: any [`ComputePermutation`] can be plugged in
//! - **Generic Scalar Types**: Works with f64 and f32
//!
//! # Example
//!
//! ```
//! use math_audio_sparse_cholesky::{CholeskyConfig, CholeskySparseSolver, CscMatrix};
//! use ndarray::array;
//!
//! let a = CscMatrix::from_dense(&array![[4.0_f64, 1.0], [1.0, 3.0]], 0.0);
//! let mut solver = CholeskySparseSolver::new(CholeskyConfig::<f64>::default(), None);
//! assert!(solver.set_a(&a));
//!
//! let x = solver.solve_vec(&array![1.0, 2.0]).unwrap();
//! let residual = a.matvec(&x) - array![1.0, 2.0];
//! assert!(residual.iter().all(|r| r.abs() < 1e-12));
//! ```

pub mod direct;
pub mod etree;
pub mod sparse;
pub mod traits;
pub mod triangular;
pub mod workspace;

// Make testdata publicly available for tests
pub mod testdata;

// Re-export main types
pub use sparse::{CscBuilder, CscMatrix, UNMAPPED};
pub use traits::{ComputePermutation, LinearOperator, LinearSolverSparse, RealField};
pub use workspace::{ReachWorkspace, TriangularWorkspace};

// Re-export symbolic analysis
pub use etree::{column_counts, elimination_tree, postorder};

// Re-export triangular solvers
pub use triangular::{quality_triangular, solve_l, solve_sparse, solve_tran_l, solve_u};

// Re-export direct solvers
pub use direct::{
    CholeskyConfig, CholeskySparseSolver, FillReductionPermutation, FixedPermutation,
    UpLookingCholesky,
};

/// Error types for the factorization and the solvers
#[derive(Debug, thiserror::Error)]
pub enum SparseCholeskyError {
    #[error("Matrix is not positive definite: non-positive pivot in column {column}")]
    NotPositiveDefinite { column: usize },

    #[error("Entry ({row}, {column}) is outside the locked nonzero structure")]
    StructureViolation { row: usize, column: usize },

    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("No valid factorization; set_a must succeed before solving")]
    NotFactored,

    #[error("Invalid permutation: {0}")]
    InvalidPermutation(String),
}

pub type Result<T> = std::result::Result<T, SparseCholeskyError>;
