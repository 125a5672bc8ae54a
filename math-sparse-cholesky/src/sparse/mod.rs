//! Sparse matrix structures (CSC format)
//!
//! This module provides the Compressed Sparse Column (CSC) format used by the
//! factorization, together with the permutation helpers the solvers need.

mod csc;
pub mod permutation;

pub use csc::{CscBuilder, CscMatrix};
pub use permutation::UNMAPPED;
