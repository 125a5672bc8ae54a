//! Fill-reducing permutations
//!
//! The ordering of the unknowns decides how much fill the Cholesky factor
//! gets. The ordering itself comes from a [`ComputePermutation`]; this module
//! applies it symmetrically and keeps both directions of the permutation for
//! the solves.

use crate::Result;
use crate::sparse::CscMatrix;
use crate::sparse::permutation::checked_inverse;
use crate::traits::{ComputePermutation, RealField};
use std::borrow::Cow;

/// Applies an optional fill-reducing ordering to symmetric matrices.
///
/// Without an ordering the matrix is passed through unchanged. With one, the
/// result is the upper triangle of `P A P^T`.
pub struct FillReductionPermutation<T: RealField> {
    method: Option<Box<dyn ComputePermutation<T>>>,
    /// `p[k]`: original index placed at position `k`
    p: Vec<usize>,
    /// `pinv[i]`: position of original index `i`
    pinv: Vec<usize>,
    /// Keep the current permutation instead of computing a new one
    locked: bool,
}

impl<T: RealField> FillReductionPermutation<T> {
    /// Create from an optional ordering method
    pub fn new(method: Option<Box<dyn ComputePermutation<T>>>) -> Self {
        Self {
            method,
            p: Vec::new(),
            pinv: Vec::new(),
            locked: false,
        }
    }

    /// True if an ordering method is configured
    pub fn is_active(&self) -> bool {
        self.method.is_some()
    }

    /// When locked, a permutation computed earlier for the same dimension is reused
    pub fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
    }

    /// Compute the ordering for `a` and return the permuted upper triangle.
    ///
    /// Returns `a` itself when no ordering method is configured.
    pub fn apply<'a>(&mut self, a: &'a CscMatrix<T>) -> Result<Cow<'a, CscMatrix<T>>> {
        let Some(method) = self.method.as_mut() else {
            return Ok(Cow::Borrowed(a));
        };

        let n = a.num_cols;
        if !(self.locked && self.p.len() == n) {
            let p = method.compute(a);
            self.pinv = checked_inverse(&p, n)?;
            self.p = p;
        }

        Ok(Cow::Owned(a.permute_symmetric(&self.pinv)))
    }

    /// Current permutation, if an ordering method is configured and has run
    pub fn p(&self) -> Option<&[usize]> {
        (self.is_active() && !self.p.is_empty()).then_some(self.p.as_slice())
    }

    /// Inverse of the current permutation, see [`Self::p`]
    pub fn pinv(&self) -> Option<&[usize]> {
        (self.is_active() && !self.pinv.is_empty()).then_some(self.pinv.as_slice())
    }
}

/// Ordering supplied up front, e.g. computed by an external tool
#[derive(Debug, Clone)]
pub struct FixedPermutation {
    p: Vec<usize>,
}

impl FixedPermutation {
    /// `p[k]` is the original index placed at position `k`
    pub fn new(p: Vec<usize>) -> Self {
        Self { p }
    }

    /// Ordering that reverses the unknowns
    pub fn reversed(n: usize) -> Self {
        Self::new((0..n).rev().collect())
    }
}

impl<T: RealField> ComputePermutation<T> for FixedPermutation {
    fn compute(&mut self, _a: &CscMatrix<T>) -> Vec<usize> {
        self.p.clone()
    }
}
