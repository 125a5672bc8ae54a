//! Reusable scratch buffers
//!
//! Buffers only grow. Their contents outside the region written by the
//! current call are unspecified, except for mark arrays which are kept
//! all-clear between calls.

use crate::traits::RealField;

/// Grow `buf` to at least `len` entries and return its first `len` entries
pub fn adjust<T: Copy + Default>(buf: &mut Vec<T>, len: usize) -> &mut [T] {
    if buf.len() < len {
        buf.resize(len, T::default());
    }
    &mut buf[..len]
}

/// Scratch space for depth-first searches over a matrix graph
#[derive(Debug, Clone, Default)]
pub struct ReachWorkspace {
    /// Visited marks, all false between searches
    pub(crate) marks: Vec<bool>,
    /// Resume position inside each column on the DFS stack
    pub(crate) pstack: Vec<usize>,
}

impl ReachWorkspace {
    /// Create an empty workspace
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a workspace sized for graphs with `n` nodes
    pub fn with_size(n: usize) -> Self {
        let mut w = Self::new();
        w.prepare(n);
        w
    }

    /// Make room for `n` nodes
    pub fn prepare(&mut self, n: usize) {
        if self.marks.len() < n {
            self.marks.resize(n, false);
        }
        if self.pstack.len() < n {
            self.pstack.resize(n, 0);
        }
    }
}

/// Scratch space for sparse triangular solves
#[derive(Debug, Clone, Default)]
pub struct TriangularWorkspace<T: RealField> {
    /// Dense accumulator for one column of the solution
    pub(crate) x: Vec<T>,
    /// Nonzero pattern of the current column, stored from `top` to the end
    pub(crate) xi: Vec<usize>,
    /// Depth-first search state
    pub(crate) reach: ReachWorkspace,
    /// Size of the last system the workspace was prepared for
    pub(crate) n: usize,
}

impl<T: RealField> TriangularWorkspace<T> {
    /// Create an empty workspace
    pub fn new() -> Self {
        Self {
            x: Vec::new(),
            xi: Vec::new(),
            reach: ReachWorkspace::new(),
            n: 0,
        }
    }

    /// Make room for systems with `n` unknowns
    pub fn prepare(&mut self, n: usize) {
        adjust(&mut self.x, n);
        adjust(&mut self.xi, n);
        self.reach.prepare(n);
        self.n = n;
    }

    /// Nonzero pattern left by the last sparse solve that returned `top`
    pub fn pattern(&self, top: usize) -> &[usize] {
        &self.xi[top..self.n]
    }
}
