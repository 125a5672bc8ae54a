//! Up-looking sparse Cholesky factorization
//!
//! Computes `A = L L^T` for a symmetric positive definite matrix one row of
//! `L` at a time. The symbolic phase (elimination tree, postorder, column
//! counts) sizes `L` exactly; the numeric phase then solves a sparse
//! triangular system per row, restricted to the pattern given by the
//! elimination tree.
//!
//! Only the upper triangle of the input (`row <= col`) is read.

use crate::etree::{column_counts, elimination_tree, postorder};
use crate::sparse::CscMatrix;
use crate::traits::RealField;
use crate::triangular::search_nz_rows_elim;
use crate::workspace::adjust;
use crate::{Result, SparseCholeskyError};

/// Cholesky configuration
#[derive(Debug, Clone)]
pub struct CholeskyConfig<R> {
    /// Reuse the symbolic analysis of the first matrix for later ones with
    /// the same dimension. Their upper pattern must be contained in the
    /// pattern of the analysed matrix.
    pub structure_locked: bool,
    /// Pivots must be strictly larger than this value
    pub pivot_threshold: R,
    /// Log the size of the factor after each symbolic analysis
    pub log_statistics: bool,
}

impl Default for CholeskyConfig<f64> {
    fn default() -> Self {
        Self {
            structure_locked: false,
            pivot_threshold: 0.0,
            log_statistics: false,
        }
    }
}

impl Default for CholeskyConfig<f32> {
    fn default() -> Self {
        Self {
            structure_locked: false,
            pivot_threshold: 0.0,
            log_statistics: false,
        }
    }
}

/// Up-looking Cholesky decomposition of a sparse symmetric positive definite matrix
#[derive(Debug, Clone)]
pub struct UpLookingCholesky<T: RealField> {
    config: CholeskyConfig<T>,
    /// Dimension of the analysed matrix
    n: usize,
    /// Lower triangular factor; the diagonal is the first entry of each column
    l: CscMatrix<T>,
    /// Elimination tree
    parent: Vec<Option<usize>>,
    /// Postorder of the elimination tree
    post: Vec<usize>,
    /// Nonzeros per column of `L`
    counts: Vec<usize>,
    /// Upper triangle of the analysed matrix. Row patterns of `L` are always
    /// taken from it, so a locked refactor fills every slot of `L`.
    pattern: CscMatrix<T>,
    analyzed: bool,
    factored: bool,

    // workspaces
    x: Vec<T>,
    s: Vec<usize>,
    marks: Vec<bool>,
    next: Vec<usize>,
    tree_work: Vec<Option<usize>>,
    index_work: Vec<usize>,
}

impl<T: RealField> UpLookingCholesky<T> {
    /// Create a decomposition with the given configuration
    pub fn new(config: CholeskyConfig<T>) -> Self {
        Self {
            config,
            n: 0,
            l: CscMatrix::new(0, 0),
            parent: Vec::new(),
            post: Vec::new(),
            counts: Vec::new(),
            pattern: CscMatrix::new(0, 0),
            analyzed: false,
            factored: false,
            x: Vec::new(),
            s: Vec::new(),
            marks: Vec::new(),
            next: Vec::new(),
            tree_work: Vec::new(),
            index_work: Vec::new(),
        }
    }

    /// Factor `a`.
    ///
    /// On failure the factor is left in an unfinished state and
    /// [`Self::is_factored`] returns false.
    ///
    /// # Errors
    ///
    /// - [`SparseCholeskyError::DimensionMismatch`] if `a` is not square
    /// - [`SparseCholeskyError::StructureViolation`] if the structure is
    ///   locked and `a` has an entry outside the locked pattern; `L` is not
    ///   modified in that case
    /// - [`SparseCholeskyError::NotPositiveDefinite`] if a pivot is not
    ///   larger than the configured threshold
    pub fn decompose(&mut self, a: &CscMatrix<T>) -> Result<()> {
        self.factored = false;
        if a.num_rows != a.num_cols {
            return Err(SparseCholeskyError::DimensionMismatch {
                expected: a.num_rows,
                got: a.num_cols,
            });
        }

        let n = a.num_cols;
        if self.config.structure_locked && self.analyzed && self.n == n {
            self.check_locked_pattern(a)?;
            log::trace!("reusing symbolic analysis for n = {}", n);
        } else {
            self.analyze(a);
        }

        self.factor(a)?;
        self.factored = true;
        Ok(())
    }

    /// [`Self::decompose`] reporting only success
    pub fn decompose_ok(&mut self, a: &CscMatrix<T>) -> bool {
        self.decompose(a).is_ok()
    }

    /// Symbolic analysis: elimination tree, postorder, column counts and the
    /// column pointers of `L`
    fn analyze(&mut self, a: &CscMatrix<T>) {
        let n = a.num_cols;
        self.n = n;

        self.parent.clear();
        self.parent.resize(n, None);
        elimination_tree(a, false, &mut self.parent, &mut self.tree_work);

        self.post.clear();
        self.post.resize(n, 0);
        postorder(&self.parent, &mut self.post, &mut self.index_work);

        self.counts.clear();
        self.counts.resize(n, 0);
        column_counts(a, &self.parent, &self.post, &mut self.counts, &mut self.index_work);

        self.l.reshape(n, n);
        for j in 0..n {
            self.l.col_ptrs[j + 1] = self.l.col_ptrs[j] + self.counts[j];
        }
        let nnz = self.l.col_ptrs[n];
        self.l.row_indices.resize(nnz, 0);
        self.l.values.resize(nnz, T::zero());

        self.pattern = a.upper_triangle();
        self.analyzed = true;

        if self.config.log_statistics {
            log::info!(
                "Cholesky symbolic analysis: n = {}, nnz(A) = {}, nnz(L) = {}, fill = {:.3}",
                n,
                a.nnz(),
                nnz,
                self.l.sparsity()
            );
        }
    }

    /// Check that the upper pattern of `a` fits in the analysed pattern
    fn check_locked_pattern(&mut self, a: &CscMatrix<T>) -> Result<()> {
        let marks = adjust(&mut self.marks, self.n);
        for k in 0..self.n {
            let locked = self.pattern.col_range(k);
            for &i in &self.pattern.row_indices[locked.clone()] {
                marks[i] = true;
            }
            let outside = a
                .col_entries(k)
                .map(|(i, _)| i)
                .find(|&i| i <= k && !marks[i]);
            for &i in &self.pattern.row_indices[locked] {
                marks[i] = false;
            }

            if let Some(row) = outside {
                return Err(SparseCholeskyError::StructureViolation { row, column: k });
            }
        }
        Ok(())
    }

    /// Numeric factorization, one row of `L` at a time
    fn factor(&mut self, a: &CscMatrix<T>) -> Result<()> {
        let n = self.n;
        let l = &mut self.l;

        let x = adjust(&mut self.x, n);
        x.fill(T::zero());
        let s = adjust(&mut self.s, n);
        let marks = adjust(&mut self.marks, n);
        marks.fill(false);
        // next free slot in each column of L
        self.next.clear();
        self.next.extend_from_slice(&l.col_ptrs[..n]);
        let next = &mut self.next;

        for k in 0..n {
            // under a lock `a` may hold fewer entries than the analysed pattern;
            // the missing ones become explicit zeros in L
            let top = search_nz_rows_elim(&self.pattern, k, &self.parent, s, marks);

            for (i, v) in a.col_entries(k) {
                if i <= k {
                    x[i] += v;
                }
            }
            let mut d = x[k];
            x[k] = T::zero();

            // sparse triangular solve against the finished columns
            for &i in &s[top..n] {
                let lki = x[i] / l.values[l.col_ptrs[i]];
                x[i] = T::zero();
                for p in l.col_ptrs[i] + 1..next[i] {
                    x[l.row_indices[p]] -= l.values[p] * lki;
                }
                d -= lki * lki;

                let p = next[i];
                assert!(
                    p < l.col_ptrs[i + 1],
                    "column count of column {} exceeded",
                    i
                );
                l.row_indices[p] = k;
                l.values[p] = lki;
                next[i] += 1;
            }

            if !d.is_valid_pivot(self.config.pivot_threshold) {
                return Err(SparseCholeskyError::NotPositiveDefinite { column: k });
            }

            let p = next[k];
            l.row_indices[p] = k;
            l.values[p] = d.sqrt();
            next[k] += 1;
        }

        Ok(())
    }

    /// The lower triangular factor. Only meaningful when [`Self::is_factored`] is true.
    pub fn l(&self) -> &CscMatrix<T> {
        &self.l
    }

    /// Elimination tree of the analysed matrix
    pub fn parent(&self) -> &[Option<usize>] {
        &self.parent
    }

    /// Postorder of the elimination tree
    pub fn postorder(&self) -> &[usize] {
        &self.post
    }

    /// Number of nonzeros in each column of `L`, diagonal included
    pub fn column_counts(&self) -> &[usize] {
        &self.counts
    }

    /// True after a successful decomposition
    pub fn is_factored(&self) -> bool {
        self.factored
    }

    pub(crate) fn invalidate(&mut self) {
        self.factored = false;
    }

    /// Lock or unlock the symbolic structure
    pub fn set_structure_locked(&mut self, locked: bool) {
        self.config.structure_locked = locked;
    }

    /// Is the structure locked?
    pub fn is_structure_locked(&self) -> bool {
        self.config.structure_locked
    }

    /// The input matrix is only read
    pub fn input_modified(&self) -> bool {
        false
    }

    /// Current configuration
    pub fn config(&self) -> &CholeskyConfig<T> {
        &self.config
    }
}
