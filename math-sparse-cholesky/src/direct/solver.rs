//! Linear solver built on the sparse Cholesky factorization
//!
//! [`CholeskySparseSolver`] factors `P A P^T = L L^T` once in `set_a` and then
//! solves `A X = B` with one forward and one backward triangular solve per
//! right hand side.

use super::cholesky::{CholeskyConfig, UpLookingCholesky};
use super::fill_reduction::FillReductionPermutation;
use crate::sparse::CscMatrix;
use crate::sparse::permutation::{permute, permute_inv};
use crate::traits::{ComputePermutation, LinearSolverSparse, RealField};
use crate::triangular::{quality_triangular, solve_l, solve_sparse, solve_tran_l};
use crate::workspace::{TriangularWorkspace, adjust};
use crate::{Result, SparseCholeskyError};
use ndarray::{Array1, Array2};

/// Direct solver for sparse symmetric positive definite systems
pub struct CholeskySparseSolver<T: RealField> {
    cholesky: UpLookingCholesky<T>,
    reduce: FillReductionPermutation<T>,

    // dense scratch
    gb: Vec<T>,
    gx: Vec<T>,

    // sparse solves: factors with row indices in the original ordering
    l_orig: CscMatrix<T>,
    l_tran: CscMatrix<T>,
    tmp: CscMatrix<T>,
    transpose_work: Vec<usize>,
    workspace: TriangularWorkspace<T>,
}

impl<T: RealField> CholeskySparseSolver<T> {
    /// Create a solver, optionally with a fill-reducing ordering
    pub fn new(
        config: CholeskyConfig<T>,
        fill_reduce: Option<Box<dyn ComputePermutation<T>>>,
    ) -> Self {
        Self {
            cholesky: UpLookingCholesky::new(config),
            reduce: FillReductionPermutation::new(fill_reduce),
            gb: Vec::new(),
            gx: Vec::new(),
            l_orig: CscMatrix::new(0, 0),
            l_tran: CscMatrix::new(0, 0),
            tmp: CscMatrix::new(0, 0),
            transpose_work: Vec::new(),
            workspace: TriangularWorkspace::new(),
        }
    }

    /// Factor `a`. Returns false if the matrix is not square, not positive
    /// definite, or does not fit the locked structure.
    ///
    /// Only the upper triangle of `a` is read. After a failure the solver
    /// cannot be used until the next successful call.
    pub fn set_a(&mut self, a: &CscMatrix<T>) -> bool {
        match self.try_set_a(a) {
            Ok(()) => true,
            Err(err) => {
                self.cholesky.invalidate();
                log::debug!(
                    "Cholesky factorization of {}x{} matrix failed: {}",
                    a.num_rows,
                    a.num_cols,
                    err
                );
                false
            }
        }
    }

    /// [`Self::set_a`] reporting why the factorization failed
    pub fn try_set_a(&mut self, a: &CscMatrix<T>) -> Result<()> {
        if a.num_rows != a.num_cols {
            return Err(SparseCholeskyError::DimensionMismatch {
                expected: a.num_rows,
                got: a.num_cols,
            });
        }

        self.reduce.set_locked(self.cholesky.is_structure_locked());
        let c = self.reduce.apply(a)?;
        self.cholesky.decompose(&c)
    }

    fn factor(&self) -> Result<&CscMatrix<T>> {
        if self.cholesky.is_factored() {
            Ok(self.cholesky.l())
        } else {
            Err(SparseCholeskyError::NotFactored)
        }
    }

    /// Solve `A X = B` for a dense right hand side
    ///
    /// # Errors
    ///
    /// - [`SparseCholeskyError::NotFactored`] without a successful `set_a`
    /// - [`SparseCholeskyError::DimensionMismatch`] if `b` or `x` do not have
    ///   `n` rows or their column counts differ
    pub fn solve(&mut self, b: &Array2<T>, x: &mut Array2<T>) -> Result<()> {
        let n = self.factor()?.num_cols;
        check_rows(n, b.nrows())?;
        check_rows(n, x.nrows())?;
        if b.ncols() != x.ncols() {
            return Err(SparseCholeskyError::DimensionMismatch {
                expected: b.ncols(),
                got: x.ncols(),
            });
        }

        for (b_col, mut x_col) in b.columns().into_iter().zip(x.columns_mut()) {
            let gb = adjust(&mut self.gb, n);
            for (dst, &src) in gb.iter_mut().zip(b_col.iter()) {
                *dst = src;
            }
            self.solve_in_place();
            for (dst, &src) in x_col.iter_mut().zip(self.gb.iter()) {
                *dst = src;
            }
        }
        Ok(())
    }

    /// Solve `A x = b` for a single dense vector
    pub fn solve_vec(&mut self, b: &Array1<T>) -> Result<Array1<T>> {
        let n = self.factor()?.num_cols;
        check_rows(n, b.len())?;

        let gb = adjust(&mut self.gb, n);
        for (dst, &src) in gb.iter_mut().zip(b.iter()) {
            *dst = src;
        }
        self.solve_in_place();
        Ok(Array1::from(self.gb[..n].to_vec()))
    }

    /// Solve the system held in the first `n` entries of `gb`, in place
    fn solve_in_place(&mut self) {
        let l = self.cholesky.l();
        let n = l.num_cols;
        let b = &mut self.gb[..n];

        match self.reduce.pinv() {
            Some(pinv) => {
                let x = adjust(&mut self.gx, n);
                permute_inv(pinv, b, x);
                solve_l(l, x);
                solve_tran_l(l, x);
                permute(pinv, x, b);
            }
            None => {
                solve_l(l, b);
                solve_tran_l(l, b);
            }
        }
    }

    /// Solve `A X = B` for a sparse right hand side, producing a sparse `X`.
    ///
    /// The permutation is folded into the row indices of the factors used
    /// for the two triangular solves, so neither `B` nor `X` is permuted.
    /// Row indices within the columns of `X` are not sorted.
    pub fn solve_sparse(&mut self, b: &CscMatrix<T>, x: &mut CscMatrix<T>) -> Result<()> {
        let n = self.factor()?.num_cols;
        check_rows(n, b.num_rows)?;

        let l = self.cholesky.l();
        l.transpose_into(&mut self.l_tran, &mut self.transpose_work);

        match (self.reduce.p(), self.reduce.pinv()) {
            (Some(p), Some(pinv)) => {
                copy_relabeled(l, p, &mut self.l_orig);
                relabel_rows(&mut self.l_tran, p);
                solve_sparse(&self.l_orig, true, b, &mut self.tmp, Some(pinv), &mut self.workspace);
                solve_sparse(&self.l_tran, false, &self.tmp, x, Some(pinv), &mut self.workspace);
            }
            _ => {
                solve_sparse(l, true, b, &mut self.tmp, None, &mut self.workspace);
                solve_sparse(&self.l_tran, false, &self.tmp, x, None, &mut self.workspace);
            }
        }
        Ok(())
    }

    /// Scale invariant quality of the factorization, see [`quality_triangular`]
    pub fn quality(&self) -> T {
        quality_triangular(self.cholesky.l())
    }

    /// The underlying decomposition
    pub fn decomposition(&self) -> &UpLookingCholesky<T> {
        &self.cholesky
    }

    /// Fill-reducing permutation of the last factorization, if any
    pub fn permutation(&self) -> Option<&[usize]> {
        self.reduce.p()
    }

    /// When locked, later calls to `set_a` reuse the ordering and symbolic analysis
    pub fn set_structure_locked(&mut self, locked: bool) {
        self.cholesky.set_structure_locked(locked);
    }

    /// Is the structure locked?
    pub fn is_structure_locked(&self) -> bool {
        self.cholesky.is_structure_locked()
    }

    /// `set_a` only reads its input
    pub fn modifies_a(&self) -> bool {
        self.cholesky.input_modified()
    }

    /// The right hand side is copied before solving
    pub fn modifies_b(&self) -> bool {
        false
    }
}

fn check_rows(expected: usize, got: usize) -> Result<()> {
    if expected == got {
        Ok(())
    } else {
        Err(SparseCholeskyError::DimensionMismatch { expected, got })
    }
}

/// Copy `src` into `dst` with every row index `r` replaced by `p[r]`
fn copy_relabeled<T: RealField>(src: &CscMatrix<T>, p: &[usize], dst: &mut CscMatrix<T>) {
    dst.reshape(src.num_rows, src.num_cols);
    dst.col_ptrs.copy_from_slice(&src.col_ptrs);
    let nnz = src.nnz();
    dst.row_indices.extend(src.row_indices[..nnz].iter().map(|&r| p[r]));
    dst.values.extend_from_slice(&src.values[..nnz]);
}

fn relabel_rows<T: RealField>(m: &mut CscMatrix<T>, p: &[usize]) {
    let nnz = m.nnz();
    for r in &mut m.row_indices[..nnz] {
        *r = p[*r];
    }
}

impl<T: RealField> LinearSolverSparse<T> for CholeskySparseSolver<T> {
    fn set_a(&mut self, a: &CscMatrix<T>) -> bool {
        CholeskySparseSolver::set_a(self, a)
    }

    fn quality(&self) -> T {
        CholeskySparseSolver::quality(self)
    }

    fn solve(&mut self, b: &Array2<T>, x: &mut Array2<T>) -> Result<()> {
        CholeskySparseSolver::solve(self, b, x)
    }

    fn solve_sparse(&mut self, b: &CscMatrix<T>, x: &mut CscMatrix<T>) -> Result<()> {
        CholeskySparseSolver::solve_sparse(self, b, x)
    }

    fn set_structure_locked(&mut self, locked: bool) {
        CholeskySparseSolver::set_structure_locked(self, locked)
    }

    fn is_structure_locked(&self) -> bool {
        CholeskySparseSolver::is_structure_locked(self)
    }

    fn modifies_a(&self) -> bool {
        CholeskySparseSolver::modifies_a(self)
    }

    fn modifies_b(&self) -> bool {
        CholeskySparseSolver::modifies_b(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::direct::FixedPermutation;
    use crate::testdata;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn reversing() -> Option<Box<dyn ComputePermutation<f64>>> {
        Some(Box::new(FixedPermutation::reversed(3)))
    }

    fn sample() -> CscMatrix<f64> {
        let dense = array![[4.0, 1.0, 0.0], [1.0, 5.0, 2.0], [0.0, 2.0, 6.0]];
        CscMatrix::from_dense(&dense, 0.0)
    }

    #[test]
    fn test_solve_vec() {
        let a = sample();
        for fill_reduce in [None, reversing()] {
            let mut solver = CholeskySparseSolver::new(CholeskyConfig::default(), fill_reduce);
            assert!(solver.set_a(&a));

            let b = array![1.0, 2.0, 3.0];
            let x = solver.solve_vec(&b).unwrap();

            let found = a.matvec(&x);
            for i in 0..3 {
                assert_relative_eq!(found[i], b[i], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_solve_dense_columns() {
        let a = sample();
        let mut solver = CholeskySparseSolver::new(CholeskyConfig::default(), reversing());
        assert!(solver.set_a(&a));

        let mut rng = testdata::seeded_rng(401);
        let b = testdata::dense(3, 2, -1.0, 1.0, &mut rng);
        let mut x = Array2::zeros((3, 2));
        solver.solve(&b, &mut x).unwrap();

        let found = a.mul_dense(&x);
        for (f, e) in found.iter().zip(b.iter()) {
            assert_relative_eq!(*f, *e, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_not_factored() {
        let mut solver: CholeskySparseSolver<f64> =
            CholeskySparseSolver::new(CholeskyConfig::default(), None);
        let b = array![1.0, 2.0];

        assert!(matches!(
            solver.solve_vec(&b),
            Err(SparseCholeskyError::NotFactored)
        ));

        // a failed factorization leaves the solver unusable
        let good = CscMatrix::from_diagonal(&[1.0, 2.0]);
        assert!(solver.set_a(&good));
        assert!(solver.solve_vec(&b).is_ok());
        let bad = CscMatrix::from_diagonal(&[1.0, -2.0]);
        assert!(!solver.set_a(&bad));
        assert!(matches!(
            solver.solve_vec(&b),
            Err(SparseCholeskyError::NotFactored)
        ));
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut solver: CholeskySparseSolver<f64> =
            CholeskySparseSolver::new(CholeskyConfig::default(), None);
        assert!(solver.set_a(&sample()));

        let b = Array2::zeros((2, 1));
        let mut x = Array2::zeros((3, 1));
        assert!(matches!(
            solver.solve(&b, &mut x),
            Err(SparseCholeskyError::DimensionMismatch { expected: 3, got: 2 })
        ));

        let b = Array2::zeros((3, 2));
        assert!(matches!(
            solver.solve(&b, &mut x),
            Err(SparseCholeskyError::DimensionMismatch { expected: 2, got: 1 })
        ));

        let b_sparse = CscMatrix::new(4, 1);
        let mut x_sparse = CscMatrix::new(0, 0);
        assert!(solver.solve_sparse(&b_sparse, &mut x_sparse).is_err());

        assert!(!solver.set_a(&CscMatrix::new(3, 2)));
    }

    #[test]
    fn test_invalid_permutation_fails_set_a() {
        let mut solver: CholeskySparseSolver<f64> = CholeskySparseSolver::new(
            CholeskyConfig::default(),
            Some(Box::new(FixedPermutation::new(vec![0, 1]))),
        );

        assert!(matches!(
            solver.try_set_a(&sample()),
            Err(SparseCholeskyError::InvalidPermutation(_))
        ));
        assert!(!solver.set_a(&sample()));
    }

    #[test]
    fn test_solve_sparse_matches_dense() {
        let mut rng = testdata::seeded_rng(400);
        let a = testdata::symmetric_positive_definite(10, 0.3, &mut rng);
        let b = testdata::rectangle(10, 3, 8, -1.0, 1.0, &mut rng);
        let fill_reduce: Option<Box<dyn ComputePermutation<f64>>> = Some(Box::new(
            FixedPermutation::new(vec![3, 7, 0, 9, 1, 5, 2, 8, 4, 6]),
        ));
        let mut solver = CholeskySparseSolver::new(CholeskyConfig::default(), fill_reduce);
        assert!(solver.set_a(&a));

        let mut x_sparse = CscMatrix::new(0, 0);
        solver.solve_sparse(&b, &mut x_sparse).unwrap();
        let mut x_dense = Array2::zeros((10, 3));
        solver.solve(&b.to_dense(), &mut x_dense).unwrap();

        let found = x_sparse.to_dense();
        for (f, e) in found.iter().zip(x_dense.iter()) {
            assert_relative_eq!(*f, *e, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_flags_and_quality() {
        let mut solver: CholeskySparseSolver<f64> =
            CholeskySparseSolver::new(CholeskyConfig::default(), None);
        assert!(!solver.modifies_a());
        assert!(!solver.modifies_b());
        assert!(!solver.is_structure_locked());
        solver.set_structure_locked(true);
        assert!(solver.is_structure_locked());

        assert!(solver.set_a(&CscMatrix::from_diagonal(&[4.0, 16.0])));
        // L = diag(2, 4)
        assert_relative_eq!(solver.quality(), 0.5);
        assert!(solver.permutation().is_none());
    }

    #[test]
    fn test_trait_object() {
        let mut solver: Box<dyn LinearSolverSparse<f64>> =
            Box::new(CholeskySparseSolver::new(CholeskyConfig::default(), reversing()));
        assert!(solver.set_a(&sample()));

        let b = array![[1.0], [1.0], [1.0]];
        let mut x = Array2::zeros((3, 1));
        solver.solve(&b, &mut x).unwrap();

        let found = sample().mul_dense(&x);
        for (f, e) in found.iter().zip(b.iter()) {
            assert_relative_eq!(*f, *e, epsilon = 1e-12);
        }
    }
}
