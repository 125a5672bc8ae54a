//! Compressed Sparse Column (CSC) matrix format
//!
//! CSC format stores:
//! - `values`: Non-zero entries in column-major order
//! - `row_indices`: Row index for each value
//! - `col_ptrs`: Index into values/row_indices where each column starts
//!
//! Row indices inside a column are not required to be sorted. Operations that
//! depend on the order say so explicitly.

use crate::traits::{LinearOperator, RealField};
use ndarray::{Array1, Array2};
use std::ops::Range;

/// Compressed Sparse Column (CSC) matrix format
#[derive(Debug, Clone, PartialEq)]
pub struct CscMatrix<T: RealField> {
    /// Number of rows
    pub num_rows: usize,
    /// Number of columns
    pub num_cols: usize,
    /// Non-zero values in column-major order
    pub values: Vec<T>,
    /// Row indices for each value
    pub row_indices: Vec<usize>,
    /// Column pointers: col_ptrs[j] is the start index in values/row_indices for column j
    /// col_ptrs[num_cols] = nnz (total number of non-zeros)
    pub col_ptrs: Vec<usize>,
}

impl<T: RealField> CscMatrix<T> {
    /// Create a new empty CSC matrix
    pub fn new(num_rows: usize, num_cols: usize) -> Self {
        Self {
            num_rows,
            num_cols,
            values: Vec::new(),
            row_indices: Vec::new(),
            col_ptrs: vec![0; num_cols + 1],
        }
    }

    /// Create a CSC matrix with pre-allocated capacity
    pub fn with_capacity(num_rows: usize, num_cols: usize, nnz_estimate: usize) -> Self {
        Self {
            num_rows,
            num_cols,
            values: Vec::with_capacity(nnz_estimate),
            row_indices: Vec::with_capacity(nnz_estimate),
            col_ptrs: vec![0; num_cols + 1],
        }
    }

    /// Create a CSC matrix from raw components
    ///
    /// # Panics
    ///
    /// Panics if the input arrays are inconsistent:
    /// - `col_ptrs` must have length `num_cols + 1`
    /// - `row_indices` and `values` must have the same length
    /// - `col_ptrs[num_cols]` must equal `values.len()`
    /// - every row index must be smaller than `num_rows`
    pub fn from_raw_parts(
        num_rows: usize,
        num_cols: usize,
        col_ptrs: Vec<usize>,
        row_indices: Vec<usize>,
        values: Vec<T>,
    ) -> Self {
        assert_eq!(
            col_ptrs.len(),
            num_cols + 1,
            "col_ptrs must have num_cols + 1 elements"
        );
        assert_eq!(
            row_indices.len(),
            values.len(),
            "row_indices and values must have the same length"
        );
        assert_eq!(
            col_ptrs[num_cols],
            values.len(),
            "col_ptrs[num_cols] must equal nnz"
        );
        assert!(
            col_ptrs.windows(2).all(|w| w[0] <= w[1]),
            "col_ptrs must be non-decreasing"
        );
        assert!(
            row_indices.iter().all(|&i| i < num_rows),
            "row index out of bounds"
        );

        Self {
            num_rows,
            num_cols,
            col_ptrs,
            row_indices,
            values,
        }
    }

    /// Create a CSC matrix from a dense matrix
    ///
    /// Only stores entries with magnitude > threshold
    pub fn from_dense(dense: &Array2<T>, threshold: T) -> Self {
        let num_rows = dense.nrows();
        let num_cols = dense.ncols();

        let mut values = Vec::new();
        let mut row_indices = Vec::new();
        let mut col_ptrs = vec![0usize; num_cols + 1];

        for j in 0..num_cols {
            for i in 0..num_rows {
                let val = dense[[i, j]];
                if val.abs() > threshold {
                    values.push(val);
                    row_indices.push(i);
                }
            }
            col_ptrs[j + 1] = values.len();
        }

        Self {
            num_rows,
            num_cols,
            values,
            row_indices,
            col_ptrs,
        }
    }

    /// Create a CSC matrix from COO (Coordinate) format triplets
    ///
    /// Triplets are (row, col, value). Duplicate entries are summed and the
    /// resulting columns have sorted row indices.
    pub fn from_triplets(
        num_rows: usize,
        num_cols: usize,
        mut triplets: Vec<(usize, usize, T)>,
    ) -> Self {
        // Sort by column, then by row
        triplets.sort_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)));

        let mut values: Vec<T> = Vec::with_capacity(triplets.len());
        let mut row_indices = Vec::with_capacity(triplets.len());
        let mut col_ptrs = vec![0usize; num_cols + 1];

        let mut prev: Option<(usize, usize)> = None;
        for (row, col, val) in triplets {
            assert!(
                row < num_rows && col < num_cols,
                "triplet ({row}, {col}) out of bounds"
            );
            if prev == Some((row, col)) {
                if let Some(last) = values.last_mut() {
                    *last += val;
                }
            } else {
                values.push(val);
                row_indices.push(row);
                col_ptrs[col + 1] += 1;
                prev = Some((row, col));
            }
        }

        for j in 0..num_cols {
            col_ptrs[j + 1] += col_ptrs[j];
        }

        Self {
            num_rows,
            num_cols,
            values,
            row_indices,
            col_ptrs,
        }
    }

    /// Create identity matrix in CSC format
    pub fn identity(n: usize) -> Self {
        Self {
            num_rows: n,
            num_cols: n,
            values: vec![T::one(); n],
            row_indices: (0..n).collect(),
            col_ptrs: (0..=n).collect(),
        }
    }

    /// Create diagonal matrix from its diagonal entries
    pub fn from_diagonal(diag: &[T]) -> Self {
        let n = diag.len();
        Self {
            num_rows: n,
            num_cols: n,
            values: diag.to_vec(),
            row_indices: (0..n).collect(),
            col_ptrs: (0..=n).collect(),
        }
    }

    /// Clear all entries and change the shape, keeping the allocated storage
    pub fn reshape(&mut self, num_rows: usize, num_cols: usize) {
        self.num_rows = num_rows;
        self.num_cols = num_cols;
        self.values.clear();
        self.row_indices.clear();
        self.col_ptrs.clear();
        self.col_ptrs.resize(num_cols + 1, 0);
    }

    /// Number of non-zero entries
    pub fn nnz(&self) -> usize {
        self.col_ptrs[self.num_cols]
    }

    /// Sparsity ratio (fraction of non-zero entries)
    pub fn sparsity(&self) -> f64 {
        let total = self.num_rows * self.num_cols;
        if total == 0 {
            0.0
        } else {
            self.nnz() as f64 / total as f64
        }
    }

    /// Get the range of indices in values/row_indices for a given column
    #[inline]
    pub fn col_range(&self, col: usize) -> Range<usize> {
        self.col_ptrs[col]..self.col_ptrs[col + 1]
    }

    /// Get the (row, value) pairs for a column
    pub fn col_entries(&self, col: usize) -> impl Iterator<Item = (usize, T)> + '_ {
        let range = self.col_range(col);
        self.row_indices[range.clone()]
            .iter()
            .copied()
            .zip(self.values[range].iter().copied())
    }

    /// Index into values/row_indices of element (row, col), if stored
    pub fn find(&self, row: usize, col: usize) -> Option<usize> {
        self.col_range(col).find(|&idx| self.row_indices[idx] == row)
    }

    /// Get element at (i, j), returns 0 if not stored
    pub fn get(&self, i: usize, j: usize) -> T {
        self.find(i, j).map_or(T::zero(), |idx| self.values[idx])
    }

    /// Set element at (i, j), inserting it if it is not stored
    ///
    /// New entries are inserted at their sorted position when the column is
    /// sorted, otherwise at the end of the column.
    pub fn set(&mut self, i: usize, j: usize, value: T) {
        assert!(i < self.num_rows && j < self.num_cols, "index out of bounds");
        if let Some(idx) = self.find(i, j) {
            self.values[idx] = value;
            return;
        }

        let range = self.col_range(j);
        let pos = range
            .clone()
            .find(|&idx| self.row_indices[idx] > i)
            .unwrap_or(range.end);
        self.row_indices.insert(pos, i);
        self.values.insert(pos, value);
        for ptr in &mut self.col_ptrs[j + 1..] {
            *ptr += 1;
        }
    }

    /// Remove element (i, j) if it is stored
    pub fn remove(&mut self, i: usize, j: usize) {
        if let Some(idx) = self.find(i, j) {
            self.row_indices.remove(idx);
            self.values.remove(idx);
            for ptr in &mut self.col_ptrs[j + 1..] {
                *ptr -= 1;
            }
        }
    }

    /// Extract diagonal elements
    pub fn diagonal(&self) -> Array1<T> {
        let n = self.num_rows.min(self.num_cols);
        Array1::from_iter((0..n).map(|i| self.get(i, i)))
    }

    /// Scale all values by a scalar
    pub fn scale(&mut self, scalar: T) {
        for val in &mut self.values {
            *val *= scalar;
        }
    }

    /// Sort the row indices inside every column
    pub fn sort_indices(&mut self) {
        let mut entries: Vec<(usize, T)> = Vec::new();
        for j in 0..self.num_cols {
            let range = self.col_range(j);
            entries.clear();
            entries.extend(self.col_entries(j));
            entries.sort_by_key(|&(row, _)| row);
            for (offset, (row, val)) in entries.iter().enumerate() {
                self.row_indices[range.start + offset] = *row;
                self.values[range.start + offset] = *val;
            }
        }
    }

    /// True if every column has strictly increasing row indices
    pub fn indices_sorted(&self) -> bool {
        (0..self.num_cols).all(|j| {
            self.row_indices[self.col_range(j)]
                .windows(2)
                .all(|w| w[0] < w[1])
        })
    }

    /// Matrix-vector product: y = A * x
    pub fn matvec(&self, x: &Array1<T>) -> Array1<T> {
        assert_eq!(x.len(), self.num_cols, "Input vector size mismatch");

        let mut y = Array1::from_elem(self.num_rows, T::zero());
        for j in 0..self.num_cols {
            let xj = x[j];
            for idx in self.col_range(j) {
                y[self.row_indices[idx]] += self.values[idx] * xj;
            }
        }
        y
    }

    /// Transpose matrix-vector product: y = A^T * x
    pub fn matvec_transpose(&self, x: &Array1<T>) -> Array1<T> {
        assert_eq!(x.len(), self.num_rows, "Input vector size mismatch");

        let mut y = Array1::from_elem(self.num_cols, T::zero());
        for j in 0..self.num_cols {
            let mut sum = T::zero();
            for idx in self.col_range(j) {
                sum += self.values[idx] * x[self.row_indices[idx]];
            }
            y[j] = sum;
        }
        y
    }

    /// Sparse times dense product: C = A * B
    pub fn mul_dense(&self, b: &Array2<T>) -> Array2<T> {
        assert_eq!(b.nrows(), self.num_cols, "Matrix dimension mismatch");

        let mut c = Array2::from_elem((self.num_rows, b.ncols()), T::zero());
        for k in 0..b.ncols() {
            for j in 0..self.num_cols {
                let bjk = b[[j, k]];
                if bjk == T::zero() {
                    continue;
                }
                for idx in self.col_range(j) {
                    c[[self.row_indices[idx], k]] += self.values[idx] * bjk;
                }
            }
        }
        c
    }

    /// Write the transpose of this matrix into `out`, reusing its storage.
    ///
    /// `work` is resized to hold one counter per row. The columns of the
    /// output are sorted by row index.
    pub fn transpose_into(&self, out: &mut CscMatrix<T>, work: &mut Vec<usize>) {
        out.reshape(self.num_cols, self.num_rows);
        let nnz = self.nnz();
        out.row_indices.resize(nnz, 0);
        out.values.resize(nnz, T::zero());

        // count the entries in each row
        work.clear();
        work.resize(self.num_rows, 0);
        for &row in &self.row_indices[..nnz] {
            work[row] += 1;
        }
        for i in 0..self.num_rows {
            out.col_ptrs[i + 1] = out.col_ptrs[i] + work[i];
            work[i] = out.col_ptrs[i];
        }

        for j in 0..self.num_cols {
            for idx in self.col_range(j) {
                let dst = work[self.row_indices[idx]];
                work[self.row_indices[idx]] += 1;
                out.row_indices[dst] = j;
                out.values[dst] = self.values[idx];
            }
        }
    }

    /// Transpose of this matrix
    pub fn transpose(&self) -> CscMatrix<T> {
        let mut out = CscMatrix::new(self.num_cols, self.num_rows);
        let mut work = Vec::new();
        self.transpose_into(&mut out, &mut work);
        out
    }

    /// Sparse matrix-matrix product: C = A * B
    ///
    /// The columns of C are sorted by row index.
    pub fn matmul(&self, other: &CscMatrix<T>) -> CscMatrix<T> {
        assert_eq!(
            self.num_cols, other.num_rows,
            "Matrix dimension mismatch: A.cols ({}) != B.rows ({})",
            self.num_cols, other.num_rows
        );

        let m = self.num_rows;
        let n = other.num_cols;
        let mut out = CscMatrix::with_capacity(m, n, self.nnz() + other.nnz());

        // dense accumulator with a marker holding the last column that touched each row
        let mut acc = vec![T::zero(); m];
        let mut mark = vec![usize::MAX; m];
        let mut pattern: Vec<usize> = Vec::new();

        for j in 0..n {
            pattern.clear();
            for (k, b_kj) in other.col_entries(j) {
                for (i, a_ik) in self.col_entries(k) {
                    if mark[i] != j {
                        mark[i] = j;
                        acc[i] = T::zero();
                        pattern.push(i);
                    }
                    acc[i] += a_ik * b_kj;
                }
            }
            pattern.sort_unstable();
            for &i in &pattern {
                out.row_indices.push(i);
                out.values.push(acc[i]);
            }
            out.col_ptrs[j + 1] = out.values.len();
        }

        out
    }

    /// Symmetric permutation `C = P A P^T` of the upper triangle of a square matrix.
    ///
    /// `pinv[i]` is the new index of row/column `i`. Only entries with
    /// `row <= col` are read; the result holds the upper triangle of the
    /// permuted matrix with unsorted columns.
    pub fn permute_symmetric(&self, pinv: &[usize]) -> CscMatrix<T> {
        assert_eq!(self.num_rows, self.num_cols, "matrix must be square");
        let n = self.num_cols;
        assert_eq!(pinv.len(), n, "permutation length mismatch");

        // count the entries landing in each column of C
        let mut counts = vec![0usize; n];
        for j in 0..n {
            let j2 = pinv[j];
            for idx in self.col_range(j) {
                let i = self.row_indices[idx];
                if i > j {
                    continue;
                }
                let i2 = pinv[i];
                counts[i2.max(j2)] += 1;
            }
        }

        let mut out = CscMatrix::new(n, n);
        for j in 0..n {
            out.col_ptrs[j + 1] = out.col_ptrs[j] + counts[j];
            counts[j] = out.col_ptrs[j];
        }
        let nnz = out.col_ptrs[n];
        out.row_indices.resize(nnz, 0);
        out.values.resize(nnz, T::zero());

        for j in 0..n {
            let j2 = pinv[j];
            for idx in self.col_range(j) {
                let i = self.row_indices[idx];
                if i > j {
                    continue;
                }
                let i2 = pinv[i];
                let dst = counts[i2.max(j2)];
                counts[i2.max(j2)] += 1;
                out.row_indices[dst] = i2.min(j2);
                out.values[dst] = self.values[idx];
            }
        }

        out
    }

    /// Permute the columns: column `c` of the output is column `p[c]` of this matrix
    pub fn permute_columns(&self, p: &[usize]) -> CscMatrix<T> {
        assert_eq!(p.len(), self.num_cols, "permutation length mismatch");

        let mut out = CscMatrix::with_capacity(self.num_rows, self.num_cols, self.nnz());
        for (c, &src) in p.iter().enumerate() {
            for (row, val) in self.col_entries(src) {
                out.row_indices.push(row);
                out.values.push(val);
            }
            out.col_ptrs[c + 1] = out.values.len();
        }
        out
    }

    /// Upper triangle (row <= col) of this matrix
    pub fn upper_triangle(&self) -> CscMatrix<T> {
        let mut out = CscMatrix::with_capacity(self.num_rows, self.num_cols, self.nnz());
        for j in 0..self.num_cols {
            for (row, val) in self.col_entries(j) {
                if row <= j {
                    out.row_indices.push(row);
                    out.values.push(val);
                }
            }
            out.col_ptrs[j + 1] = out.values.len();
        }
        out
    }

    /// Convert to dense matrix (for debugging/small matrices)
    ///
    /// Duplicate entries are summed.
    pub fn to_dense(&self) -> Array2<T> {
        let mut dense = Array2::from_elem((self.num_rows, self.num_cols), T::zero());

        for j in 0..self.num_cols {
            for (i, val) in self.col_entries(j) {
                dense[[i, j]] += val;
            }
        }

        dense
    }
}

impl<T: RealField> LinearOperator<T> for CscMatrix<T> {
    fn num_rows(&self) -> usize {
        self.num_rows
    }

    fn num_cols(&self) -> usize {
        self.num_cols
    }

    fn apply(&self, x: &Array1<T>) -> Array1<T> {
        self.matvec(x)
    }

    fn apply_transpose(&self, x: &Array1<T>) -> Array1<T> {
        self.matvec_transpose(x)
    }
}

/// Builder for constructing CSC matrices column by column
pub struct CscBuilder<T: RealField> {
    num_rows: usize,
    num_cols: usize,
    values: Vec<T>,
    row_indices: Vec<usize>,
    col_ptrs: Vec<usize>,
}

impl<T: RealField> CscBuilder<T> {
    /// Create a new CSC builder
    pub fn new(num_rows: usize, num_cols: usize) -> Self {
        Self::with_capacity(num_rows, num_cols, 0)
    }

    /// Create a new CSC builder with estimated non-zeros
    pub fn with_capacity(num_rows: usize, num_cols: usize, nnz_estimate: usize) -> Self {
        let mut col_ptrs = Vec::with_capacity(num_cols + 1);
        col_ptrs.push(0);
        Self {
            num_rows,
            num_cols,
            values: Vec::with_capacity(nnz_estimate),
            row_indices: Vec::with_capacity(nnz_estimate),
            col_ptrs,
        }
    }

    /// Add entries for the next column. Explicit zeros are skipped.
    pub fn add_col_entries(&mut self, entries: impl Iterator<Item = (usize, T)>) {
        assert!(
            self.col_ptrs.len() <= self.num_cols,
            "all {} columns have already been added",
            self.num_cols
        );
        for (row, val) in entries {
            assert!(row < self.num_rows, "row index out of bounds");
            if val != T::zero() {
                self.values.push(val);
                self.row_indices.push(row);
            }
        }
        self.col_ptrs.push(self.values.len());
    }

    /// Finish building and return the CSC matrix
    pub fn finish(mut self) -> CscMatrix<T> {
        // Fill remaining columns if not all columns were added
        while self.col_ptrs.len() <= self.num_cols {
            self.col_ptrs.push(self.values.len());
        }

        CscMatrix {
            num_rows: self.num_rows,
            num_cols: self.num_cols,
            values: self.values,
            row_indices: self.row_indices,
            col_ptrs: self.col_ptrs,
        }
    }
}
