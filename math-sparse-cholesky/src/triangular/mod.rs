//! Triangular solvers for CSC matrices
//!
//! Dense right hand sides are solved in place with plain forward or backward
//! substitution. Sparse right hand sides first compute the nonzero pattern of
//! the solution (see [`reach`]) and only touch the entries inside it.
//!
//! Diagonal entries may be stored anywhere in their column. They are looked
//! up first at the position a factorization leaves them in (first for lower
//! triangular, last for upper triangular) and searched for otherwise.

pub mod reach;

use crate::sparse::{CscMatrix, UNMAPPED};
use crate::traits::RealField;
use crate::workspace::{ReachWorkspace, TriangularWorkspace};
use std::ops::Range;

pub use reach::{search_nz_rows_elim, search_nz_rows_in_b};

/// Index of the entry of column `col` with row index `row`.
///
/// # Panics
///
/// Panics if the entry is not stored.
#[inline]
fn diagonal_index<T: RealField>(g: &CscMatrix<T>, col: usize, row: usize, first: bool) -> usize {
    let range = g.col_range(col);
    if !range.is_empty() {
        let guess = if first { range.start } else { range.end - 1 };
        if g.row_indices[guess] == row {
            return guess;
        }
    }
    find_in(g, range, row)
        .unwrap_or_else(|| panic!("triangular matrix has no diagonal entry in column {}", col))
}

fn find_in<T: RealField>(g: &CscMatrix<T>, mut range: Range<usize>, row: usize) -> Option<usize> {
    range.find(|&idx| g.row_indices[idx] == row)
}

/// Solve `L x = b` in place, where `L` is lower triangular.
///
/// # Panics
///
/// Panics if `x` is shorter than the matrix or a diagonal entry is missing.
pub fn solve_l<T: RealField>(l: &CscMatrix<T>, x: &mut [T]) {
    let n = l.num_cols;
    assert!(x.len() >= n, "x is shorter than the matrix");

    for j in 0..n {
        let diag = diagonal_index(l, j, j, true);
        x[j] /= l.values[diag];
        let xj = x[j];
        for idx in l.col_range(j) {
            if idx != diag {
                x[l.row_indices[idx]] -= l.values[idx] * xj;
            }
        }
    }
}

/// Solve `L^T x = b` in place, where `L` is lower triangular.
///
/// # Panics
///
/// Panics if `x` is shorter than the matrix or a diagonal entry is missing.
pub fn solve_tran_l<T: RealField>(l: &CscMatrix<T>, x: &mut [T]) {
    let n = l.num_cols;
    assert!(x.len() >= n, "x is shorter than the matrix");

    for j in (0..n).rev() {
        let diag = diagonal_index(l, j, j, true);
        let mut sum = x[j];
        for idx in l.col_range(j) {
            if idx != diag {
                sum -= l.values[idx] * x[l.row_indices[idx]];
            }
        }
        x[j] = sum / l.values[diag];
    }
}

/// Solve `U x = b` in place, where `U` is upper triangular.
///
/// # Panics
///
/// Panics if `x` is shorter than the matrix or a diagonal entry is missing.
pub fn solve_u<T: RealField>(u: &CscMatrix<T>, x: &mut [T]) {
    let n = u.num_cols;
    assert!(x.len() >= n, "x is shorter than the matrix");

    for j in (0..n).rev() {
        let diag = diagonal_index(u, j, j, false);
        x[j] /= u.values[diag];
        let xj = x[j];
        for idx in u.col_range(j) {
            if idx != diag {
                x[u.row_indices[idx]] -= u.values[idx] * xj;
            }
        }
    }
}

/// Solve `G x = b[:, col_b]` for a sparse right hand side.
///
/// `G` is lower triangular when `lower` is true and upper triangular
/// otherwise. With a permutation, column `j` of the system is stored in
/// column `pinv[j]` of `g`; row indices of `g` and the entries of `x` are in
/// the original ordering and the diagonal of column `j` is the entry in row
/// `j`.
///
/// Only the entries of `x` in the nonzero pattern of the solution are
/// written; the pattern is `workspace.pattern(top)`. Returns `top`, the
/// number of structurally zero entries of the solution.
///
/// # Panics
///
/// Panics if the dimensions do not agree or a needed diagonal entry is missing.
pub fn solve_column<T: RealField>(
    g: &CscMatrix<T>,
    lower: bool,
    b: &CscMatrix<T>,
    col_b: usize,
    x: &mut [T],
    pinv: Option<&[usize]>,
    workspace: &mut TriangularWorkspace<T>,
) -> usize {
    workspace.prepare(g.num_cols);
    solve_column_with(
        g,
        lower,
        b,
        col_b,
        x,
        pinv,
        &mut workspace.xi,
        &mut workspace.reach,
    )
}

#[allow(clippy::too_many_arguments)]
fn solve_column_with<T: RealField>(
    g: &CscMatrix<T>,
    lower: bool,
    b: &CscMatrix<T>,
    col_b: usize,
    x: &mut [T],
    pinv: Option<&[usize]>,
    xi: &mut [usize],
    reach: &mut ReachWorkspace,
) -> usize {
    let n = g.num_cols;
    assert_eq!(g.num_rows, n, "triangular matrix must be square");
    assert_eq!(b.num_rows, n, "right hand side has the wrong number of rows");
    assert!(x.len() >= n, "x is shorter than the matrix");

    let top = search_nz_rows_in_b(g, b, col_b, pinv, xi, reach);

    for &i in &xi[top..n] {
        x[i] = T::zero();
    }
    for (row, val) in b.col_entries(col_b) {
        x[row] += val;
    }

    for &j in &xi[top..n] {
        let col = match pinv {
            Some(pinv) => pinv[j],
            None => j,
        };
        if col == UNMAPPED {
            continue;
        }

        let diag = diagonal_index(g, col, j, lower);
        x[j] /= g.values[diag];
        let xj = x[j];
        for idx in g.col_range(col) {
            if idx != diag {
                x[g.row_indices[idx]] -= g.values[idx] * xj;
            }
        }
    }

    top
}

/// Solve `G X = B` for a sparse right hand side matrix, producing a sparse `X`.
///
/// See [`solve_column`] for the meaning of `lower` and `pinv`. The row
/// indices of each column of `x_out` are in topological order, not sorted.
/// Entries that cancel to zero are kept.
pub fn solve_sparse<T: RealField>(
    g: &CscMatrix<T>,
    lower: bool,
    b: &CscMatrix<T>,
    x_out: &mut CscMatrix<T>,
    pinv: Option<&[usize]>,
    workspace: &mut TriangularWorkspace<T>,
) {
    let n = g.num_cols;
    workspace.prepare(n);
    x_out.reshape(n, b.num_cols);

    let TriangularWorkspace { x, xi, reach, .. } = workspace;
    for col in 0..b.num_cols {
        let top = solve_column_with(g, lower, b, col, x, pinv, xi, reach);
        for &i in &xi[top..n] {
            x_out.row_indices.push(i);
            x_out.values.push(x[i]);
        }
        x_out.col_ptrs[col + 1] = x_out.values.len();
    }
}

/// Scale invariant measure of how close a triangular matrix is to singular.
///
/// Product of the diagonal entries, each divided by the largest diagonal
/// magnitude, in `[0, 1]`. Every diagonal entry contributes, so shrinking any
/// of them lowers the score. Returns zero for an empty matrix or an all-zero
/// diagonal.
pub fn quality_triangular<T: RealField>(t: &CscMatrix<T>) -> T {
    let n = t.num_rows.min(t.num_cols);
    if n == 0 {
        return T::zero();
    }

    let diagonal = t.diagonal();
    let max = diagonal.iter().fold(T::zero(), |max, v| max.max(v.abs()));
    if max == T::zero() {
        return T::zero();
    }

    diagonal
        .iter()
        .fold(T::one(), |quality, &v| quality * (v / max))
        .abs()
}
