//! Nonzero patterns of sparse triangular solutions
//!
//! The pattern of `x` in `G x = b` is the set of nodes reachable from the
//! nonzeros of `b` in the graph of `G`, where column `j` has an edge to every
//! row stored in it. The pattern of row `k` of a Cholesky factor is found the
//! same way, with the elimination tree standing in for the graph of `L`.

use crate::sparse::{CscMatrix, UNMAPPED};
use crate::traits::RealField;
use crate::workspace::ReachWorkspace;

/// Nodes of the graph of `g` reachable from the nonzero rows of column `col_b` of `b`.
///
/// On return `xi[top..n]` holds the reached nodes in topological order: every
/// node comes before the nodes it reaches. `xi[..top]` is used as the DFS
/// stack and holds leftovers.
///
/// With a row permutation `pinv`, the edges of node `j` are the entries of
/// column `pinv[j]` of `g`. Nodes mapped to [`UNMAPPED`] have no edges.
///
/// Returns `top`.
///
/// # Panics
///
/// Panics if `xi` is shorter than `g.num_cols`.
pub fn search_nz_rows_in_b<T: RealField>(
    g: &CscMatrix<T>,
    b: &CscMatrix<T>,
    col_b: usize,
    pinv: Option<&[usize]>,
    xi: &mut [usize],
    w: &mut ReachWorkspace,
) -> usize {
    let n = g.num_cols;
    assert!(xi.len() >= n, "xi must hold one entry per column of g");
    w.prepare(n);

    let mut top = n;
    for idx in b.col_range(col_b) {
        let j = b.row_indices[idx];
        if !w.marks[j] {
            top = depth_first(j, g, top, pinv, xi, w);
        }
    }

    for &j in &xi[top..n] {
        w.marks[j] = false;
    }
    top
}

/// Iterative depth-first search from `start`. `xi[..len]` is the recursion
/// stack and finished nodes are written downwards from `top`.
fn depth_first<T: RealField>(
    start: usize,
    g: &CscMatrix<T>,
    mut top: usize,
    pinv: Option<&[usize]>,
    xi: &mut [usize],
    w: &mut ReachWorkspace,
) -> usize {
    xi[0] = start;
    let mut len = 1;

    while len > 0 {
        let head = len - 1;
        let j = xi[head];
        let column = match pinv {
            Some(pinv) => pinv[j],
            None => j,
        };
        let edges = if column == UNMAPPED {
            0..0
        } else {
            g.col_range(column)
        };

        if !w.marks[j] {
            w.marks[j] = true;
            w.pstack[head] = edges.start;
        }

        let mut done = true;
        for p in w.pstack[head]..edges.end {
            let i = g.row_indices[p];
            if w.marks[i] {
                continue;
            }
            // resume from here once the child is finished
            w.pstack[head] = p;
            xi[len] = i;
            len += 1;
            done = false;
            break;
        }

        if done {
            len -= 1;
            top -= 1;
            xi[top] = j;
        }
    }

    top
}

/// Nonzero pattern of row `k` of the Cholesky factor of `a`, diagonal excluded.
///
/// Walks the elimination tree `parent` upwards from every row `i <= k` of
/// column `k` until an already visited node is met. On return `s[top..n]`
/// holds the pattern in topological order: each path is stored from the row
/// of `a` towards `k`, and later paths precede the ones they join. The work
/// is proportional to the size of the pattern.
///
/// `marks` must be all false on entry and is all false again on return.
///
/// Returns `top`.
pub fn search_nz_rows_elim<T: RealField>(
    a: &CscMatrix<T>,
    k: usize,
    parent: &[Option<usize>],
    s: &mut [usize],
    marks: &mut [bool],
) -> usize {
    let n = a.num_cols;
    assert!(
        s.len() >= n && marks.len() >= n,
        "workspace must hold one entry per column"
    );

    let mut top = n;
    marks[k] = true;

    for idx in a.col_range(k) {
        let mut i = a.row_indices[idx];
        if i > k {
            continue;
        }

        // climb until a visited node, recording the path at the bottom of s
        let mut len = 0;
        while !marks[i] {
            s[len] = i;
            len += 1;
            marks[i] = true;
            match parent[i] {
                Some(p) => i = p,
                None => break,
            }
        }

        // move the path on top of the output stack
        while len > 0 {
            len -= 1;
            top -= 1;
            s[top] = s[len];
        }
    }

    for &j in &s[top..n] {
        marks[j] = false;
    }
    marks[k] = false;
    top
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testdata;
    use ndarray::Array2;

    fn parse_pattern(rows: &[&[u8]]) -> CscMatrix<f64> {
        let n = rows.len();
        let dense = Array2::from_shape_fn((n, rows[0].len()), |(i, j)| rows[i][j] as f64);
        CscMatrix::from_dense(&dense, 0.0)
    }

    fn column(rows: &[usize], n: usize) -> CscMatrix<f64> {
        let triplets = rows.iter().map(|&r| (r, 0, 1.0 + r as f64)).collect();
        CscMatrix::from_triplets(n, 1, triplets)
    }

    fn sorted(values: &[usize]) -> Vec<usize> {
        let mut v = values.to_vec();
        v.sort_unstable();
        v
    }

    #[test]
    fn test_search_diagonal() {
        let mut a = CscMatrix::from_diagonal(&[1.0, 2.0, 3.0]);
        let mut xi = vec![0; 3];
        let mut w = ReachWorkspace::new();

        // B is filled in
        let top = search_nz_rows_in_b(&a, &column(&[0, 1, 2], 3), 0, None, &mut xi, &mut w);
        assert_eq!(top, 0);
        assert_eq!(xi, vec![2, 1, 0]);

        // B is empty
        let top = search_nz_rows_in_b(&a, &column(&[], 3), 0, None, &mut xi, &mut w);
        assert_eq!(top, 3);

        // B has a single element
        let top = search_nz_rows_in_b(&a, &column(&[1], 3), 0, None, &mut xi, &mut w);
        assert_eq!(top, 2);
        assert_eq!(xi[2], 1);

        // A is missing a diagonal entry and B is full
        a.remove(1, 1);
        let top = search_nz_rows_in_b(&a, &column(&[0, 1, 2], 3), 0, None, &mut xi, &mut w);
        assert_eq!(top, 0);
        assert_eq!(xi, vec![2, 1, 0]);

        // B is missing the same element
        let top = search_nz_rows_in_b(&a, &column(&[0, 2], 3), 0, None, &mut xi, &mut w);
        assert_eq!(top, 1);
        assert_eq!(&xi[1..], &[2, 0]);

        assert!(w.marks.iter().all(|&m| !m));
    }

    #[test]
    fn test_search_full_triangle() {
        let mut rng = testdata::seeded_rng(234);
        let a = testdata::triangle_lower(4, 10, -1.0, 1.0, &mut rng);
        assert_eq!(a.nnz(), 10);
        let mut xi = vec![0; 4];
        let mut w = ReachWorkspace::new();

        let top = search_nz_rows_in_b(&a, &column(&[0, 1, 2, 3], 4), 0, None, &mut xi, &mut w);
        assert_eq!(top, 0);
        assert_eq!(xi, vec![0, 1, 2, 3]);

        // a hole below the first entry is filled in
        let top = search_nz_rows_in_b(&a, &column(&[0, 2, 3], 4), 0, None, &mut xi, &mut w);
        assert_eq!(top, 0);
        assert_eq!(xi, vec![0, 1, 2, 3]);

        // a hole on top is not filled in, nor the one below it
        let top = search_nz_rows_in_b(&a, &column(&[2, 3], 4), 0, None, &mut xi, &mut w);
        assert_eq!(top, 2);
        assert_eq!(&xi[2..], &[2, 3]);
    }

    #[test]
    fn test_search_hand_traced() {
        let a = parse_pattern(&[
            &[1, 0, 0, 0, 0],
            &[1, 1, 0, 0, 0],
            &[0, 1, 1, 0, 0],
            &[1, 0, 0, 1, 0],
            &[0, 1, 0, 0, 1],
        ]);
        let b = column(&[0, 1, 2, 4], 5);
        let mut xi = vec![0; 5];
        let mut w = ReachWorkspace::new();

        let top = search_nz_rows_in_b(&a, &b, 0, None, &mut xi, &mut w);

        assert_eq!(top, 0);
        assert_eq!(xi, vec![0, 3, 1, 4, 2]);
    }

    #[test]
    fn test_search_unmapped_rows_have_no_edges() {
        let a = parse_pattern(&[&[1, 0, 0], &[1, 1, 0], &[0, 1, 1]]);
        let pinv = [0, UNMAPPED, 2];
        let mut xi = vec![0; 3];
        let mut w = ReachWorkspace::new();

        let top = search_nz_rows_in_b(&a, &column(&[0], 3), 0, Some(&pinv), &mut xi, &mut w);

        // 0 reaches 1, but 1 has no column to continue through
        assert_eq!(top, 1);
        assert_eq!(&xi[1..], &[0, 1]);
    }

    #[test]
    fn test_search_elim_hand_traced() {
        let a = parse_pattern(&[
            &[1, 0, 1, 1, 0, 1, 0],
            &[0, 1, 0, 1, 0, 0, 0],
            &[0, 0, 1, 0, 1, 0, 0],
            &[0, 0, 0, 1, 0, 0, 0],
            &[0, 0, 0, 0, 1, 0, 1],
            &[0, 0, 0, 0, 0, 1, 1],
            &[0, 0, 0, 0, 0, 0, 1],
        ]);
        let parent = [Some(2), Some(3), Some(3), Some(4), Some(5), Some(6), None];
        let mut s = vec![0; 7];
        let mut marks = vec![false; 7];

        let expected: [&[usize]; 7] = [&[], &[], &[0], &[0, 1, 2], &[2, 3], &[0, 2, 3, 4], &[4, 5]];
        for (k, pattern) in expected.iter().enumerate() {
            let top = search_nz_rows_elim(&a, k, &parent, &mut s, &mut marks);
            assert_eq!(top, 7 - pattern.len(), "row {}", k);
            assert_eq!(sorted(&s[top..]), pattern.to_vec(), "row {}", k);
            assert!(marks.iter().all(|&m| !m));
        }
    }

    #[test]
    fn test_search_elim_path_order() {
        let a = parse_pattern(&[&[1, 0, 1], &[0, 1, 1], &[0, 0, 1]]);
        let parent = [Some(1), Some(2), None];
        let mut s = vec![0; 3];
        let mut marks = vec![false; 3];

        let top = search_nz_rows_elim(&a, 2, &parent, &mut s, &mut marks);

        assert_eq!(top, 1);
        assert_eq!(&s[1..], &[0, 1]);
    }
}
