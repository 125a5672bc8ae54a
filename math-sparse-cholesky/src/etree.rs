//! Elimination tree, postorder and column counts
//!
//! The elimination tree of a symmetric matrix `A = L L^T` has an edge from
//! column `i` to column `parent[i] > i` when `L[parent[i], i]` is the first
//! off-diagonal nonzero of column `i` of `L`. Together with a postorder of
//! the tree it drives the symbolic analysis of the Cholesky factorization.
//!
//! All routines read only the pattern of the matrix and take their scratch
//! space as explicit workspace vectors that are grown as needed.

use crate::sparse::CscMatrix;
use crate::traits::RealField;
use crate::workspace::adjust;

/// Sentinel for "no node" inside index workspaces
const EMPTY: usize = usize::MAX;

/// Compute the elimination tree of `A` (`ata = false`) or of `A^T A` (`ata = true`).
///
/// With `ata = false` the matrix is treated as symmetric and only the entries
/// with `row < col` are read, so either the upper triangle or the full matrix
/// may be passed. With `ata = true` the matrix may be rectangular
/// (`num_rows >= num_cols` is typical) and the tree of `A^T A` is computed
/// without forming the product.
///
/// `parent[i]` is set to the parent of column `i`, or `None` for a root.
///
/// # Panics
///
/// Panics if `parent.len() != a.num_cols`.
pub fn elimination_tree<T: RealField>(
    a: &CscMatrix<T>,
    ata: bool,
    parent: &mut [Option<usize>],
    workspace: &mut Vec<Option<usize>>,
) {
    let m = a.num_rows;
    let n = a.num_cols;
    assert_eq!(parent.len(), n, "parent must have one entry per column");

    let w = adjust(workspace, if ata { n + m } else { n });
    // ancestor: path-compressed pointer towards the current root of each subtree
    // prev: last column seen in each row (A^T A mode only)
    let (ancestor, prev) = w.split_at_mut(n);
    ancestor.fill(None);
    prev.fill(None);
    parent.fill(None);

    for k in 0..n {
        for idx in a.col_range(k) {
            let row = a.row_indices[idx];
            let mut node = if ata { prev[row] } else { Some(row) };

            while let Some(i) = node {
                if i >= k {
                    break;
                }
                let next = ancestor[i];
                ancestor[i] = Some(k);
                if next.is_none() {
                    parent[i] = Some(k);
                }
                node = next;
            }

            if ata {
                prev[row] = Some(k);
            }
        }
    }
}

/// Postorder a forest.
///
/// On return `order[k]` is the node with postorder label `k`: every node
/// appears after all of its descendants. Children are visited in increasing
/// index order and the trees in increasing order of their roots.
///
/// # Panics
///
/// Panics if the lengths differ or if `parent` contains a cycle.
pub fn postorder(parent: &[Option<usize>], order: &mut [usize], workspace: &mut Vec<usize>) {
    let n = parent.len();
    assert_eq!(order.len(), n, "order must have one entry per node");

    let w = adjust(workspace, 3 * n);
    let (head, rest) = w.split_at_mut(n);
    let (next, stack) = rest.split_at_mut(n);

    // children lists, built backwards so that each list is in increasing order
    head.fill(EMPTY);
    for j in (0..n).rev() {
        if let Some(p) = parent[j] {
            next[j] = head[p];
            head[p] = j;
        }
    }

    let mut k = 0;
    for root in 0..n {
        if parent[root].is_none() {
            k = depth_first(root, k, head, next, order, stack);
        }
    }
    assert_eq!(k, n, "parent array does not describe a forest");
}

/// Iterative depth-first traversal of the tree rooted at `root`, labelling
/// nodes from `k` on as they finish. Consumes the children lists in `head`.
fn depth_first(
    root: usize,
    mut k: usize,
    head: &mut [usize],
    next: &[usize],
    order: &mut [usize],
    stack: &mut [usize],
) -> usize {
    stack[0] = root;
    let mut len = 1;

    while len > 0 {
        let p = stack[len - 1];
        let child = head[p];
        if child == EMPTY {
            len -= 1;
            order[k] = p;
            k += 1;
        } else {
            head[p] = next[child];
            stack[len] = child;
            len += 1;
        }
    }

    k
}

/// Outcome of the skeleton-leaf test used by [`column_counts`]
enum Leaf {
    /// Column `j` is not a leaf of the row subtree
    No,
    /// First leaf of the row subtree
    First,
    /// Subsequent leaf; holds the least common ancestor with the previous leaf
    Subsequent(usize),
}

/// Determine whether `j` is a leaf of the `i`-th row subtree and, if it is
/// not the first one, find the least common ancestor with the previous leaf.
fn skeleton_leaf(
    i: usize,
    j: usize,
    first: &[usize],
    maxfirst: &mut [usize],
    prevleaf: &mut [usize],
    ancestor: &mut [usize],
) -> Leaf {
    if i <= j || (maxfirst[i] != EMPTY && first[j] <= maxfirst[i]) {
        return Leaf::No;
    }
    maxfirst[i] = first[j];

    let jprev = prevleaf[i];
    prevleaf[i] = j;
    if jprev == EMPTY {
        return Leaf::First;
    }

    let mut q = jprev;
    while q != ancestor[q] {
        q = ancestor[q];
    }
    // path compression
    let mut s = jprev;
    while s != q {
        let sparent = ancestor[s];
        ancestor[s] = q;
        s = sparent;
    }

    Leaf::Subsequent(q)
}

/// Number of nonzeros, diagonal included, in each column of the Cholesky factor `L`.
///
/// Only the strict upper triangle of `a` is read. `parent` is the elimination
/// tree of `a` and `post` a postorder of it.
///
/// # Panics
///
/// Panics if the lengths of `parent`, `post` or `counts` differ from `a.num_cols`.
pub fn column_counts<T: RealField>(
    a: &CscMatrix<T>,
    parent: &[Option<usize>],
    post: &[usize],
    counts: &mut [usize],
    workspace: &mut Vec<usize>,
) {
    let n = a.num_cols;
    assert_eq!(parent.len(), n, "parent must have one entry per column");
    assert_eq!(post.len(), n, "post must have one entry per column");
    assert_eq!(counts.len(), n, "counts must have one entry per column");

    let w = adjust(workspace, 5 * n + 1 + a.nnz());
    let (first, rest) = w.split_at_mut(n);
    let (maxfirst, rest) = rest.split_at_mut(n);
    let (prevleaf, rest) = rest.split_at_mut(n);
    let (ancestor, rest) = rest.split_at_mut(n);
    let (row_ptrs, row_cols) = rest.split_at_mut(n + 1);

    // pattern of the strict upper triangle stored by rows
    row_ptrs.fill(0);
    for k in 0..n {
        for idx in a.col_range(k) {
            let i = a.row_indices[idx];
            if i < k {
                row_ptrs[i + 1] += 1;
            }
        }
    }
    for i in 0..n {
        row_ptrs[i + 1] += row_ptrs[i];
    }
    ancestor.copy_from_slice(&row_ptrs[..n]);
    for k in 0..n {
        for idx in a.col_range(k) {
            let i = a.row_indices[idx];
            if i < k {
                row_cols[ancestor[i]] = k;
                ancestor[i] += 1;
            }
        }
    }

    // counts holds the deltas until they are summed up the tree. Partial
    // values may be negative, so they are kept modulo 2^usize::BITS.
    let delta = counts;

    // first[j]: smallest postorder label among the descendants of j
    first.fill(EMPTY);
    maxfirst.fill(EMPTY);
    prevleaf.fill(EMPTY);
    for (k, &j) in post.iter().enumerate() {
        delta[j] = if first[j] == EMPTY { 1 } else { 0 };
        let mut node = Some(j);
        while let Some(jj) = node {
            if first[jj] != EMPTY {
                break;
            }
            first[jj] = k;
            node = parent[jj];
        }
    }

    for (i, a) in ancestor.iter_mut().enumerate() {
        *a = i;
    }
    for &j in post {
        if let Some(p) = parent[j] {
            delta[p] = delta[p].wrapping_sub(1);
        }
        for &i in &row_cols[row_ptrs[j]..row_ptrs[j + 1]] {
            match skeleton_leaf(i, j, first, maxfirst, prevleaf, ancestor) {
                Leaf::No => {}
                Leaf::First => delta[j] = delta[j].wrapping_add(1),
                Leaf::Subsequent(q) => {
                    delta[j] = delta[j].wrapping_add(1);
                    delta[q] = delta[q].wrapping_sub(1);
                }
            }
        }
        if let Some(p) = parent[j] {
            ancestor[j] = p;
        }
    }

    // sum the deltas up the tree; children always precede their parent
    for j in 0..n {
        if let Some(p) = parent[j] {
            delta[p] = delta[p].wrapping_add(delta[j]);
        }
    }
    for &count in delta.iter() {
        assert!(
            count > 0 && count <= n,
            "column count must include the diagonal"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testdata;
    use crate::triangular::reach::search_nz_rows_elim;
    use ndarray::Array2;
    use rand::Rng;

    fn parse_pattern(rows: &[&[u8]]) -> CscMatrix<f64> {
        let n = rows.len();
        let dense = Array2::from_shape_fn((n, rows[0].len()), |(i, j)| rows[i][j] as f64);
        CscMatrix::from_dense(&dense, 0.0)
    }

    fn tree(a: &CscMatrix<f64>, ata: bool) -> Vec<Option<usize>> {
        let mut parent = vec![None; a.num_cols];
        let mut workspace = Vec::new();
        elimination_tree(a, ata, &mut parent, &mut workspace);
        parent
    }

    /// Climb from `start` and check that `end` is reached exactly
    fn check_path(start: usize, end: usize, parent: &[Option<usize>]) {
        let mut i = start;
        while i < end {
            i = parent[i].expect("path ended at a root before reaching the column");
        }
        assert_eq!(i, end);
    }

    fn assert_postorder(parent: &[Option<usize>], order: &[usize]) {
        let n = parent.len();
        let mut seen = vec![0; n];
        // reverse[original index] = postorder label
        let mut reverse = vec![0; n];
        for (k, &node) in order.iter().enumerate() {
            seen[node] += 1;
            reverse[node] = k;
        }
        assert!(seen.iter().all(|&s| s == 1), "order is not a permutation");

        for i in 0..n {
            let mut node = i;
            while let Some(p) = parent[node] {
                assert!(
                    reverse[p] > reverse[i],
                    "ancestor {} of {} has a smaller label",
                    p,
                    i
                );
                node = p;
            }
        }
    }

    #[test]
    fn test_etree_full_square() {
        let a = parse_pattern(&[
            &[1, 1, 1, 1, 1],
            &[0, 1, 1, 1, 1],
            &[0, 0, 1, 1, 1],
            &[0, 0, 0, 1, 1],
            &[0, 0, 0, 0, 1],
        ]);

        assert_eq!(tree(&a, false), vec![Some(1), Some(2), Some(3), Some(4), None]);
    }

    #[test]
    fn test_etree_diagonal_square() {
        let a: CscMatrix<f64> = CscMatrix::identity(5);
        assert_eq!(tree(&a, false), vec![None; 5]);
    }

    #[test]
    fn test_etree_hand_constructed() {
        let a = parse_pattern(&[
            &[1, 0, 0, 0, 0],
            &[0, 1, 1, 1, 0],
            &[0, 0, 1, 0, 1],
            &[0, 0, 0, 1, 0],
            &[0, 0, 0, 0, 1],
        ]);
        assert_eq!(tree(&a, false), vec![None, Some(2), Some(3), Some(4), None]);

        let a = parse_pattern(&[
            &[1, 0, 1, 1, 0, 1, 0],
            &[0, 1, 0, 1, 0, 0, 0],
            &[0, 0, 1, 0, 1, 0, 0],
            &[0, 0, 0, 1, 0, 0, 0],
            &[0, 0, 0, 0, 1, 0, 1],
            &[0, 0, 0, 0, 0, 1, 1],
            &[0, 0, 0, 0, 0, 0, 1],
        ]);
        assert_eq!(
            tree(&a, false),
            vec![Some(2), Some(3), Some(3), Some(4), Some(5), Some(6), None]
        );

        // same leading block without the last column
        let a = parse_pattern(&[
            &[1, 0, 1, 1, 0, 1],
            &[0, 1, 0, 1, 0, 0],
            &[0, 0, 1, 0, 1, 0],
            &[0, 0, 0, 1, 0, 0],
            &[0, 0, 0, 0, 1, 0],
            &[0, 0, 0, 0, 0, 1],
        ]);
        assert_eq!(
            tree(&a, false),
            vec![Some(2), Some(3), Some(3), Some(4), Some(5), None]
        );
    }

    #[test]
    fn test_etree_empty_column_is_root() {
        let a = parse_pattern(&[&[1, 0, 1], &[0, 0, 0], &[0, 0, 1]]);
        assert_eq!(tree(&a, false), vec![Some(2), None, None]);
    }

    #[test]
    fn test_etree_random_ancestor_property() {
        let mut rng = testdata::seeded_rng(234);
        for _ in 0..200 {
            let n = rng.random_range(1..=16);
            let off_diagonal = n * (n - 1) / 2;
            let nz = n + (off_diagonal as f64 * rng.random_range(0.2..1.0)) as usize;
            let a = testdata::triangle_upper(n, nz, -1.0, 1.0, &mut rng);

            let parent = tree(&a, false);
            for col in 0..n {
                for (row, _) in a.col_entries(col) {
                    if row < col {
                        check_path(row, col, &parent);
                    }
                }
            }
        }
    }

    #[test]
    fn test_etree_ata_square() {
        let mut rng = testdata::seeded_rng(235);
        for _ in 0..200 {
            let n = rng.random_range(1..=16);
            let a = testdata::triangle_random_density(n, 0.1, 0.5, &mut rng);
            let ata = a.transpose().matmul(&a);

            assert_eq!(tree(&a, true), tree(&ata, false));
        }
    }

    #[test]
    fn test_etree_ata_tall() {
        let mut rng = testdata::seeded_rng(236);
        for _ in 0..200 {
            let n = rng.random_range(1..=16);
            let top = testdata::triangle_random_density(n, 0.1, 0.5, &mut rng);
            let bottom = testdata::rectangle(3, n, 8.min(3 * n), -1.0, 1.0, &mut rng);
            let tall = testdata::concat_rows(&top, &bottom);
            let ata = tall.transpose().matmul(&tall);

            assert_eq!(tall.num_rows, n + 3);
            assert_eq!(tree(&tall, true), tree(&ata, false));
        }
    }

    #[test]
    fn test_postorder_book_example() {
        let parent = [
            Some(5),
            Some(2),
            Some(7),
            Some(5),
            Some(7),
            Some(6),
            Some(8),
            Some(9),
            Some(9),
            Some(10),
            None,
        ];
        let mut order = vec![0; parent.len()];
        let mut workspace = Vec::new();

        postorder(&parent, &mut order, &mut workspace);

        assert_postorder(&parent, &order);
        assert_eq!(order[10], 10);
    }

    #[test]
    fn test_postorder_islands() {
        let parent = [None; 5];
        let mut order = vec![0; 5];
        let mut workspace = Vec::new();

        postorder(&parent, &mut order, &mut workspace);

        assert_postorder(&parent, &order);
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_postorder_multiple_roots() {
        let parent = [
            Some(5),
            Some(2),
            Some(7),
            Some(5),
            Some(7),
            Some(6),
            Some(8),
            None,
            None,
        ];
        let mut order = vec![0; parent.len()];
        let mut workspace = Vec::new();

        postorder(&parent, &mut order, &mut workspace);

        assert_postorder(&parent, &order);
    }

    #[test]
    #[should_panic(expected = "forest")]
    fn test_postorder_rejects_cycle() {
        let parent = [Some(1), Some(0)];
        let mut order = vec![0; 2];
        postorder(&parent, &mut order, &mut Vec::new());
    }

    /// Column counts from the row patterns of L: row k contributes one entry
    /// to every column in its pattern, plus the diagonal.
    fn brute_force_counts(a: &CscMatrix<f64>, parent: &[Option<usize>]) -> Vec<usize> {
        let n = a.num_cols;
        let mut counts = vec![1; n];
        let mut s = vec![0; n];
        let mut marks = vec![false; n];
        for k in 0..n {
            let top = search_nz_rows_elim(a, k, parent, &mut s, &mut marks);
            for &j in &s[top..] {
                counts[j] += 1;
            }
        }
        counts
    }

    #[test]
    fn test_column_counts_random() {
        let mut rng = testdata::seeded_rng(237);
        // shared between iterations, so stale contents must not leak
        let mut workspace = Vec::new();
        let mut counts = Vec::new();
        for _ in 0..100 {
            let n = rng.random_range(1..=20);
            let a = testdata::symmetric_positive_definite(n, 0.2, &mut rng);

            let parent = tree(&a, false);
            let mut post = vec![0; n];
            postorder(&parent, &mut post, &mut Vec::new());

            counts.clear();
            counts.resize(n, usize::MAX);
            column_counts(&a, &parent, &post, &mut counts, &mut workspace);

            assert_eq!(counts, brute_force_counts(&a, &parent));
        }
    }

    #[test]
    fn test_column_counts_dense_and_diagonal() {
        let dense = parse_pattern(&[&[1, 1, 1], &[1, 1, 1], &[1, 1, 1]]);
        let parent = tree(&dense, false);
        let mut post = vec![0; 3];
        postorder(&parent, &mut post, &mut Vec::new());
        let mut counts = vec![0; 3];
        column_counts(&dense, &parent, &post, &mut counts, &mut Vec::new());
        assert_eq!(counts, vec![3, 2, 1]);

        let diag: CscMatrix<f64> = CscMatrix::identity(4);
        let parent = tree(&diag, false);
        let mut post = vec![0; 4];
        postorder(&parent, &mut post, &mut Vec::new());
        let mut counts = vec![0; 4];
        column_counts(&diag, &parent, &post, &mut counts, &mut Vec::new());
        assert_eq!(counts, vec![1; 4]);
    }
}
