//! Random sparse matrices for tests
//!
//! All generators take the random number generator as a parameter so tests
//! can use a seeded [`StdRng`] and stay reproducible.

use crate::sparse::CscMatrix;
use ndarray::Array2;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng, rngs::StdRng};

/// Deterministic generator for tests
pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Dense vector with entries uniform in `[min, max)`
pub fn vector<R: Rng + ?Sized>(n: usize, min: f64, max: f64, rng: &mut R) -> Vec<f64> {
    (0..n).map(|_| rng.random_range(min..max)).collect()
}

/// Dense matrix with entries uniform in `[min, max)`
pub fn dense<R: Rng + ?Sized>(
    rows: usize,
    cols: usize,
    min: f64,
    max: f64,
    rng: &mut R,
) -> Array2<f64> {
    Array2::from_shape_fn((rows, cols), |_| rng.random_range(min..max))
}

/// Random lower triangular matrix with `nz_total` nonzeros, sorted columns.
///
/// The diagonal is always filled with magnitudes in `[0.5, 1.5)` and a random
/// sign so the matrix is well conditioned. The remaining entries are placed
/// at random below the diagonal with values in `[min, max)`. `nz_total` is
/// clamped to `[n, n (n + 1) / 2]`.
pub fn triangle_lower<R: Rng + ?Sized>(
    n: usize,
    nz_total: usize,
    min: f64,
    max: f64,
    rng: &mut R,
) -> CscMatrix<f64> {
    let mut positions: Vec<(usize, usize)> = (0..n)
        .flat_map(|j| (j + 1..n).map(move |i| (i, j)))
        .collect();
    positions.shuffle(rng);

    let off_diagonal = nz_total.clamp(n, n * (n + 1) / 2) - n;
    let mut triplets = Vec::with_capacity(n + off_diagonal);
    for i in 0..n {
        let magnitude = rng.random_range(0.5..1.5);
        let sign = if rng.random::<bool>() { 1.0 } else { -1.0 };
        triplets.push((i, i, sign * magnitude));
    }
    for &(i, j) in &positions[..off_diagonal] {
        triplets.push((i, j, rng.random_range(min..max)));
    }

    CscMatrix::from_triplets(n, n, triplets)
}

/// Random upper triangular matrix, see [`triangle_lower`]
pub fn triangle_upper<R: Rng + ?Sized>(
    n: usize,
    nz_total: usize,
    min: f64,
    max: f64,
    rng: &mut R,
) -> CscMatrix<f64> {
    triangle_lower(n, nz_total, min, max, rng).transpose()
}

/// Random upper triangular matrix whose off-diagonal fill is a random
/// fraction in `[min_fill, max_fill)` of the strict upper triangle
pub fn triangle_random_density<R: Rng + ?Sized>(
    n: usize,
    min_fill: f64,
    max_fill: f64,
    rng: &mut R,
) -> CscMatrix<f64> {
    let off_diagonal = n * n.saturating_sub(1) / 2;
    let fill = rng.random_range(min_fill..max_fill);
    let nz = n + (off_diagonal as f64 * fill).round() as usize;
    triangle_upper(n, nz, -1.0, 1.0, rng)
}

/// Random rectangular matrix with `nz_total` entries at distinct positions
pub fn rectangle<R: Rng + ?Sized>(
    rows: usize,
    cols: usize,
    nz_total: usize,
    min: f64,
    max: f64,
    rng: &mut R,
) -> CscMatrix<f64> {
    let mut positions: Vec<(usize, usize)> = (0..cols)
        .flat_map(|j| (0..rows).map(move |i| (i, j)))
        .collect();
    positions.shuffle(rng);

    let nz = nz_total.min(rows * cols);
    let triplets = positions[..nz]
        .iter()
        .map(|&(i, j)| (i, j, rng.random_range(min..max)))
        .collect();

    CscMatrix::from_triplets(rows, cols, triplets)
}

/// Stack `top` above `bottom`
pub fn concat_rows(top: &CscMatrix<f64>, bottom: &CscMatrix<f64>) -> CscMatrix<f64> {
    assert_eq!(top.num_cols, bottom.num_cols, "column count mismatch");

    let mut out = CscMatrix::with_capacity(
        top.num_rows + bottom.num_rows,
        top.num_cols,
        top.nnz() + bottom.nnz(),
    );
    for j in 0..top.num_cols {
        for (i, v) in top.col_entries(j) {
            out.row_indices.push(i);
            out.values.push(v);
        }
        for (i, v) in bottom.col_entries(j) {
            out.row_indices.push(top.num_rows + i);
            out.values.push(v);
        }
        out.col_ptrs[j + 1] = out.values.len();
    }
    out
}

/// Random symmetric positive definite matrix, both triangles stored.
///
/// Each off-diagonal pair is present with probability `density`. The matrix
/// is made strictly diagonally dominant with a positive diagonal.
pub fn symmetric_positive_definite<R: Rng + ?Sized>(
    n: usize,
    density: f64,
    rng: &mut R,
) -> CscMatrix<f64> {
    let mut triplets = Vec::new();
    let mut row_sums = vec![0.0; n];

    for j in 0..n {
        for i in j + 1..n {
            if rng.random::<f64>() < density {
                let v = rng.random_range(-1.0..1.0);
                triplets.push((i, j, v));
                triplets.push((j, i, v));
                row_sums[i] += f64::abs(v);
                row_sums[j] += f64::abs(v);
            }
        }
    }
    for (i, sum) in row_sums.iter().enumerate() {
        triplets.push((i, i, sum + rng.random_range(0.5..1.5)));
    }

    CscMatrix::from_triplets(n, n, triplets)
}
