//! Permutation vectors
//!
//! A permutation is stored as a vector `p` where `p[k]` is the original index
//! moved to position `k`. Its inverse `pinv` gives, for each original index,
//! its new position. Partial inverses mark missing entries with [`UNMAPPED`].

use crate::{Result, SparseCholeskyError};

/// Marker for an index that has no image under a (partial) permutation
pub const UNMAPPED: usize = usize::MAX;

/// True if `p` contains every index in `0..p.len()` exactly once
pub fn is_permutation(p: &[usize]) -> bool {
    let mut seen = vec![false; p.len()];
    for &i in p {
        if i >= p.len() || seen[i] {
            return false;
        }
        seen[i] = true;
    }
    true
}

/// Compute the inverse of a permutation
pub fn permutation_inverse(p: &[usize]) -> Vec<usize> {
    let mut pinv = vec![UNMAPPED; p.len()];
    permutation_inverse_into(p, &mut pinv);
    pinv
}

/// Compute the inverse of a permutation into an existing buffer
pub fn permutation_inverse_into(p: &[usize], pinv: &mut [usize]) {
    assert_eq!(p.len(), pinv.len(), "permutation length mismatch");
    for (k, &i) in p.iter().enumerate() {
        pinv[i] = k;
    }
}

/// Check that `p` is a valid permutation of length `n` and return its inverse
pub fn checked_inverse(p: &[usize], n: usize) -> Result<Vec<usize>> {
    if p.len() != n {
        return Err(SparseCholeskyError::InvalidPermutation(format!(
            "expected {} entries, got {}",
            n,
            p.len()
        )));
    }
    if !is_permutation(p) {
        return Err(SparseCholeskyError::InvalidPermutation(
            "indices are repeated or out of range".to_string(),
        ));
    }
    Ok(permutation_inverse(p))
}

/// Composition of two permutations: applying `first` then `second`.
///
/// `result[k] = first[second[k]]`, so permuting by the result is the same as
/// permuting by `first` and then permuting the outcome by `second`.
pub fn compose(first: &[usize], second: &[usize]) -> Vec<usize> {
    assert_eq!(first.len(), second.len(), "permutation length mismatch");
    second.iter().map(|&k| first[k]).collect()
}

/// `output[pinv[k]] = input[k]`: moves entries from the original ordering into the permuted one
pub fn permute_inv<T: Copy>(pinv: &[usize], input: &[T], output: &mut [T]) {
    assert!(
        input.len() >= pinv.len() && output.len() >= pinv.len(),
        "buffer too small for permutation"
    );
    for (k, &target) in pinv.iter().enumerate() {
        output[target] = input[k];
    }
}

/// `output[k] = input[pinv[k]]`: moves entries from the permuted ordering back to the original one
pub fn permute<T: Copy>(pinv: &[usize], input: &[T], output: &mut [T]) {
    assert!(
        input.len() >= pinv.len() && output.len() >= pinv.len(),
        "buffer too small for permutation"
    );
    for (k, &source) in pinv.iter().enumerate() {
        output[k] = input[source];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inverse() {
        let p = [2, 0, 3, 1];
        let pinv = permutation_inverse(&p);
        assert_eq!(pinv, vec![1, 3, 0, 2]);
        assert_eq!(permutation_inverse(&pinv), p.to_vec());
    }

    #[test]
    fn test_is_permutation() {
        assert!(is_permutation(&[1, 0, 2]));
        assert!(is_permutation(&[]));
        assert!(!is_permutation(&[0, 0, 2]));
        assert!(!is_permutation(&[0, 3, 1]));
    }

    #[test]
    fn test_checked_inverse() {
        assert!(checked_inverse(&[1, 0], 2).is_ok());
        assert!(matches!(
            checked_inverse(&[1, 0], 3),
            Err(SparseCholeskyError::InvalidPermutation(_))
        ));
        assert!(checked_inverse(&[1, 1], 2).is_err());
    }

    #[test]
    fn test_permute_round_trip() {
        let p = [2, 0, 3, 1];
        let pinv = permutation_inverse(&p);
        let b = [10.0, 11.0, 12.0, 13.0];

        let mut permuted = [0.0; 4];
        permute_inv(&pinv, &b, &mut permuted);
        // position k holds original entry p[k]
        for k in 0..4 {
            assert_eq!(permuted[k], b[p[k]]);
        }

        let mut restored = [0.0; 4];
        permute(&pinv, &permuted, &mut restored);
        assert_eq!(restored, b);
    }

    #[test]
    fn test_compose() {
        let first = [1, 2, 0];
        let second = [2, 0, 1];
        let both = compose(&first, &second);

        let b = [5, 6, 7];
        let once: Vec<i32> = first.iter().map(|&k| b[k]).collect();
        let twice: Vec<i32> = second.iter().map(|&k| once[k]).collect();
        let direct: Vec<i32> = both.iter().map(|&k| b[k]).collect();
        assert_eq!(twice, direct);
    }
}
