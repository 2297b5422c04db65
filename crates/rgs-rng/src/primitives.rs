//! Draw primitives built on [`RandomSource`]

use crate::{RandomSource, RngError, RngResult};

/// Draw an index with probability proportional to its weight.
///
/// Draws uniformly over the weight sum and returns the first index whose
/// cumulative weight exceeds the draw, so zero-weight buckets are never
/// selected. Fails on an empty slice or an all-zero slice.
pub fn weighted_random_index<R: RandomSource + ?Sized>(
    rng: &mut R,
    weights: &[u64],
) -> RngResult<usize> {
    let total = weights.iter().try_fold(0u64, |acc, &w| {
        acc.checked_add(w).ok_or(RngError::WeightOverflow)
    })?;
    if total == 0 {
        return Err(RngError::ZeroWeight);
    }

    let draw = rng.rand_from_range(total)?;
    let mut cumulative = 0u64;
    for (index, &weight) in weights.iter().enumerate() {
        cumulative += weight;
        if cumulative > draw {
            return Ok(index);
        }
    }

    // draw < total, so the loop always returns
    Err(RngError::ZeroWeight)
}

/// Unbiased shuffle: draws items without replacement until exhausted.
pub fn random_permutation<R: RandomSource + ?Sized, T: Clone>(
    rng: &mut R,
    items: &[T],
) -> RngResult<Vec<T>> {
    random_sample(rng, items, items.len())
}

/// Draw `count` items without replacement, in draw order.
///
/// `count` larger than the item count is clamped.
pub fn random_sample<R: RandomSource + ?Sized, T: Clone>(
    rng: &mut R,
    items: &[T],
    count: usize,
) -> RngResult<Vec<T>> {
    let mut remaining = items.to_vec();
    let count = count.min(remaining.len());
    let mut drawn = Vec::with_capacity(count);

    while drawn.len() < count {
        let index = rng.rand_from_range(remaining.len() as u64)? as usize;
        drawn.push(remaining.remove(index));
    }

    Ok(drawn)
}
