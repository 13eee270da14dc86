//! Stable counting sort with a carried permutation.

use std::collections::TryReserveError;

use crate::try_filled;

/// Stable counting sort of `keys` (all in `[min, max]`), permuting `perm` in lockstep.
///
/// Histograms `keys - min` into a `max - min + 1`-element count array,
/// prefix-sums the counts into bucket cursors, then scatters keys and
/// permutation entries into scratch buffers. The scatter reads the input left
/// to right and post-increments each bucket cursor, which is what makes the
/// sort stable.
///
/// The caller is responsible for keeping `max - min` small
/// (see [`COUNTING_SORT_MAX_RANGE`](crate::COUNTING_SORT_MAX_RANGE)).
pub fn counting_sort(
    keys: &mut [u64],
    perm: &mut [u64],
    min: u64,
    max: u64,
) -> Result<(), TryReserveError> {
    let n = keys.len();
    debug_assert_eq!(n, perm.len());
    debug_assert!(min <= max);
    debug_assert!(keys.iter().all(|&k| min <= k && k <= max));

    let mut count: Vec<usize> = try_filled((max - min + 1) as usize)?;
    let mut keys_out: Vec<u64> = try_filled(n)?;
    let mut perm_out: Vec<u64> = try_filled(n)?;

    for &k in keys.iter() {
        count[(k - min) as usize] += 1;
    }
    let mut sum = 0;
    for c in count.iter_mut() {
        let occupied = *c;
        *c = sum;
        sum += occupied;
    }
    for i in 0..n {
        let bucket = (keys[i] - min) as usize;
        let pos = count[bucket];
        count[bucket] += 1;
        keys_out[pos] = keys[i];
        perm_out[pos] = perm[i];
    }

    keys.copy_from_slice(&keys_out);
    perm.copy_from_slice(&perm_out);
    Ok(())
}
