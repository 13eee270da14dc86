//! LSD radix sort over `u64` keys, 16 bits per pass, with a carried permutation.

use std::collections::TryReserveError;

use crate::try_filled;

const RADIX_BITS: usize = 16;
const RADIX_BUCKETS: usize = 1 << RADIX_BITS;
const RADIX_PASSES: usize = 4;

#[inline(always)]
fn digit(key: u64, pass: usize) -> usize {
    ((key >> (RADIX_BITS * pass)) & (RADIX_BUCKETS - 1) as u64) as usize
}

fn histogram(keys: &[u64], pass: usize) -> Result<Vec<usize>, TryReserveError> {
    let mut h: Vec<usize> = try_filled(RADIX_BUCKETS)?;
    for &k in keys {
        h[digit(k, pass)] += 1;
    }
    Ok(h)
}

/// Counts the digit histogram of every pass before any scatter runs.
///
/// Digit histograms do not depend on element order, so all four can be taken
/// from the unsorted input. With `use_multiple_threads` the four counts run as
/// four rayon workers over disjoint outputs; the join happens here, before the
/// first scatter reads them.
fn histograms(keys: &[u64], use_multiple_threads: bool) -> Result<[Vec<usize>; RADIX_PASSES], TryReserveError> {
    if use_multiple_threads && rayon::current_num_threads() > 1 {
        let ((h0, h1), (h2, h3)) = rayon::join(
            || rayon::join(|| histogram(keys, 0), || histogram(keys, 1)),
            || rayon::join(|| histogram(keys, 2), || histogram(keys, 3)),
        );
        Ok([h0?, h1?, h2?, h3?])
    } else {
        let mut hs = [
            try_filled(RADIX_BUCKETS)?,
            try_filled(RADIX_BUCKETS)?,
            try_filled(RADIX_BUCKETS)?,
            try_filled(RADIX_BUCKETS)?,
        ];
        for &k in keys {
            for (pass, h) in hs.iter_mut().enumerate() {
                h[digit(k, pass)] += 1;
            }
        }
        Ok(hs)
    }
}

/// One stable scatter pass: bucket cursors advance post-placement.
fn scatter(
    src_keys: &[u64],
    src_perm: &[u64],
    dst_keys: &mut [u64],
    dst_perm: &mut [u64],
    cursors: &mut [usize],
    pass: usize,
) {
    for (k, p) in src_keys.iter().zip(src_perm.iter()) {
        let bucket = digit(*k, pass);
        let pos = cursors[bucket];
        cursors[bucket] += 1;
        dst_keys[pos] = *k;
        dst_perm[pos] = *p;
    }
}

/// Stable LSD radix sort of `keys`, permuting `perm` in lockstep.
///
/// Runs up to four passes of 16 bits each, lowest bits first. A pass whose
/// keys all share one digit would only copy the arrays, so it is skipped.
/// Scatter passes ping-pong between the caller's arrays and one pair of
/// scratch buffers; if the last performed pass lands in scratch, the result
/// is copied back.
///
/// The caller's arrays are only mutated after every allocation has succeeded.
pub fn radix_sort(
    keys: &mut [u64],
    perm: &mut [u64],
    use_multiple_threads: bool,
) -> Result<(), TryReserveError> {
    let n = keys.len();
    debug_assert_eq!(n, perm.len());

    let mut hist = histograms(keys, use_multiple_threads)?;
    let mut keys_scratch: Vec<u64> = try_filled(n)?;
    let mut perm_scratch: Vec<u64> = try_filled(n)?;

    let mut src_is_input = true;
    for (pass, cursors) in hist.iter_mut().enumerate() {
        if cursors.iter().any(|&c| c == n) {
            continue; // degenerate pass
        }
        let mut sum = 0;
        for c in cursors.iter_mut() {
            let occupied = *c;
            *c = sum;
            sum += occupied;
        }
        if src_is_input {
            scatter(keys, perm, &mut keys_scratch, &mut perm_scratch, cursors, pass);
        } else {
            scatter(&keys_scratch, &perm_scratch, keys, perm, cursors, pass);
        }
        src_is_input = !src_is_input;
    }
    if !src_is_input {
        keys.copy_from_slice(&keys_scratch);
        perm.copy_from_slice(&perm_scratch);
    }
    Ok(())
}
