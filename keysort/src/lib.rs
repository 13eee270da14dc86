#![doc = include_str!("../README.md")]

mod cmp;
mod counting;
mod radix;
mod select;

pub use cmp::{compare_records, sort_record_indices, FieldKind, KeyField};
pub use counting::counting_sort;
pub use radix::radix_sort;
pub use select::{quickselect, sort_values};

use std::collections::TryReserveError;

/// Smallest key range rejected by counting sort; ranges this wide (or wider) go to radix sort.
pub const COUNTING_SORT_MAX_RANGE: u64 = 1 << 24;

/// The algorithm chosen by [`sort_with_perm`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SortAlgorithm {
    /// Fewer than two elements or all keys equal; nothing to do.
    Trivial,
    Counting,
    Radix,
}

/// Allocates a `len`-element vector filled with `T::default()`,
/// surfacing allocation failure instead of aborting.
pub fn try_filled<T: Clone + Default>(len: usize) -> Result<Vec<T>, TryReserveError> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)?;
    v.resize(len, T::default());
    Ok(v)
}

/// Returns `(min, max)` over `keys`. `keys` must be non-empty.
#[inline]
pub fn min_max(keys: &[u64]) -> (u64, u64) {
    let mut min = keys[0];
    let mut max = keys[0];
    for &k in &keys[1..] {
        if k < min { min = k; }
        if k > max { max = k; }
    }
    (min, max)
}

/// Stable-sorts `keys` into non-decreasing order, permuting `perm` in lockstep,
/// and returns which algorithm ran.
///
/// Whenever two keys are equal, the corresponding `perm` entries keep their
/// relative order. The caller's arrays are only mutated after all scratch
/// allocations have succeeded, so an `Err` leaves them untouched.
///
/// Counting sort is used when `max - min + 1 < 2`<sup>`24`</sup>
/// ([`COUNTING_SORT_MAX_RANGE`]); otherwise a 4-pass LSD radix sort runs,
/// whose per-pass histograms may be counted by up to four parallel workers
/// when `use_multiple_threads` is true.
pub fn sort_with_perm(
    keys: &mut [u64],
    perm: &mut [u64],
    use_multiple_threads: bool,
) -> Result<SortAlgorithm, TryReserveError> {
    debug_assert_eq!(keys.len(), perm.len());
    if keys.len() < 2 {
        return Ok(SortAlgorithm::Trivial);
    }
    let (min, max) = min_max(keys);
    if min == max {
        return Ok(SortAlgorithm::Trivial);
    }
    match (max - min).checked_add(1) {
        Some(range) if range < COUNTING_SORT_MAX_RANGE => {
            counting_sort(keys, perm, min, max)?;
            Ok(SortAlgorithm::Counting)
        }
        _ => {
            radix_sort(keys, perm, use_multiple_threads)?;
            Ok(SortAlgorithm::Radix)
        }
    }
}
