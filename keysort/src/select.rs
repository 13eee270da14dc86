//! Order-statistic kernels over `f64` values.

use std::cmp::Ordering;

#[inline(always)]
fn flt(a: f64, b: f64) -> bool {
    a.total_cmp(&b) == Ordering::Less
}

/// Hoare partition of `v[lo..hi)` around a median-of-three pivot.
///
/// Returns `j` with `lo <= j <= hi - 2` such that every element of
/// `v[lo..=j]` orders at or below every element of `v[j+1..hi)`; both sides
/// of the split are therefore non-empty and the caller always makes progress.
fn partition(v: &mut [f64], lo: usize, hi: usize) -> usize {
    // median of three, moved to the front; v[lo] then stops the first probe
    let mid = lo + (hi - lo) / 2;
    if flt(v[mid], v[lo]) { v.swap(mid, lo); }
    if flt(v[hi - 1], v[lo]) { v.swap(hi - 1, lo); }
    if flt(v[mid], v[hi - 1]) { v.swap(lo, mid); } else { v.swap(lo, hi - 1); }
    let pivot = v[lo];

    let mut i = lo;
    let mut j = hi - 1;
    loop {
        while flt(v[i], pivot) { i += 1; }
        while flt(pivot, v[j]) { j -= 1; }
        if i >= j {
            return j;
        }
        v.swap(i, j);
        i += 1;
        j -= 1;
    }
}

/// Partially orders `v` so that `v[k]` holds the `k`-th smallest value
/// (0-indexed, total order) and returns it.
///
/// Afterwards every element of `v[..k]` orders at or below `v[k]`, and every
/// element of `v[k+1..]` at or above it, so a follow-up scan of `v[..k]` yields
/// the preceding order statistic. Expected linear time; the quadratic worst
/// case is accepted since inputs are not adversarial.
///
/// `v` must be non-empty and `k < v.len()`; both are caller invariants.
pub fn quickselect(v: &mut [f64], k: usize) -> f64 {
    debug_assert!(k < v.len());
    let mut lo = 0;
    let mut hi = v.len();
    while hi - lo > 1 {
        let j = partition(v, lo, hi);
        if k <= j {
            hi = j + 1;
        } else {
            lo = j + 1;
        }
    }
    v[k]
}

/// Fully sorts `v` by the `f64` total order.
///
/// The fallback for order-statistic queries when a group is asked for enough
/// quantiles that one sort beats repeated selection.
#[inline]
pub fn sort_values(v: &mut [f64]) {
    v.sort_unstable_by(f64::total_cmp);
}
