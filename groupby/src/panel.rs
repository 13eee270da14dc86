//! Group-boundary construction from sorted fingerprints.

use keysort::{sort_with_perm, try_filled};

use crate::error::EngineError;

/// Walks the sorted `h1` and emits the group boundary array `info`
/// (`info[j]..info[j+1]` brackets group `j`; `info[0] = 0`,
/// `info[J] = h1.len()`). Returns `(info, collisions)`.
///
/// With `h2` present, every provisional range sharing an `h1` value is checked
/// for a constant `h2`; a non-constant range is a 64-bit collision between
/// distinct by-tuples. The range's `h2` values are then sorted (stably,
/// carrying the range of the global permutation along), and the range is
/// re-split by `h2`. In bijection mode (`h2` absent) collisions are
/// impossible and the walk alone is exact.
pub(crate) fn panel_setup(
    h1: &[u64],
    mut h2: Option<&mut [u64]>,
    perm: &mut [u64],
    use_multiple_threads: bool,
) -> Result<(Vec<u64>, usize), EngineError> {
    let n = h1.len();
    let mut info: Vec<u64> = Vec::new();
    info.try_reserve_exact(n + 1)?; // J + 1 <= n + 1, so pushes never reallocate
    let mut collisions = 0;

    info.push(0);
    let mut start = 0;
    for i in 1..=n {
        if i < n && h1[i] == h1[i - 1] {
            continue;
        }
        // provisional range [start, i) shares one h1 value
        if let Some(h2) = h2.as_deref_mut() {
            let range = &mut h2[start..i];
            if !range.iter().all(|&h| h == range[0]) {
                collisions += 1;
                resolve_collision(range, &mut perm[start..i], use_multiple_threads)?;
                for j in start + 1..i {
                    if h2[j] != h2[j - 1] {
                        info.push(j as u64);
                    }
                }
            }
        }
        info.push(i as u64);
        start = i;
    }
    Ok((info, collisions))
}

/// Sorts a colliding range by `h2` and applies the same reordering to the
/// global permutation slice, preserving input order among equal `h2`.
fn resolve_collision(
    h2: &mut [u64],
    perm: &mut [u64],
    use_multiple_threads: bool,
) -> Result<(), EngineError> {
    let m = h2.len();
    let mut local: Vec<u64> = try_filled(m)?;
    for (i, l) in local.iter_mut().enumerate() {
        *l = i as u64;
    }
    sort_with_perm(h2, &mut local, use_multiple_threads)?;

    let mut reordered: Vec<u64> = try_filled(m)?;
    for (dst, &src) in reordered.iter_mut().zip(local.iter()) {
        *dst = perm[src as usize];
    }
    perm.copy_from_slice(&reordered);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(n: usize) -> Vec<u64> {
        (0..n as u64).collect()
    }

    #[test]
    fn boundaries_without_tiebreaker() {
        let h1 = [1u64, 1, 4, 4, 4, 9];
        let mut perm = identity(6);
        let (info, collisions) = panel_setup(&h1, None, &mut perm, false).unwrap();
        assert_eq!(info, vec![0, 2, 5, 6]);
        assert_eq!(collisions, 0);
        assert_eq!(perm, identity(6));
    }

    #[test]
    fn single_group() {
        let h1 = [3u64; 4];
        let mut h2 = [7u64; 4];
        let mut perm = identity(4);
        let (info, collisions) = panel_setup(&h1, Some(&mut h2), &mut perm, false).unwrap();
        assert_eq!(info, vec![0, 4]);
        assert_eq!(collisions, 0);
    }

    #[test]
    fn collision_splits_by_h2() {
        // two distinct tuples share h1 = 5; h2 tells them apart
        let h1 = [5u64, 5, 5, 5, 8];
        let mut h2 = [20u64, 10, 20, 10, 0];
        let mut perm = identity(5);
        let (info, collisions) = panel_setup(&h1, Some(&mut h2), &mut perm, false).unwrap();
        assert_eq!(collisions, 1);
        assert_eq!(info, vec![0, 2, 4, 5]);
        // rows of the h2=10 tuple come first, keeping input order within each
        assert_eq!(perm, vec![1, 3, 0, 2, 4]);
        assert_eq!(h2, [10, 10, 20, 20, 0]);
    }

    #[test]
    fn collision_into_three_tuples() {
        let h1 = [5u64; 6];
        let mut h2 = [3u64, 1, 2, 1, 3, 2];
        let mut perm = identity(6);
        let (info, collisions) = panel_setup(&h1, Some(&mut h2), &mut perm, false).unwrap();
        assert_eq!(collisions, 1);
        assert_eq!(info, vec![0, 2, 4, 6]);
        assert_eq!(perm, vec![1, 3, 2, 5, 0, 4]);
    }

    #[test]
    fn empty_input_yields_zero_groups() {
        let (info, collisions) = panel_setup(&[], None, &mut [], false).unwrap();
        assert_eq!(info, vec![0]);
        assert_eq!(collisions, 0);
    }
}
