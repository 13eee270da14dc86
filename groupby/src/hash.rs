//! Row fingerprinting: the integer-bijection fast path and 128-bit hashing.

use keysort::try_filled;
use xxhash_rust::xxh3::xxh3_128;

use crate::column::Column;
use crate::error::EngineError;

/// Row fingerprints produced by [`hash_rows`].
pub enum Fingerprint {
    /// Every by-column is an integer and the product of the per-column value
    /// ranges fits below 2<sup>63</sup>: `h1` maps by-tuples to integers
    /// injectively, so collisions are impossible by construction.
    Biject { h1: Vec<u64> },
    /// 128-bit hash split into two halves. Only `h1` drives sort order; `h2`
    /// is the collision tiebreaker.
    Hash { h1: Vec<u64>, h2: Vec<u64> },
}

impl Fingerprint {
    pub fn is_bijection(&self) -> bool {
        matches!(self, Fingerprint::Biject { .. })
    }
}

/// Maps each selected row's by-tuple to a fingerprint.
///
/// `rows` holds the selected original row indices in input order. When every
/// by-column is integer-typed and the product of the per-column ranges stays
/// below 2<sup>63</sup>, the bijection is used:
/// `h1[i] = Σ_k (x_k[i] - min_k) · Π_{l<k} range_l`. Otherwise each row's
/// canonical byte image is fed through `xxh3_128`.
///
/// Equal by-tuples always map to equal fingerprints; in bijection mode the
/// converse holds as well. `force_hash` disables the bijection (used by
/// equivalence tests and benchmarks).
pub fn hash_rows(by: &[Column], rows: &[u64], force_hash: bool) -> Result<Fingerprint, EngineError> {
    debug_assert!(!by.is_empty() && !rows.is_empty());
    if !force_hash {
        if let Some(h1) = try_biject(by, rows)? {
            return Ok(Fingerprint::Biject { h1 });
        }
    }
    hash_128(by, rows)
}

/// The bijection fast path; `None` when a column is not integer or the range
/// product leaves 64 bits.
fn try_biject(by: &[Column], rows: &[u64]) -> Result<Option<Vec<u64>>, EngineError> {
    // (values, min, place value); the running product stays < 2^63 so every
    // stride fits in u64
    let mut cols: Vec<(&[i64], i64, u64)> = Vec::with_capacity(by.len());
    let mut stride: u64 = 1;
    for col in by {
        let Column::Int(values) = *col else { return Ok(None) };
        let mut min = values[rows[0] as usize];
        let mut max = min;
        for &r in rows {
            let x = values[r as usize];
            if x < min {
                min = x;
            } else if x > max {
                max = x;
            }
        }
        cols.push((values, min, stride));
        let range = (max as i128 - min as i128) as u128 + 1;
        match (stride as u128).checked_mul(range) {
            Some(product) if product < (1 << 63) => stride = product as u64,
            _ => return Ok(None),
        }
    }

    let mut h1: Vec<u64> = try_filled(rows.len())?;
    for (h, &r) in h1.iter_mut().zip(rows.iter()) {
        let mut key = 0u64;
        for &(values, min, place) in &cols {
            key += (values[r as usize] as i128 - min as i128) as u64 * place;
        }
        *h = key;
    }
    Ok(Some(h1))
}

fn hash_128(by: &[Column], rows: &[u64]) -> Result<Fingerprint, EngineError> {
    let width: usize = by.iter().map(|c| c.image_width()).sum();
    let mut image: Vec<u8> = try_filled(width)?;
    let mut h1: Vec<u64> = try_filled(rows.len())?;
    let mut h2: Vec<u64> = try_filled(rows.len())?;

    for (i, &r) in rows.iter().enumerate() {
        let mut offset = 0;
        for col in by {
            let w = col.image_width();
            col.write_image(r as usize, &mut image[offset..offset + w]);
            offset += w;
        }
        let h = xxh3_128(&image);
        h1[i] = h as u64;
        h2[i] = (h >> 64) as u64;
    }
    Ok(Fingerprint::Hash { h1, h2 })
}
