//! Keyed comparators over packed, fixed-width records.
//!
//! A [`KeyField`] is a comparator value: it stores the typed descriptor of one
//! record field (kind, byte offset, width) and compares that field between two
//! records. Chains of fields give mixed-column tie-breaks for generic sort
//! routines.

use std::cmp::Ordering;

/// The type a [`KeyField`] reads out of a record.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FieldKind {
    /// Little-endian unsigned 64-bit integer.
    U64,
    /// Little-endian `f64` bits, compared by total order; a canonical-NaN
    /// missing sentinel thereby orders after every real number and equal to
    /// itself.
    F64,
    /// Fixed-width byte string, compared lexicographically.
    Bytes,
}

/// A keyed comparator: one typed field of a packed record plus a direction.
#[derive(Copy, Clone, Debug)]
pub struct KeyField {
    pub kind: FieldKind,
    /// Byte offset of the field within a record.
    pub offset: usize,
    /// Field width in bytes; must be 8 for [`FieldKind::U64`] and [`FieldKind::F64`].
    pub width: usize,
    pub descending: bool,
}

impl KeyField {
    pub fn ascending(kind: FieldKind, offset: usize, width: usize) -> Self {
        debug_assert!(matches!(kind, FieldKind::Bytes) || width == 8);
        Self { kind, offset, width, descending: false }
    }

    pub fn descending(kind: FieldKind, offset: usize, width: usize) -> Self {
        Self { descending: true, ..Self::ascending(kind, offset, width) }
    }

    /// Compares the field of record `a` against the same field of record `b`.
    pub fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
        let fa = &a[self.offset..self.offset + self.width];
        let fb = &b[self.offset..self.offset + self.width];
        let ord = match self.kind {
            FieldKind::U64 => {
                u64::from_le_bytes(fa.try_into().unwrap()).cmp(&u64::from_le_bytes(fb.try_into().unwrap()))
            }
            FieldKind::F64 => {
                f64::from_le_bytes(fa.try_into().unwrap()).total_cmp(&f64::from_le_bytes(fb.try_into().unwrap()))
            }
            FieldKind::Bytes => fa.cmp(fb),
        };
        if self.descending { ord.reverse() } else { ord }
    }
}

/// Compares two records field by field, first difference wins.
pub fn compare_records(a: &[u8], b: &[u8], fields: &[KeyField]) -> Ordering {
    for f in fields {
        let ord = f.compare(a, b);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// Stable-sorts the records packed in `data` (each `rec_width` bytes) by the
/// given field chain and returns the sorted record indices.
pub fn sort_record_indices(data: &[u8], rec_width: usize, fields: &[KeyField]) -> Vec<u64> {
    debug_assert!(rec_width > 0 && data.len() % rec_width == 0);
    let n = data.len() / rec_width;
    let mut indices: Vec<u64> = (0..n as u64).collect();
    indices.sort_by(|&a, &b| {
        let ra = &data[a as usize * rec_width..(a as usize + 1) * rec_width];
        let rb = &data[b as usize * rec_width..(b as usize + 1) * rec_width];
        compare_records(ra, rb, fields)
    });
    indices
}
