//! One engine invocation: hash, sort, and group the selected rows, then serve
//! aggregates from the resulting layout.
//!
//! The stages run strictly in order (hash, fingerprint sort, panel setup);
//! every stage returns a `Result`, the first error unwinds the invocation,
//! and all scratch is released on every exit path. Nothing persists between
//! invocations.

use std::ops::Range;

use keysort::{sort_record_indices, sort_with_perm, try_filled, KeyField};

use crate::aggregate::{Aggregate, AggregateTable, GroupScratch};
use crate::column::{is_missing, Column, MISSING};
use crate::error::EngineError;
use crate::hash::{hash_rows, Fingerprint};
use crate::panel::panel_setup;
use crate::stats::GroupStatsCollector;

/// Configuration of one invocation.
#[derive(Clone, Debug)]
pub struct GroupConf {
    /// Whether the radix-sort digit histograms may run on the rayon pool,
    /// up to four workers. (default: `true`)
    pub use_multiple_threads: bool,
    /// Disables the integer-bijection fast path so grouping always goes
    /// through the 128-bit hash. (default: `false`)
    pub force_hash: bool,
}

impl Default for GroupConf {
    fn default() -> Self {
        Self { use_multiple_threads: true, force_hash: false }
    }
}

impl GroupConf {
    /// Returns configuration that keeps the whole invocation on one thread.
    pub fn st() -> Self {
        Self { use_multiple_threads: false, ..Default::default() }
    }

    /// Returns configuration that forces 128-bit hashing.
    pub fn forced_hash() -> Self {
        Self { force_hash: true, ..Default::default() }
    }
}

/// Row filter of an invocation (predicate mask and row range), evaluated once
/// before hashing. Filtered-out rows take no part in grouping or aggregation.
#[derive(Clone, Debug, Default)]
pub struct RowSelection<'a> {
    /// Keep row `i` only if `mask[i]`; length must equal the input length.
    pub mask: Option<&'a [bool]>,
    /// Keep only rows with index in the range (clamped to the input length).
    pub range: Option<Range<usize>>,
}

/// Groups the rows of `by` and returns the grouped layout.
///
/// Equivalent to [`group_with_stats`] with a no-op collector.
pub fn group(
    by: &[Column],
    selection: &RowSelection,
    conf: &GroupConf,
) -> Result<GroupIndex, EngineError> {
    group_with_stats(by, selection, conf, &mut ())
}

/// Groups the rows of `by`, reporting invocation events to `stats`.
///
/// Selected rows are fingerprinted ([`hash_rows`]), the fingerprints are
/// stable-sorted carrying a permutation, and group boundaries are read off
/// the sorted array with 64-bit collisions resolved by the 128-bit tiebreak.
/// The returned [`GroupIndex`] satisfies: every boundary pair brackets the
/// rows of exactly one by-tuple, and within a group the permutation preserves
/// original row order.
pub fn group_with_stats(
    by: &[Column],
    selection: &RowSelection,
    conf: &GroupConf,
    stats: &mut impl GroupStatsCollector,
) -> Result<GroupIndex, EngineError> {
    let input_len = validate_schema(by)?;
    let rows = select_rows(input_len, selection)?;
    if rows.is_empty() {
        return Err(EngineError::EmptyInput);
    }

    let fingerprint = hash_rows(by, &rows, conf.force_hash)?;
    stats.hashed(rows.len(), fingerprint.is_bijection());

    let mut perm: Vec<u64> = try_filled(rows.len())?;
    for (i, p) in perm.iter_mut().enumerate() {
        *p = i as u64;
    }

    let (info, collisions, bijected) = match fingerprint {
        Fingerprint::Biject { mut h1 } => {
            let algorithm = sort_with_perm(&mut h1, &mut perm, conf.use_multiple_threads)?;
            stats.sorted(algorithm);
            let (info, collisions) = panel_setup(&h1, None, &mut perm, conf.use_multiple_threads)?;
            (info, collisions, true)
        }
        Fingerprint::Hash { mut h1, h2 } => {
            let algorithm = sort_with_perm(&mut h1, &mut perm, conf.use_multiple_threads)?;
            stats.sorted(algorithm);
            // bring the tiebreaker halves into sorted order as well
            let mut h2_sorted: Vec<u64> = try_filled(rows.len())?;
            for (dst, &p) in h2_sorted.iter_mut().zip(perm.iter()) {
                *dst = h2[p as usize];
            }
            let (info, collisions) =
                panel_setup(&h1, Some(&mut h2_sorted), &mut perm, conf.use_multiple_threads)?;
            (info, collisions, false)
        }
    };
    stats.grouped(info.len() - 1, collisions);

    Ok(GroupIndex { input_len, rows, perm, info, bijected, collisions })
}

fn validate_schema(by: &[Column]) -> Result<usize, EngineError> {
    let Some(first) = by.first() else {
        return Err(EngineError::UnsupportedSchema("at least one by-column is required"));
    };
    if by.iter().any(|c| matches!(c, Column::Str { width: 0, .. })) {
        return Err(EngineError::UnsupportedSchema("zero-width string column"));
    }
    let n = first.len();
    if by.iter().any(|c| c.len() != n) {
        return Err(EngineError::UnsupportedSchema("by-columns differ in length"));
    }
    Ok(n)
}

fn select_rows(input_len: usize, selection: &RowSelection) -> Result<Vec<u64>, EngineError> {
    if let Some(mask) = selection.mask {
        if mask.len() != input_len {
            return Err(EngineError::UnsupportedSchema("mask length differs from input length"));
        }
    }
    let range = match &selection.range {
        Some(r) => r.start.min(input_len)..r.end.min(input_len),
        None => 0..input_len,
    };
    let mut rows: Vec<u64> = Vec::new();
    rows.try_reserve_exact(range.len())?;
    match selection.mask {
        Some(mask) => rows.extend(range.filter(|&i| mask[i]).map(|i| i as u64)),
        None => rows.extend(range.map(|i| i as u64)),
    }
    Ok(rows)
}

/// The grouped layout of one invocation.
///
/// Sorted positions `info[j]..info[j+1]` hold group `j`; `perm` maps a sorted
/// position to a selected-row position, and the selected rows map back to
/// original row indices. The stable fingerprint sort guarantees that within a
/// group the permutation preserves original row order.
#[derive(Debug)]
pub struct GroupIndex {
    input_len: usize,
    /// Selected original row indices, in input order.
    rows: Vec<u64>,
    /// Positions into `rows`, in fingerprint sort order.
    perm: Vec<u64>,
    /// Group boundaries; `info[0] = 0`, `info[J] = rows.len()`.
    info: Vec<u64>,
    bijected: bool,
    collisions: usize,
}

impl GroupIndex {
    /// Number of selected rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The group count J.
    pub fn group_count(&self) -> usize {
        self.info.len() - 1
    }

    /// Number of 64-bit hash collisions resolved via the 128-bit tiebreak.
    pub fn collisions(&self) -> usize {
        self.collisions
    }

    /// Whether the integer bijection produced the fingerprints.
    pub fn is_bijection(&self) -> bool {
        self.bijected
    }

    /// Group boundaries; length [`group_count`](Self::group_count)` + 1`.
    pub fn info(&self) -> &[u64] {
        &self.info
    }

    /// Sorted positions of group `j`.
    pub fn group_range(&self, j: usize) -> Range<usize> {
        self.info[j] as usize..self.info[j + 1] as usize
    }

    /// Original row index at sorted position `pos`.
    pub fn row_at(&self, pos: usize) -> usize {
        self.rows[self.perm[pos] as usize] as usize
    }

    /// Iterates group `j`'s original row indices in original row order.
    pub fn group_rows(&self, j: usize) -> impl Iterator<Item = usize> + '_ {
        self.group_range(j).map(move |pos| self.row_at(pos))
    }

    /// Reduces every value column over every group with every function.
    ///
    /// The output is one length-J column per `(value column, function)` pair,
    /// value-column-major. Value columns must have the input length; their
    /// filtered-out rows are ignored.
    pub fn aggregate(
        &self,
        values: &[&[f64]],
        funcs: &[Aggregate],
    ) -> Result<AggregateTable, EngineError> {
        for f in funcs {
            f.validate()?;
        }
        self.validate_values(values)?;

        let group_count = self.group_count();
        let mut columns: Vec<Vec<f64>> = Vec::new();
        columns.try_reserve_exact(values.len() * funcs.len())?;

        let mut scratch = GroupScratch::new(funcs);
        let largest_group =
            (0..group_count).map(|j| self.group_range(j).len()).max().unwrap_or(0);
        scratch.try_reserve(largest_group)?;

        for &column in values {
            let total_nonmiss =
                self.rows.iter().filter(|&&r| !is_missing(column[r as usize])).count() as f64;
            let mut outs: Vec<Vec<f64>> = Vec::with_capacity(funcs.len());
            for _ in funcs {
                let mut out = Vec::new();
                out.try_reserve_exact(group_count)?;
                outs.push(out);
            }
            for j in 0..group_count {
                scratch.load(column, self.group_rows(j));
                for (f, out) in funcs.iter().zip(outs.iter_mut()) {
                    out.push(scratch.reduce(*f, (j + 1) as f64, total_nonmiss));
                }
            }
            columns.append(&mut outs);
        }
        Ok(AggregateTable { group_count, columns })
    }

    /// Computes `func` over `values` per group and spreads the result back
    /// onto rows: the output has the input length, every selected row carries
    /// its group's value, and filtered-out rows carry missing (`Tag`: 0).
    pub fn broadcast(&self, values: &[f64], func: Aggregate) -> Result<Vec<f64>, EngineError> {
        func.validate()?;
        self.validate_values(&[values])?;
        match func {
            Aggregate::Tag => self.tags(),
            Aggregate::Group => self.labels(),
            f => {
                let table = self.aggregate(&[values], &[f])?;
                let reduced = &table.columns[0];
                let mut out = self.missing_filled()?;
                for j in 0..self.group_count() {
                    for row in self.group_rows(j) {
                        out[row] = reduced[j];
                    }
                }
                Ok(out)
            }
        }
    }

    /// Per-row tag: 1 for the first row of every group in original order,
    /// 0 elsewhere (filtered-out rows included).
    pub fn tags(&self) -> Result<Vec<f64>, EngineError> {
        let mut out: Vec<f64> = try_filled(self.input_len)?;
        for j in 0..self.group_count() {
            out[self.row_at(self.group_range(j).start)] = 1.0;
        }
        Ok(out)
    }

    /// Per-row dense group label `1..=J` in fingerprint sort order;
    /// filtered-out rows carry missing.
    pub fn labels(&self) -> Result<Vec<f64>, EngineError> {
        let mut out = self.missing_filled()?;
        for j in 0..self.group_count() {
            for row in self.group_rows(j) {
                out[row] = (j + 1) as f64;
            }
        }
        Ok(out)
    }

    /// The distinct-rows filter: each group's first original row index, one
    /// per group in fingerprint sort order.
    pub fn distinct(&self) -> Result<Vec<u64>, EngineError> {
        let mut out: Vec<u64> = Vec::new();
        out.try_reserve_exact(self.group_count())?;
        for j in 0..self.group_count() {
            out.push(self.row_at(self.group_range(j).start) as u64);
        }
        Ok(out)
    }

    /// Whether the by-tuple is a unique key of the selected rows (every group
    /// is a singleton).
    pub fn is_unique_key(&self) -> bool {
        self.group_count() == self.len()
    }

    /// Group indices ordered by the by-tuples themselves (ascending, column
    /// by column) rather than by hash order. `by` must be the columns the
    /// index was built from.
    pub fn ordered_levels(&self, by: &[Column]) -> Result<Vec<u64>, EngineError> {
        if by.is_empty() || by.iter().any(|c| c.len() != self.input_len) {
            return Err(EngineError::UnsupportedSchema("by-columns differ from the grouped input"));
        }
        let rec_width: usize = by.iter().map(|c| c.image_width()).sum();
        let mut fields = Vec::with_capacity(by.len());
        let mut offset = 0;
        for col in by {
            fields.push(KeyField::ascending(col.field_kind(), offset, col.image_width()));
            offset += col.image_width();
        }

        let mut data: Vec<u8> = Vec::new();
        data.try_reserve_exact(rec_width * self.group_count())?;
        data.resize(rec_width * self.group_count(), 0);
        for j in 0..self.group_count() {
            let representative = self.row_at(self.group_range(j).start);
            let record = &mut data[j * rec_width..(j + 1) * rec_width];
            let mut offset = 0;
            for col in by {
                let w = col.image_width();
                col.write_image(representative, &mut record[offset..offset + w]);
                offset += w;
            }
        }
        Ok(sort_record_indices(&data, rec_width, &fields))
    }

    fn validate_values(&self, values: &[&[f64]]) -> Result<(), EngineError> {
        if values.iter().any(|v| v.len() != self.input_len) {
            return Err(EngineError::UnsupportedSchema(
                "value column length differs from input length",
            ));
        }
        Ok(())
    }

    fn missing_filled(&self) -> Result<Vec<f64>, EngineError> {
        let mut out: Vec<f64> = Vec::new();
        out.try_reserve_exact(self.input_len)?;
        out.resize(self.input_len, MISSING);
        Ok(out)
    }
}
