//! Per-group reductions over value columns.

use std::collections::TryReserveError;

use keysort::{quickselect, sort_values};

use crate::column::{is_missing, MISSING};
use crate::error::EngineError;

/// A summary function, dispatched by tag; percentiles carry their parameter
/// inline. "Non-missing" below means values that are not NaN
/// (see [`MISSING`]).
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Aggregate {
    /// Sum of the non-missing values; all-missing group yields missing.
    Sum,
    /// Sum divided by the non-missing count; all-missing group yields missing.
    Mean,
    /// Sample standard deviation (denominator `n - 1`); fewer than two
    /// non-missing values yield missing.
    Sd,
    Min,
    Max,
    /// Number of non-missing values.
    Count,
    /// `100 · count_group / count_total`, both counts of non-missing values.
    Percent,
    /// Alias of `Pctile(50.0)`.
    Median,
    /// 75th minus 25th percentile.
    Iqr,
    /// The `p`-th percentile, `0 < p <= 100`.
    Pctile(f64),
    /// First value by original row order (missing included).
    First,
    /// Last value by original row order (missing included).
    Last,
    /// First non-missing value by original row order.
    FirstNm,
    /// Last non-missing value by original row order.
    LastNm,
    /// Per-row: 1 for the first row of its group in original order, else 0.
    Tag,
    /// Per-row: the dense `1..=J` group label in fingerprint sort order.
    Group,
}

impl Aggregate {
    /// Collapses aliases: `Median` is `Pctile(50.0)`.
    pub(crate) fn normalized(self) -> Self {
        match self {
            Aggregate::Median => Aggregate::Pctile(50.0),
            other => other,
        }
    }

    /// Checks caller-side invariants before any work runs.
    pub(crate) fn validate(&self) -> Result<(), EngineError> {
        if let Aggregate::Pctile(p) = self {
            if !(p.is_finite() && *p > 0.0 && *p <= 100.0) {
                return Err(EngineError::Invariant("percentile outside (0, 100]"));
            }
        }
        Ok(())
    }

    /// Number of order-statistic queries this function issues per group.
    fn quantile_queries(&self) -> usize {
        match self.normalized() {
            Aggregate::Pctile(_) => 1,
            Aggregate::Iqr => 2,
            _ => 0,
        }
    }
}

/// The reduced output of [`GroupIndex::aggregate`](crate::GroupIndex::aggregate):
/// entry `j` of every column describes group `j` (fingerprint sort order).
#[derive(Debug)]
pub struct AggregateTable {
    /// The group count J.
    pub group_count: usize,
    /// One length-J column per `(value column, function)` pair,
    /// value-column-major: `columns[v * funcs.len() + f]` is `funcs[f]` over
    /// value column `v`.
    pub columns: Vec<Vec<f64>>,
}

/// Per-group scratch reused across groups: the group's values in original row
/// order plus the non-missing subset for order-statistic queries.
///
/// When the requested functions issue more than one order-statistic query per
/// group, the non-missing subset is sorted once on load and every quantile
/// becomes an index; with a single query quickselect wins.
pub(crate) struct GroupScratch {
    all: Vec<f64>,
    nonmiss: Vec<f64>,
    sorted: bool,
    sort_on_load: bool,
}

impl GroupScratch {
    pub(crate) fn new(funcs: &[Aggregate]) -> Self {
        let queries: usize = funcs.iter().map(|f| f.quantile_queries()).sum();
        Self { all: Vec::new(), nonmiss: Vec::new(), sorted: false, sort_on_load: queries > 1 }
    }

    /// Reserves room for the largest group so that loads never reallocate.
    pub(crate) fn try_reserve(&mut self, capacity: usize) -> Result<(), TryReserveError> {
        self.all.try_reserve_exact(capacity)?;
        self.nonmiss.try_reserve_exact(capacity)
    }

    /// Loads one group; `group_rows` yields the group's original row indices
    /// in original row order.
    pub(crate) fn load(&mut self, values: &[f64], group_rows: impl Iterator<Item = usize>) {
        self.all.clear();
        self.nonmiss.clear();
        for row in group_rows {
            let v = values[row];
            self.all.push(v);
            if !is_missing(v) {
                self.nonmiss.push(v);
            }
        }
        self.sorted = self.sort_on_load;
        if self.sort_on_load {
            sort_values(&mut self.nonmiss);
        }
    }

    /// Applies `func` to the loaded group. `group_label` is the group's dense
    /// `1..=J` label; `total_nonmiss` is the non-missing count over all
    /// selected rows of the current value column (used by `Percent`).
    pub(crate) fn reduce(&mut self, func: Aggregate, group_label: f64, total_nonmiss: f64) -> f64 {
        let n = self.nonmiss.len();
        match func.normalized() {
            Aggregate::Sum => if n == 0 { MISSING } else { self.nonmiss.iter().sum() },
            Aggregate::Mean => if n == 0 { MISSING } else { self.nonmiss.iter().sum::<f64>() / n as f64 },
            Aggregate::Sd => self.sd(),
            Aggregate::Min => self.nonmiss.iter().copied().reduce(f64::min).unwrap_or(MISSING),
            Aggregate::Max => self.nonmiss.iter().copied().reduce(f64::max).unwrap_or(MISSING),
            Aggregate::Count => n as f64,
            Aggregate::Percent => 100.0 * n as f64 / total_nonmiss,
            Aggregate::Median => self.pctile(50.0),
            Aggregate::Pctile(p) => self.pctile(p),
            Aggregate::Iqr => self.pctile(75.0) - self.pctile(25.0),
            Aggregate::First => self.all.first().copied().unwrap_or(MISSING),
            Aggregate::Last => self.all.last().copied().unwrap_or(MISSING),
            Aggregate::FirstNm => self.all.iter().copied().find(|v| !is_missing(*v)).unwrap_or(MISSING),
            Aggregate::LastNm => self.all.iter().rev().copied().find(|v| !is_missing(*v)).unwrap_or(MISSING),
            Aggregate::Tag => 1.0,
            Aggregate::Group => group_label,
        }
    }

    fn sd(&self) -> f64 {
        let n = self.nonmiss.len();
        if n < 2 {
            return MISSING;
        }
        let mut sum = 0.0;
        let mut sumsq = 0.0;
        for &v in &self.nonmiss {
            sum += v;
            sumsq += v * v;
        }
        let nf = n as f64;
        // round-off can push the numerator slightly below zero
        let variance = ((sumsq - sum * sum / nf) / (nf - 1.0)).max(0.0);
        variance.sqrt()
    }

    /// The `p`-th percentile of the non-missing values.
    ///
    /// With `r = p·n/100` and `qth = ⌊r⌋`: the result is the `qth`-th value
    /// of the sorted order (0-indexed), averaged with its predecessor when
    /// `r` is integral; `qth = 0` yields the minimum and `qth >= n` the
    /// maximum. Groups of one or two non-missing values short-circuit.
    fn pctile(&mut self, p: f64) -> f64 {
        let n = self.nonmiss.len();
        if n == 0 {
            return MISSING;
        }
        if n == 1 {
            return self.nonmiss[0];
        }
        if n == 2 {
            let a = self.nonmiss[0];
            let b = self.nonmiss[1];
            let (lo, hi) = (a.min(b), a.max(b));
            return if p < 50.0 { lo } else if p > 50.0 { hi } else { (lo + hi) / 2.0 };
        }
        let r = p * n as f64 / 100.0;
        let qth = r.floor() as usize;
        if qth == 0 {
            return self.order_stat(0);
        }
        if qth >= n {
            return self.order_stat(n - 1);
        }
        let at = self.order_stat(qth);
        if r == qth as f64 {
            (self.order_stat(qth - 1) + at) / 2.0
        } else {
            at
        }
    }

    /// The `k`-th smallest non-missing value, 0-indexed.
    fn order_stat(&mut self, k: usize) -> f64 {
        if self.sorted {
            self.nonmiss[k]
        } else {
            quickselect(&mut self.nonmiss, k)
        }
    }
}
