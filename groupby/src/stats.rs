//! Collecting and reporting events of an engine invocation.

use keysort::SortAlgorithm;
use std::io::Write;

/// Trait for collecting (and summarizing or reporting) events during one
/// engine invocation.
pub trait GroupStatsCollector {
    /// Called once after hashing with the number of selected rows and whether
    /// the integer bijection was used.
    #[inline(always)] fn hashed(&mut self, _rows: usize, _bijected: bool) {}

    /// Called once after the fingerprint sort with the algorithm that ran.
    #[inline(always)] fn sorted(&mut self, _algorithm: SortAlgorithm) {}

    /// Called once after panel setup with the group count and the number of
    /// 64-bit collisions resolved by the 128-bit tiebreak.
    #[inline(always)] fn grouped(&mut self, _groups: usize, _collisions: usize) {}
}

/// Ignores all events and does nothing.
impl GroupStatsCollector for () {}

/// Increases own value by the number of 64-bit collisions encountered.
impl GroupStatsCollector for usize {
    #[inline(always)] fn grouped(&mut self, _groups: usize, collisions: usize) { *self += collisions; }
}

/// Reports invocation events to the wrapped writer.
pub struct GroupStatsPrinter<W: Write = std::io::Stdout>(pub W);

impl GroupStatsPrinter<std::io::Stdout> {
    /// Reports invocation events to the standard output.
    pub fn stdout() -> Self {
        Self(std::io::stdout())
    }
}

impl<W: Write> GroupStatsCollector for GroupStatsPrinter<W> {
    fn hashed(&mut self, rows: usize, bijected: bool) {
        let mode = if bijected { "integer bijection" } else { "128-bit hash" };
        writeln!(self.0, "hashed {} rows ({})", rows, mode).unwrap();
    }

    fn sorted(&mut self, algorithm: SortAlgorithm) {
        writeln!(self.0, "sorted ({:?})", algorithm).unwrap();
    }

    fn grouped(&mut self, groups: usize, collisions: usize) {
        if collisions == 0 {
            writeln!(self.0, "{} groups", groups).unwrap();
        } else {
            writeln!(self.0, "{} groups, {} 64-bit collisions resolved", groups, collisions).unwrap();
        }
    }
}
