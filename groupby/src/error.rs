//! The error surface of an engine invocation.

use std::collections::TryReserveError;
use thiserror::Error;

/// Errors surfaced by the engine. Each invocation stage returns a `Result`
/// and the first error short-circuits the invocation; no partial output is
/// exposed and all scratch is released on the way out.
#[derive(Error, Debug)]
pub enum EngineError {
    /// A scratch allocation was refused.
    #[error("out of memory: {0}")]
    OutOfMemory(#[from] TryReserveError),

    /// Unsupported input layout: zero by-columns, mismatched column lengths,
    /// or a zero-width string column.
    #[error("unsupported schema: {0}")]
    UnsupportedSchema(&'static str),

    /// The invocation selected no rows.
    #[error("no rows selected")]
    EmptyInput,

    /// A caller-side invariant did not hold (for example a percentile outside
    /// `(0, 100]`). Indicates a bug upstream of the engine.
    #[error("invariant violation: {0}")]
    Invariant(&'static str),
}

impl EngineError {
    /// The small-integer error domain shared with hosts; success (`0`) is the
    /// `Ok` side of the `Result`.
    pub fn code(&self) -> i32 {
        match self {
            EngineError::OutOfMemory(_) => 1,
            EngineError::UnsupportedSchema(_) => 2,
            EngineError::EmptyInput => 3,
            EngineError::Invariant(_) => 4,
        }
    }
}
