#![doc = include_str!("../README.md")]

mod aggregate;
mod column;
mod engine;
mod error;
mod hash;
mod panel;
pub mod stats;

pub use aggregate::{Aggregate, AggregateTable};
pub use column::{is_missing, Column, MISSING};
pub use engine::{group, group_with_stats, GroupConf, GroupIndex, RowSelection};
pub use error::EngineError;
pub use hash::{hash_rows, Fingerprint};
