//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - reporting periods and their source key formats (`Period`)
//! - period labels carrying the forecast marker (`TaggedLabel`)
//! - canonical metric records and the report context (`MetricRecord`, `ReportContext`)

pub mod label;
pub mod period;
pub mod types;

pub use label::*;
pub use period::*;
pub use types::*;
