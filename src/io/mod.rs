//! Input/output helpers.
//!
//! - report directory layout (`layout`)
//! - YAML data / comments files persisted between stages (`data_file`)

pub mod data_file;
pub mod layout;

pub use data_file::*;
pub use layout::*;
