//! Source clients.
//!
//! - Metabase dashboards and cards (`metabase`)
//! - Google Sheets named ranges and worksheets (`sheets`)
//! - the query traits the fetch stages depend on (`source`)

pub mod metabase;
pub mod sheets;
pub mod source;

pub use metabase::MetabaseClient;
pub use sheets::{SheetsClient, Spreadsheet};
pub use source::*;
