//! `board-reports` library crate.
//!
//! The binary (`reports`) is a thin wrapper around this library so that:
//!
//! - every pipeline stage is testable without spawning processes
//! - sources can be swapped for in-memory fakes behind the `data` traits
//! - code stays easy to navigate as the report set grows

pub mod aggregate;
pub mod app;
pub mod chart;
pub mod cli;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod normalize;
pub mod report;
