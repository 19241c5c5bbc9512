//! Output module for exporting resolution results
//!
//! This module handles:
//! - Writing results as CSV for spreadsheet import
//! - Summarizing a run for the operator

pub mod csv;
pub mod stats;

pub use self::csv::{format_status_chain, write_results, CSV_HEADERS};
pub use stats::{print_summary, ResultSummary};
