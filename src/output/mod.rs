//! Output module for crawl results and reports
//!
//! This module handles:
//! - Exporting keyword result sets as JSON
//! - Rendering the task table shown by the CLI
//! - Printing sink statistics

mod json;
pub mod stats;

pub use json::{read_results_json, write_results_json, ResultSets};
pub use stats::{format_task_table, print_statistics, print_task_table};
