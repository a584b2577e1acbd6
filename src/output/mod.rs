//! Output module for run results
//!
//! This module handles:
//! - The result types returned by the scraper entry points
//! - Printing those results for the command line

mod report;
pub mod stats;

pub use report::{CategoryResult, CategoryStats, ConnectionReport, RunReport};
pub use stats::{
    print_categories, print_category_result, print_connection_report, print_run_report,
};
