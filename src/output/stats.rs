//! Human-readable printing of run results

use crate::config::Category;
use crate::output::{CategoryResult, CategoryStats, ConnectionReport, RunReport};

/// Prints the counters of one category
pub fn print_category_result(id: &str, result: &CategoryResult) {
    let marker = if result.success { "✓" } else { "✗" };
    println!("{} {}: {}", marker, id, result.message);

    if let Some(stats) = &result.stats {
        print_stats(stats, "    ");
    }
    if let Some(error) = &result.error {
        println!("    Error: {}", error);
    }
}

fn print_stats(stats: &CategoryStats, indent: &str) {
    println!("{}Pages processed: {}", indent, stats.pages_processed);
    println!("{}New topics found: {}", indent, stats.new_topics_found);
    println!("{}Duplicates skipped: {}", indent, stats.duplicates_skipped);
    println!("{}New items stored: {}", indent, stats.new_items);
    println!("{}Total in file: {}", indent, stats.total_in_file);
}

/// Prints a multi-category report with totals
pub fn print_run_report(report: &RunReport) {
    println!("=== {} ===\n", report.message);

    for (id, result) in &report.categories {
        print_category_result(id, result);
    }
    println!();

    println!("Totals:");
    print_stats(&report.totals(), "  ");

    let failed = report.failed_categories();
    if !failed.is_empty() {
        println!("\nFailed categories ({}):", failed.len());
        for id in failed {
            println!("  - {}", id);
        }
    }
}

/// Prints the configured categories
pub fn print_categories(categories: &[Category]) {
    println!("Enabled categories ({}):", categories.len());
    for category in categories {
        println!(
            "  {:<16} {:<28} {} [{}]",
            category.id, category.name, category.base_url, category.title_search
        );
    }
}

pub fn print_connection_report(report: &ConnectionReport) {
    match (&report.title, &report.error) {
        (Some(title), _) if report.success => println!("✓ Connected: {}", title),
        (_, Some(error)) => println!("✗ Connection failed: {}", error),
        _ => println!("✗ Connection failed"),
    }
}
