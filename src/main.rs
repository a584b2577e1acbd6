//! Forum-Harvest main entry point
//!
//! This is the command-line interface for the Forum-Harvest category crawler.

use anyhow::Context;
use clap::{Parser, Subcommand};
use forum_harvest::crawler::LogObserver;
use forum_harvest::output::{
    print_categories, print_category_result, print_connection_report, print_run_report,
};
use forum_harvest::{ProgressObserver, Scraper, Settings};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Exit code for a crawl that reported failure
const FAILURE_EXIT_CODE: u8 = 2;

/// Forum-Harvest: a category crawler for tracker listings
///
/// Forum-Harvest walks the listing pages of each configured category,
/// enriches every new topic from its detail page and keeps one
/// deduplicated JSON store per category.
#[derive(Parser, Debug)]
#[command(name = "forum-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A category crawler for tracker listings", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Maximum listing pages per category
    #[arg(long, global = true, env = "MAX_PAGES")]
    max_pages: Option<u32>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl every enabled category
    Run,

    /// Crawl a single category by id
    Category {
        /// Category id, as listed by `categories`
        id: String,
    },

    /// Re-crawl every category that already has a store file
    Refresh,

    /// List the enabled categories
    Categories,

    /// Fetch the site root and print its title
    TestConnection,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let settings = Settings::from_env().context("Invalid SCRAPER_* settings")?;
    tracing::info!(
        "Data dir: {}, config dir: {}",
        settings.data_dir.display(),
        settings.config_dir.display()
    );

    let mut scraper = Scraper::new(settings).context("Failed to build HTTP client")?;
    let observer = LogObserver;
    let observer: Option<&dyn ProgressObserver> = if cli.quiet { None } else { Some(&observer) };

    let succeeded = match cli.command {
        Command::Run => {
            let report = scraper.run_all(observer, cli.max_pages).await;
            print_run_report(&report);
            report.success && report.all_succeeded()
        }
        Command::Category { id } => {
            let result = scraper.run_category(&id, observer, cli.max_pages).await;
            print_category_result(&id, &result);
            result.success
        }
        Command::Refresh => {
            let report = scraper
                .refresh_existing(observer, cli.max_pages)
                .await
                .context("Failed to list category stores")?;
            print_run_report(&report);
            report.success && report.all_succeeded()
        }
        Command::Categories => {
            let categories = scraper.config_manager().load_categories();
            print_categories(&categories);
            true
        }
        Command::TestConnection => {
            let report = scraper.test_connection().await;
            print_connection_report(&report);
            report.success
        }
    };

    if succeeded {
        Ok(ExitCode::SUCCESS)
    } else {
        tracing::error!("Finished with failures");
        Ok(ExitCode::from(FAILURE_EXIT_CODE))
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("forum_harvest=info,warn"),
            1 => EnvFilter::new("forum_harvest=debug,info"),
            2 => EnvFilter::new("forum_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}
