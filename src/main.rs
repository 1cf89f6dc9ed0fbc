//! autotask - query Autotask PSA entities from the command line
//!
//! Prints matching records as one JSON object per line on stdout. Logs go
//! to stderr.
//!
//! # Configuration
//!
//! Set the following environment variables (or use a `.env` file):
//!
//! - `AUTOTASK_USERNAME`: API user name
//! - `AUTOTASK_SECRET`: API user secret
//! - `AUTOTASK_INTEGRATION_CODE`: API tracking identifier
//!
//! # Usage
//!
//! ```bash
//! # Walk open tickets page by page
//! ./autotask Tickets "Status!=5 AND (Priority=1 OR Priority=2)"
//!
//! # Count active companies
//! ./autotask Companies "IsActive=true" --count
//!
//! # Third page of 50 contacts
//! ./autotask Contacts --page 3 --page-size 50
//! ```

use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use autotask::client::AutotaskClient;
use autotask::config::Config;
use autotask::pagination::PaginationOptions;

/// Query Autotask PSA entities with a filter expression
#[derive(Parser, Debug)]
#[command(name = "autotask")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Entity to query (e.g. Tickets, Companies, Contacts)
    entity: String,

    /// Filter expression (e.g. "Status!=5 AND Priority=1")
    #[arg(default_value = "")]
    filter: String,

    /// Records per page
    #[arg(long, default_value = "100", value_parser = clap::value_parser!(u32).range(1..=500))]
    page_size: u32,

    /// Fetch only this page (walks cursors from the first page)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..), conflicts_with_all = ["all", "count"])]
    page: Option<u32>,

    /// Fetch every page before printing
    #[arg(long, conflicts_with = "count")]
    all: bool,

    /// Print the number of matching records only
    #[arg(long)]
    count: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (ignore errors if not found)
    dotenvy::dotenv().ok();

    // stdout carries results only
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("autotask=info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();

    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::debug!(config = ?config, "Configuration loaded");

    let client = AutotaskClient::new(&config).context("Failed to create Autotask client")?;
    let service = client.entity(cli.entity.as_str());

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if cli.count {
        let count = service
            .count(&cli.filter)
            .await
            .with_context(|| format!("Failed to count {}", cli.entity))?;
        writeln!(out, "{}", count)?;
        return Ok(());
    }

    if let Some(page_number) = cli.page {
        let options = PaginationOptions::new(cli.page_size, page_number);
        let page = service
            .fetch_page::<serde_json::Value>(&cli.filter, options)
            .await
            .with_context(|| format!("Failed to fetch page {} of {}", page_number, cli.entity))?;
        tracing::info!(
            page = page.page_details.page_number,
            items = page.items.len(),
            "Fetched page"
        );
        for item in &page.items {
            writeln!(out, "{}", item)?;
        }
        return Ok(());
    }

    if cli.all {
        let items: Vec<serde_json::Value> = service
            .fetch_all(&cli.filter, cli.page_size)
            .await
            .with_context(|| format!("Failed to fetch {}", cli.entity))?;
        tracing::info!(items = items.len(), "Fetched all pages");
        for item in &items {
            writeln!(out, "{}", item)?;
        }
        return Ok(());
    }

    let mut iterator = service
        .iter::<serde_json::Value>(&cli.filter, cli.page_size)
        .await
        .with_context(|| format!("Failed to query {}", cli.entity))?;

    let mut printed = 0usize;
    while iterator.advance().await {
        if let Some(item) = iterator.item() {
            writeln!(out, "{}", item)?;
            printed += 1;
        }
    }

    if let Some(e) = iterator.error() {
        anyhow::bail!(
            "Stopped after {} records on page {}: {}",
            printed,
            iterator.page_number(),
            e.sanitized_display(config.secret())
        );
    }

    tracing::info!(items = printed, pages = iterator.page_number(), "Done");
    Ok(())
}
