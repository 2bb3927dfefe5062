//! Belfiore CLI - lookups over Belfiore city and country codes.
//!
//! Loads the places dataset from a JSON file or URL (see `ConnectorConfig`),
//! narrows it with the view flags and prints the result as JSON.

mod args;

use std::io;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use serde_json::Value;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use belfiore_core::utils::{parse_date, today};
use belfiore_core::{BelfioreConnector, ConnectorConfig};

use args::{Cli, Commands};

/// Initialize the tracing subscriber for logging
fn init_tracing(debug: bool) {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = if debug {
        EnvFilter::new("belfiore_core=debug,belfiore=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn parse_date_arg(flag: &str, value: &str) -> Result<NaiveDate> {
    if value.eq_ignore_ascii_case("today") {
        return Ok(today());
    }
    parse_date(value).with_context(|| format!("Invalid date for --{}: {}", flag, value))
}

/// Merge CLI overrides into the loaded configuration.
fn resolve_config(cli: &Cli) -> Result<ConnectorConfig> {
    let mut config = ConnectorConfig::load()?;
    if let Some(ref path) = cli.file {
        config.source_path = Some(path.clone());
        config.source_url = None;
    }
    if let Some(ref url) = cli.url {
        config.source_url = Some(url.clone());
        config.source_path = None;
    }
    if let Some(ttl) = cli.ttl {
        config.lifetime_sec = Some(ttl);
    }
    Ok(config)
}

/// Apply the view flags to the root connector.
fn select_view(cli: &Cli, root: BelfioreConnector) -> Result<BelfioreConnector> {
    let mut view = root;

    if cli.cities {
        view = view.cities().context("Cities are not available in this view")?;
    }
    if cli.countries {
        view = view
            .countries()
            .context("Countries are not available in this view")?;
    }
    if let Some(ref province) = cli.province {
        view = view
            .by_province(province)
            .with_context(|| format!("Invalid province code: {} (expected e.g. RM)", province))?;
    }
    if let Some(ref date) = cli.active {
        view = view.active(parse_date_arg("active", date)?);
    }
    if let Some(ref date) = cli.from {
        view = view.from(parse_date_arg("from", date)?);
    }

    debug!(criteria = ?view.criteria(), "Selected view");
    Ok(view)
}

async fn run(cli: &Cli, view: &BelfioreConnector) -> Result<Value> {
    let output = match cli.command {
        Commands::List => serde_json::to_value(view.to_vec().await?)?,
        Commands::Provinces => serde_json::to_value(view.provinces().await?)?,
        Commands::Search { ref text } => serde_json::to_value(view.search_by_name(text).await?)?,
        Commands::FindName { ref name } => serde_json::to_value(view.find_by_name(name).await?)?,
        Commands::FindCode { ref code } => serde_json::to_value(view.find_by_code(code).await?)?,
    };
    Ok(output)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.debug);
    info!("Belfiore CLI starting");

    let config = resolve_config(&cli)?;
    let root = config.connector()?;
    let view = select_view(&cli, root)?;

    let output = run(&cli, &view).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
