use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

mod config;
mod error;
mod loader;
mod metrics;
mod models;
mod query;
mod report;

use config::ReportConfig;
use error::ReportError;
use loader::DatasetCache;
use models::Dataset;

#[derive(Parser)]
#[command(name = "covid-country-report")]
#[command(about = "COVID-19 statistics report for a selected country", long_about = None)]
struct Cli {
    /// JSON file with report settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// CSV source, overrides the config file
    #[arg(long, global = true)]
    source: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Markdown,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// List the locations present in the source
    Locations,
    /// Print the key indicators for one location
    Summary {
        #[arg(long)]
        location: Option<String>,
        /// Text shown when the vaccination percentage is missing
        #[arg(long)]
        fallback: Option<String>,
    },
    /// Write the full report for one location
    Report {
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        fallback: Option<String>,
        #[arg(long, value_enum, default_value_t = Format::Markdown)]
        format: Format,
        /// Output file; stdout when omitted
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn pick_location(ds: &Dataset, requested: Option<String>, config: &ReportConfig) -> Option<String> {
    if requested.is_some() {
        return requested;
    }
    let locations = query::list_locations(ds);
    if locations.iter().any(|l| *l == config.default_location) {
        Some(config.default_location.clone())
    } else {
        locations.into_iter().next()
    }
}

/// Empty views are shown to the user instead of failing the run.
fn recoverable<T>(result: Result<T, ReportError>) -> anyhow::Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(ReportError::EmptyView { location }) => {
            println!("No data found for {location}.");
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}

fn main() -> anyhow::Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = ReportConfig::load(cli.config.as_deref())?;
    if let Some(source) = cli.source {
        config.source = source;
    }

    let cache = DatasetCache::new(&config.source);
    let ds = cache
        .get_or_load()
        .with_context(|| format!("failed to load {}", cache.path().display()))?;
    if ds.is_empty() {
        warn!(path = %config.source.display(), "source has no rows");
    }

    match cli.command {
        Commands::Locations => {
            for location in query::list_locations(&ds) {
                println!("{location}");
            }
        }
        Commands::Summary { location, fallback } => {
            if let Some(fallback) = fallback {
                config.percentage_fallback = fallback;
            }
            let Some(location) = pick_location(&ds, location, &config) else {
                println!("No locations in {}.", config.source.display());
                return Ok(());
            };
            let view = query::select_location(&ds, &location);
            let Some(metrics) = recoverable(metrics::indicators(&view, &config))? else {
                return Ok(());
            };

            println!("Key indicators for {location}:");
            for metric in metrics.iter() {
                println!("- {}: {}", metric.label, metric.display);
            }
        }
        Commands::Report {
            location,
            fallback,
            format,
            out,
        } => {
            if let Some(fallback) = fallback {
                config.percentage_fallback = fallback;
            }
            let Some(location) = pick_location(&ds, location, &config) else {
                println!("No locations in {}.", config.source.display());
                return Ok(());
            };
            let view = query::select_location(&ds, &location);
            let Some(built) = recoverable(report::build_report(&view, &config))? else {
                return Ok(());
            };

            let rendered = match format {
                Format::Markdown => report::render_markdown(&built),
                Format::Json => report::render_json(&built)?,
            };
            match out {
                Some(out) => {
                    std::fs::write(&out, rendered)
                        .with_context(|| format!("failed to write {}", out.display()))?;
                    info!(path = %out.display(), "report written");
                    println!("Report written to {}.", out.display());
                }
                None => print!("{rendered}"),
            }
        }
    }

    Ok(())
}
