use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use linkstats::analytics::SortOrder;
use linkstats::config::{Config, OutputFormat};
use linkstats::pipeline;

#[derive(Parser)]
#[command(name = "linkstats")]
#[command(about = "Click analytics over a short link mapping table and a click event stream", long_about = None)]
struct Cli {
    /// CSV mapping table with columns long_url,domain,hash
    #[arg(long)]
    encodes: Option<PathBuf>,

    /// JSON array of click events
    #[arg(long)]
    decodes: Option<PathBuf>,

    /// Only count clicks from this year (0 disables the filter)
    #[arg(long)]
    year: Option<i32>,

    /// Direction of every ranked listing
    #[arg(long, value_enum)]
    sort: Option<SortArg>,

    /// Report output format
    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    /// Number of date buckets to print
    #[arg(long)]
    date_limit: Option<usize>,

    /// Number of unknown short links to print
    #[arg(long)]
    unknown_limit: Option<usize>,
}

#[derive(Clone, Copy, ValueEnum)]
enum SortArg {
    Asc,
    Desc,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Text,
    Json,
}

impl Cli {
    /// Command line flags win over environment configuration
    fn apply(self, config: &mut Config) {
        if let Some(path) = self.encodes {
            config.input.encodes_path = path;
        }
        if let Some(path) = self.decodes {
            config.input.decodes_path = path;
        }
        if let Some(year) = self.year {
            config.aggregation.filter_year = (year > 0).then_some(year);
        }
        if let Some(sort) = self.sort {
            config.aggregation.sort_order = match sort {
                SortArg::Asc => SortOrder::Ascending,
                SortArg::Desc => SortOrder::Descending,
            };
        }
        if let Some(format) = self.format {
            config.report.format = match format {
                FormatArg::Text => OutputFormat::Text,
                FormatArg::Json => OutputFormat::Json,
            };
        }
        if let Some(limit) = self.date_limit {
            config.report.date_limit = limit;
        }
        if let Some(limit) = self.unknown_limit {
            config.report.unknown_limit = limit;
        }
    }
}

fn main() -> Result<()> {
    // Logs go to stderr so the report on stdout stays machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    cli.apply(&mut config);
    info!("Loaded configuration");

    info!("Mapping table: {}", config.input.encodes_path.display());
    info!("Click events: {}", config.input.decodes_path.display());
    match config.aggregation.filter_year {
        Some(year) => info!("Counting clicks from {} only", year),
        None => info!("Counting clicks from every year"),
    }

    let analysis = pipeline::run(&config.input, &config.aggregation)
        .context("Click analysis aborted")?;
    info!(
        "Processed {} record(s) against {} mapping(s)",
        analysis.state.processed_records(),
        analysis.mapping_entries
    );

    let report = analysis.report(&config.report);
    match config.report.format {
        OutputFormat::Text => print!("{report}"),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    Ok(())
}
