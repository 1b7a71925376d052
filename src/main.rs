//! pricescout: compare product prices across online stores

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use pricescout::config::{Config, LogFormat, LoggingConfig, DEFAULT_CONFIG_FILE};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use commands::OutputFormat;

#[derive(Parser)]
#[command(name = "pricescout")]
#[command(about = "Search several stores for a product and rank the offers by price")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search all (or selected) sources for a product
    Search {
        /// Product to search for
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,

        /// Source key to query (repeatable; default: all sources)
        #[arg(short = 's', long = "source")]
        sources: Vec<String>,

        /// Maximum listings per source
        #[arg(short = 'n', long)]
        max_items: Option<usize>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// List registered sources
    Sources {
        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Write a default configuration file
    Init {
        /// Target file or directory
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn init_logging(logging: &LoggingConfig, verbose: u8) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.filter_directive(verbose)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match logging.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    }
    .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Init { path, force } = &cli.command {
        init_logging(&LoggingConfig::default(), cli.verbose)?;
        return commands::init::init_config(path, *force);
    }

    let config = Config::load_or_default(&cli.config)?;
    init_logging(&config.logging, cli.verbose)?;

    match cli.command {
        Commands::Search {
            query,
            sources,
            max_items,
            format,
        } => commands::search::search(&config, query.join(" "), sources, max_items, format).await,
        Commands::Sources { format } => commands::sources::list_sources(&config, format),
        Commands::Init { .. } => Ok(()),
    }
}
