//! CLI command implementations

pub mod init;
pub mod search;
pub mod sources;

use clap::ValueEnum;
use pricescout::config::Config;
use pricescout::scraping::{FetchEngine, SourceRegistry};
use std::sync::Arc;

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    JsonPretty,
}

/// Registry with the built-in sources over a real HTTP transport
pub fn build_registry(config: &Config) -> SourceRegistry {
    let engine = FetchEngine::new(config.scraping.fetch_config());
    SourceRegistry::new(config.scraping.clone(), Arc::new(engine))
}

/// Print `value` as compact or pretty JSON
pub fn print_json<T: serde::Serialize>(value: &T, format: OutputFormat) -> anyhow::Result<()> {
    let json = match format {
        OutputFormat::JsonPretty => serde_json::to_string_pretty(value)?,
        _ => serde_json::to_string(value)?,
    };
    println!("{}", json);
    Ok(())
}
