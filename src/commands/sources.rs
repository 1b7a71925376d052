use anyhow::Result;
use pricescout::config::Config;

use super::{build_registry, print_json, OutputFormat};

pub fn list_sources(config: &Config, format: OutputFormat) -> Result<()> {
    let sources = build_registry(config).list();

    match format {
        OutputFormat::Text => {
            println!("Registered sources:");
            for source in &sources {
                println!("  {:<14} {}", source.key, source.label);
            }
        }
        _ => print_json(&sources, format)?,
    }
    Ok(())
}
