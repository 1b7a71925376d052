use anyhow::Result;
use pricescout::{config::Config, types::AggregatedResult, util::truncate_str, Aggregator};
use std::sync::Arc;
use tracing::{info, warn};

use super::{build_registry, print_json, OutputFormat};

const TITLE_WIDTH: usize = 72;

pub async fn search(
    config: &Config,
    query: String,
    sources: Vec<String>,
    max_items: Option<usize>,
    format: OutputFormat,
) -> Result<()> {
    let max_items = max_items.unwrap_or(config.scraping.max_items_per_source);
    if max_items == 0 {
        anyhow::bail!("--max-items must be positive");
    }

    let registry = Arc::new(build_registry(config));
    for key in &sources {
        if registry.get(key).is_none() {
            warn!("Unknown source '{}' (see `pricescout sources`)", key);
        }
    }

    info!("Searching for: {}", query);
    let selected = (!sources.is_empty()).then_some(sources.as_slice());
    let result = Aggregator::new(registry)
        .aggregate(&query, selected, max_items)
        .await;

    match format {
        OutputFormat::Text => print_text(&result),
        _ => print_json(&result, format)?,
    }
    Ok(())
}

fn print_text(result: &AggregatedResult) {
    println!(
        "\nResults for \"{}\" ({} listings from {}):\n",
        result.query,
        result.listings.len(),
        if result.sources_queried.is_empty() {
            "no sources".to_string()
        } else {
            result.sources_queried.join(", ")
        }
    );

    if let Some(best) = &result.best_item {
        println!("Best offer: {} {} [{}]", best.price_display, best.title, best.source);
        println!("   {}\n", best.link);
    }

    for (i, listing) in result.listings.iter().enumerate() {
        println!(
            "{:>3}. {:>14}  {} [{}]",
            i + 1,
            listing.price_display,
            truncate_str(&listing.title, TITLE_WIDTH),
            listing.source
        );
        println!("      {}", listing.link);
    }

    if !result.errors.is_empty() {
        println!("\nErrors:");
        for error in &result.errors {
            println!("  - {}", error);
        }
    }
}
