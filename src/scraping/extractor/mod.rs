//! Listing extraction from search-results HTML
//!
//! Markup on retail search pages changes often, so extraction is a chain of
//! strategies tried in fixed priority order. The first one that yields at
//! least one listing wins; results are never merged across strategies.
//!
//! 1. Block detection: an anti-automation page aborts the whole chain.
//! 2. Semantic product cards (site selectors).
//! 3. Anchor reconstruction from title links.
//! 4. Structured data (JSON-LD, JSON scripts, inline state objects).
//! 5. Generic product links with a nearby price.
//!
//! Every strategy applies the accessory blacklist and caps output at
//! `max_items`.

mod block;
mod cards;
mod generic;
mod structured;
mod text;
mod types;

pub use block::{detect_block, BLOCK_PHRASES};
pub use types::*;

#[cfg(test)]
pub(crate) use types::fixtures;

use scraper::Html;
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::types::{Listing, ListingCandidate};

type StrategyFn = fn(&Html, &CompiledSite, usize) -> Vec<Listing>;

const STRATEGIES: &[(Strategy, StrategyFn)] = &[
    (Strategy::SemanticCards, cards::semantic_cards),
    (Strategy::AnchorReconstruction, cards::anchor_reconstruction),
    (Strategy::StructuredData, structured::structured_data),
    (Strategy::GenericLinks, generic::generic_links),
];

/// Ordered-fallback extractor for one site
#[derive(Debug)]
pub struct ExtractionChain {
    site: CompiledSite,
}

impl ExtractionChain {
    pub fn new(profile: SiteProfile) -> Self {
        Self {
            site: CompiledSite::new(profile),
        }
    }

    pub fn site(&self) -> &CompiledSite {
        &self.site
    }

    /// Parse `html` into a document.
    ///
    /// The full-document parser is tried first; if it aborts, the fragment
    /// parser gets a second attempt before giving up.
    pub fn parse(html: &str) -> Result<Html, ExtractError> {
        match catch_unwind(AssertUnwindSafe(|| Html::parse_document(html))) {
            Ok(document) => return Ok(document),
            Err(_) => tracing::debug!("Document parser failed, retrying as fragment"),
        }

        catch_unwind(AssertUnwindSafe(|| Html::parse_fragment(html)))
            .map_err(|_| ExtractError::Parse("no HTML parser accepted the document".to_string()))
    }

    /// Parse and extract in one step
    pub fn extract(&self, html: &str, max_items: usize) -> Result<Extraction, ExtractError> {
        let document = Self::parse(html)?;
        self.run(&document, max_items)
    }

    /// Run the strategy chain over a parsed document
    pub fn run(&self, document: &Html, max_items: usize) -> Result<Extraction, ExtractError> {
        if let Some(phrase) = detect_block(document) {
            tracing::warn!("{}: block page detected (\"{}\")", self.site.label(), phrase);
            return Err(ExtractError::Blocked {
                phrase: phrase.to_string(),
            });
        }

        if max_items == 0 {
            return Ok(Extraction::default());
        }

        for (strategy, extract) in STRATEGIES {
            let listings = extract(document, &self.site, max_items);
            tracing::debug!(
                "{}: strategy {} yielded {} listings",
                self.site.label(),
                strategy.as_str(),
                listings.len()
            );
            if !listings.is_empty() {
                return Ok(Extraction {
                    strategy: Some(*strategy),
                    listings,
                });
            }
        }

        Ok(Extraction::default())
    }
}

/// Promote a candidate to a listing unless a field is missing or the title
/// names an accessory
fn accept(site: &CompiledSite, candidate: ListingCandidate) -> Option<Listing> {
    let listing = candidate.build(site.label())?;
    if is_accessory(&listing.title) {
        tracing::trace!("Skipping accessory listing: {}", listing.title);
        return None;
    }
    Some(listing)
}
