//! Core value types shared across the search pipeline

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::scraping::price::format_price;

/// One normalized product offer
///
/// Listings are only built once a title, an absolute link, and a price have
/// all been recovered; see [`ListingCandidate::build`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub title: String,
    pub link: String,
    /// Integer count of the smallest printed currency unit
    pub price: u64,
    pub price_display: String,
    pub thumbnail: Option<String>,
    /// Label of the source this listing came from
    pub source: String,
}

impl Listing {
    /// Create a listing; `price_display` is derived from `price`.
    pub fn new(
        title: impl Into<String>,
        link: impl Into<String>,
        price: u64,
        thumbnail: Option<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            price,
            price_display: format_price(price),
            thumbnail,
            source: source.into(),
        }
    }

    /// Copy of this listing attributed to another source label
    pub fn with_source(mut self, source: &str) -> Self {
        source.clone_into(&mut self.source);
        self
    }
}

/// A partially-recovered listing. Any missing required field means the
/// candidate silently does not match.
#[derive(Debug, Clone, Default)]
pub struct ListingCandidate {
    pub title: Option<String>,
    pub link: Option<String>,
    pub price: Option<u64>,
    pub thumbnail: Option<String>,
}

impl ListingCandidate {
    /// Promote to a [`Listing`] if title, link, and price are all present
    pub fn build(self, source: &str) -> Option<Listing> {
        let title = self.title.filter(|t| !t.trim().is_empty())?;
        let link = self.link.filter(|l| !l.is_empty())?;
        let price = self.price?;
        Some(Listing::new(title, link, price, self.thumbnail, source))
    }
}

/// Why a single source failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SourceError {
    /// An anti-automation interstitial was detected
    Blocked { phrase: String },
    /// Timeout, connection failure, or non-2xx status
    Transport(String),
    /// No HTML parser produced a document
    Parse(String),
}

impl SourceError {
    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Blocked { .. })
    }
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blocked { phrase } => {
                write!(f, "source detected automation (matched \"{}\")", phrase)
            }
            Self::Transport(e) => write!(f, "request failed: {}", e),
            Self::Parse(e) => write!(f, "could not parse document: {}", e),
        }
    }
}

/// Result of running one source adapter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceOutcome {
    pub listings: Vec<Listing>,
    pub error: Option<SourceError>,
}

impl SourceOutcome {
    pub fn ok(listings: Vec<Listing>) -> Self {
        Self {
            listings,
            error: None,
        }
    }

    pub fn failed(error: SourceError) -> Self {
        Self {
            listings: Vec::new(),
            error: Some(error),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

/// Registry view of a source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub key: String,
    pub label: String,
}

/// Merged, deduplicated, price-sorted result across sources
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedResult {
    /// Ascending by price
    pub listings: Vec<Listing>,
    /// One entry per failed or blocked source, prefixed with its label
    pub errors: Vec<String>,
    pub query: String,
    /// Labels of the sources that were actually dispatched
    pub sources_queried: Vec<String>,
    pub best_item: Option<Listing>,
}

impl AggregatedResult {
    /// Result for a query that was not dispatched anywhere
    pub fn empty(query: &str) -> Self {
        Self {
            query: query.to_string(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_derives_display_price() {
        let listing = Listing::new("Phone", "https://x.test/p/1", 1_299_900, None, "Shop");
        assert_eq!(listing.price_display, "$1.299.900");
    }

    #[test]
    fn test_candidate_requires_all_fields() {
        let full = ListingCandidate {
            title: Some("Phone".into()),
            link: Some("https://x.test/p/1".into()),
            price: Some(0),
            thumbnail: None,
        };
        assert!(full.clone().build("Shop").is_some());

        let no_title = ListingCandidate {
            title: Some("   ".into()),
            ..full.clone()
        };
        assert!(no_title.build("Shop").is_none());

        let no_link = ListingCandidate {
            link: None,
            ..full.clone()
        };
        assert!(no_link.build("Shop").is_none());

        let no_price = ListingCandidate {
            price: None,
            ..full
        };
        assert!(no_price.build("Shop").is_none());
    }

    #[test]
    fn test_source_error_display() {
        let blocked = SourceError::Blocked {
            phrase: "captcha".into(),
        };
        assert!(blocked.is_blocked());
        assert!(blocked.to_string().contains("captcha"));

        let transport = SourceError::Transport("HTTP status 503".into());
        assert!(!transport.is_blocked());
        assert_eq!(transport.to_string(), "request failed: HTTP status 503");
    }
}
