//! Search-and-extraction pipeline
//!
//! A query fans out to every enabled source. Each source adapter shapes a
//! browser-like session, fetches the site's search page, and runs an ordered
//! chain of extraction strategies over it. Results are deduplicated per
//! source, merged, and sorted by price.
//!
//! Key components:
//! - `RequestShaper`: randomized headers, pacing delays, warm-up visits
//! - `FetchEngine`: cookie-aware HTTP sessions with brotli fallback decoding
//! - `ExtractionChain`: block detection plus fallback extraction strategies
//! - `SiteAdapter`: one site's end-to-end fetch and extract pipeline
//! - `SourceRegistry`: process-wide key to adapter map
//! - `Aggregator`: concurrent fan-out with isolated per-source failures

pub mod adapter;
pub mod aggregator;
pub mod dedup;
pub mod extractor;
pub mod fetcher;
pub mod price;
pub mod query;
pub mod registry;
pub mod shaper;
pub mod sources;

pub use adapter::{SiteAdapter, SourceAdapter};
pub use aggregator::Aggregator;
pub use dedup::{dedupe_and_sort, ListingDeduplicator};
pub use extractor::{ExtractError, Extraction, ExtractionChain, SiteProfile, Strategy};
pub use fetcher::{FetchEngine, FetchError, HttpSession, SessionFactory};
pub use price::{format_price, parse_price};
pub use query::{slugify, Query};
pub use registry::SourceRegistry;
pub use shaper::{RequestProfile, RequestShaper, ShaperPolicy};

/// Tracking/session query parameters to strip from listing links
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "ref",
    "ref_",
    "qid",
    "sr",
    "crid",
    "sprefix",
    "keywords",
    "tracking_id",
    "searchvariation",
    "position",
    "search_layout",
];

/// Canonicalize a listing link
///
/// - Strips fragments
/// - Strips tracking/session query parameters (case-insensitive keys)
/// - Keeps the remaining parameters in their original order
///
/// Host and path casing are preserved so the link stays valid.
pub(crate) fn normalize_url(url: &url::Url) -> String {
    let mut normalized = url.clone();

    normalized.set_fragment(None);

    if let Some(query) = normalized.query() {
        let params: Vec<String> = query
            .split('&')
            .filter(|p| !p.is_empty())
            .filter(|p| {
                let key = p.split('=').next().unwrap_or("");
                !TRACKING_PARAMS.contains(&key.to_ascii_lowercase().as_str())
            })
            .map(str::to_string)
            .collect();

        if params.is_empty() {
            normalized.set_query(None);
        } else {
            normalized.set_query(Some(&params.join("&")));
        }
    }

    normalized.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    #[test]
    fn test_normalize_strips_fragment_and_tracking() {
        let url = Url::parse(
            "https://articulo.mercadolibre.com.co/MCO-123-iphone-_JM?utm_source=x&color=azul#position=1&search_layout=grid",
        )
        .unwrap();
        assert_eq!(
            normalize_url(&url),
            "https://articulo.mercadolibre.com.co/MCO-123-iphone-_JM?color=azul"
        );
    }

    #[test]
    fn test_normalize_drops_empty_query() {
        let url = Url::parse("https://www.amazon.com/dp/B09G9FPHY6?ref=sr_1_1&qid=17&sr=8-1").unwrap();
        assert_eq!(normalize_url(&url), "https://www.amazon.com/dp/B09G9FPHY6");
    }

    #[test]
    fn test_normalize_preserves_case() {
        let url = Url::parse("https://www.shop.test/p/ABC?Color=Red").unwrap();
        assert_eq!(normalize_url(&url), "https://www.shop.test/p/ABC?Color=Red");
    }
}
