//! pricescout: concurrent product price search across online stores
//!
//! A query fans out to every registered source in parallel:
//! - Browser-like request shaping (rotated headers, pacing, warm-up visits)
//! - Cookie-aware HTTP sessions with brotli fallback decoding
//! - Ordered-fallback extraction (product cards, title anchors, structured
//!   data, generic links) with anti-automation block detection
//! - Per-source and global deduplication, ranked by price

pub mod config;
pub mod scraping;
pub mod types;
pub mod util;

pub use config::Config;
pub use scraping::{Aggregator, SourceRegistry};
pub use types::*;
