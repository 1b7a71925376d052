//! Search pipeline configuration

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::scraping::fetcher::FetchConfig;
use crate::scraping::shaper::{DelayRange, DEFAULT_ACCEPT_LANGUAGE, DEFAULT_DNT_PROBABILITY};

/// Fetching, shaping, and extraction limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapingConfig {
    /// Maximum listings kept per source
    pub max_items_per_source: usize,
    /// Per-request timeout (seconds)
    pub request_timeout_secs: u64,
    /// Connection establishment timeout (seconds)
    pub connect_timeout_secs: u64,
    /// Attempts when the connection itself fails
    pub max_retries: u32,
    /// Idle pooled connections kept per host
    pub pool_max_idle_per_host: usize,
    /// Maximum accepted response body (bytes)
    pub max_content_size: usize,
    /// Probability (0.0-1.0) of sending `DNT: 1`
    pub dnt_probability: f64,
    /// `Accept-Language` header value
    pub accept_language: String,
    /// Visit one or two generic pages before each search
    pub warmup_enabled: bool,
    /// Apply randomized delays before requests
    pub pacing_enabled: bool,
    /// Per-source `[min, max]` pre-request delay overrides (milliseconds)
    pub delay_ms: BTreeMap<String, [u64; 2]>,
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            max_items_per_source: 20,
            request_timeout_secs: 15,
            connect_timeout_secs: 10,
            max_retries: 3,
            pool_max_idle_per_host: 30,
            max_content_size: 10 * 1024 * 1024, // 10 MB
            dnt_probability: DEFAULT_DNT_PROBABILITY,
            accept_language: DEFAULT_ACCEPT_LANGUAGE.to_string(),
            warmup_enabled: true,
            pacing_enabled: true,
            delay_ms: BTreeMap::new(),
        }
    }
}

impl ScrapingConfig {
    /// Transport settings for the fetch engine
    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            timeout: Duration::from_secs(self.request_timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            max_content_size: self.max_content_size,
            pool_max_idle_per_host: self.pool_max_idle_per_host,
            max_retries: self.max_retries,
            ..FetchConfig::default()
        }
    }

    /// Pre-request delay for a source, or `default` without an override
    pub fn delay_for(&self, key: &str, default: DelayRange) -> DelayRange {
        self.delay_ms
            .get(key)
            .map(|[min, max]| DelayRange::from_millis(*min, *max))
            .unwrap_or(default)
    }
}
