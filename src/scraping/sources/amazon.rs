//! Amazon US

use std::sync::Arc;
use url::Url;

use crate::config::ScrapingConfig;
use crate::scraping::adapter::SiteAdapter;
use crate::scraping::extractor::SiteProfile;
use crate::scraping::fetcher::SessionFactory;
use crate::scraping::query::Query;
use crate::scraping::shaper::{DelayRange, ShaperPolicy, DEFAULT_ACCEPT_ENCODING};

use super::{strings, WARMUP_DELAY};

pub const KEY: &str = "amazon";
pub const LABEL: &str = "Amazon";

const HOME: &str = "https://www.amazon.com/";
const SEARCH: &str = "https://www.amazon.com/s";

const REFERERS: &[&str] = &[
    "https://www.amazon.com/",
    "https://www.google.com/",
    "https://www.bing.com/",
];

const WARMUP_PAGES: &[&str] = &["https://www.amazon.com/", "https://www.amazon.com/gp/goldbox"];

pub const DEFAULT_DELAY: DelayRange = DelayRange {
    min: std::time::Duration::from_millis(1000),
    max: std::time::Duration::from_millis(2500),
};

/// `https://www.amazon.com/s?k={query}`
pub fn search_url(query: &Query) -> Option<Url> {
    Url::parse_with_params(SEARCH, &[("k", query.as_str())]).ok()
}

pub fn profile() -> Option<SiteProfile> {
    Some(SiteProfile {
        label: LABEL.to_string(),
        base_url: Url::parse(HOME).ok()?,
        domain: "amazon.com".to_string(),
        card_selectors: strings(&[
            "div.s-result-item[data-component-type='s-search-result']",
            "div.s-result-item[data-asin]",
        ]),
        link_selectors: strings(&[
            "h2 a.a-link-normal",
            "a.a-link-normal.s-link-style.a-text-normal",
            "a.a-link-normal.s-underline-text",
        ]),
        title_selectors: strings(&[
            "h2 span.a-text-normal",
            "span.a-size-medium.a-color-base.a-text-normal",
            "span.a-size-base-plus.a-color-base.a-text-normal",
            "h2 span",
        ]),
        subtitle_selectors: strings(&["h2.a-size-mini > span.a-size-base-plus.a-color-base"]),
        price_attributes: Vec::new(),
        price_container_selectors: strings(&[
            "span.a-price[data-a-color='base']",
            "span.a-price:not(.a-text-price)",
        ]),
        price_whole_selectors: strings(&["span.a-price-whole"]),
        price_fraction_selectors: strings(&["span.a-price-fraction"]),
        decimal_separator: '.',
        product_path_pattern: r"/(?:dp|gp/product)/[A-Z0-9]{10}".to_string(),
        key_attribute: Some("data-asin".to_string()),
        link_template: Some("https://www.amazon.com/dp/{key}".to_string()),
        card_class_hints: strings(&["s-result-item", "s-card-container", "puis-card-container"]),
    })
}

pub fn policy(config: &ScrapingConfig) -> ShaperPolicy {
    ShaperPolicy {
        referers: strings(REFERERS),
        accept_language: config.accept_language.clone(),
        accept_encoding: DEFAULT_ACCEPT_ENCODING.to_string(),
        dnt_probability: config.dnt_probability,
        pre_request_delay: config.delay_for(KEY, DEFAULT_DELAY),
        warmup_urls: WARMUP_PAGES.iter().filter_map(|u| Url::parse(u).ok()).collect(),
        warmup_delay: WARMUP_DELAY,
        warmup_enabled: config.warmup_enabled,
    }
}

pub fn adapter(config: &ScrapingConfig, sessions: Arc<dyn SessionFactory>) -> Option<SiteAdapter> {
    Some(
        SiteAdapter::new(KEY, profile()?, policy(config), search_url, sessions)
            .with_pacing(config.pacing_enabled),
    )
}
