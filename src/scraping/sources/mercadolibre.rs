//! MercadoLibre Colombia

use std::sync::Arc;
use url::Url;

use crate::config::ScrapingConfig;
use crate::scraping::adapter::SiteAdapter;
use crate::scraping::extractor::SiteProfile;
use crate::scraping::fetcher::SessionFactory;
use crate::scraping::query::Query;
use crate::scraping::shaper::{DelayRange, ShaperPolicy};

use super::{strings, WARMUP_DELAY};

pub const KEY: &str = "mercadolibre";
pub const LABEL: &str = "MercadoLibre";

const HOME: &str = "https://www.mercadolibre.com.co/";
const LISTING_BASE: &str = "https://listado.mercadolibre.com.co/";

/// Listing pages are requested gzip-only
const ACCEPT_ENCODING: &str = "gzip";

const REFERERS: &[&str] = &[
    "https://www.mercadolibre.com.co/",
    "https://www.google.com/",
    "https://www.mercadolibre.com.co/ofertas",
    "https://www.mercadolibre.com.co/historial",
];

const WARMUP_PAGES: &[&str] = &[
    "https://www.mercadolibre.com.co/",
    "https://www.mercadolibre.com.co/ofertas",
    "https://www.mercadolibre.com.co/categorias",
];

pub const DEFAULT_DELAY: DelayRange = DelayRange {
    min: std::time::Duration::from_millis(500),
    max: std::time::Duration::from_millis(1500),
};

/// `https://listado.mercadolibre.com.co/{slug}`
///
/// Queries with no ASCII alphanumerics fall back to the percent-encoded text.
pub fn search_url(query: &Query) -> Option<Url> {
    let slug = query.slug();
    let segment = if slug.is_empty() {
        query.as_str().to_string()
    } else {
        slug
    };
    Url::parse(LISTING_BASE).ok()?.join(&segment).ok()
}

pub fn profile() -> Option<SiteProfile> {
    Some(SiteProfile {
        label: LABEL.to_string(),
        base_url: Url::parse(HOME).ok()?,
        domain: "mercadolibre.com.co".to_string(),
        card_selectors: strings(&[
            "li.ui-search-layout__item",
            "div.ui-search-result__wrapper",
            "div.poly-card",
            "div.andes-card.ui-search-result",
        ]),
        link_selectors: strings(&[
            "a.poly-component__title",
            "h3.poly-component__title-wrapper a",
            "a.ui-search-item__group__element.ui-search-link",
            "a.ui-search-link",
        ]),
        title_selectors: strings(&[
            ".poly-component__title",
            "h2.ui-search-item__title",
            ".ui-search-item__title",
        ]),
        subtitle_selectors: strings(&[
            ".poly-component__brand",
            ".ui-search-item__brand-discoverability",
        ]),
        price_attributes: Vec::new(),
        price_container_selectors: strings(&[
            ".poly-price__current",
            ".ui-search-price__second-line",
            ".ui-search-price__part",
        ]),
        price_whole_selectors: strings(&[".andes-money-amount__fraction"]),
        price_fraction_selectors: strings(&[".andes-money-amount__cents"]),
        decimal_separator: ',',
        product_path_pattern: r"(?i)/(?:p/)?MCO-?\d+".to_string(),
        key_attribute: None,
        link_template: None,
        card_class_hints: strings(&["ui-search-result", "poly-card", "ui-search-layout__item"]),
    })
}

pub fn policy(config: &ScrapingConfig) -> ShaperPolicy {
    ShaperPolicy {
        referers: strings(REFERERS),
        accept_language: config.accept_language.clone(),
        accept_encoding: ACCEPT_ENCODING.to_string(),
        dnt_probability: config.dnt_probability,
        pre_request_delay: config.delay_for(KEY, DEFAULT_DELAY),
        warmup_urls: WARMUP_PAGES.iter().filter_map(|u| Url::parse(u).ok()).collect(),
        warmup_delay: WARMUP_DELAY,
        warmup_enabled: config.warmup_enabled,
        ..ShaperPolicy::default()
    }
}

pub fn adapter(config: &ScrapingConfig, sessions: Arc<dyn SessionFactory>) -> Option<SiteAdapter> {
    Some(
        SiteAdapter::new(KEY, profile()?, policy(config), search_url, sessions)
            .with_pacing(config.pacing_enabled),
    )
}
