//! Extraction types: site profiles, compiled selectors, and results

use regex::Regex;
use scraper::Selector;
use thiserror::Error;
use url::Url;

use crate::types::Listing;

/// Errors during extraction
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExtractError {
    /// The page is an anti-automation interstitial
    #[error("Blocked by anti-automation check (matched \"{phrase}\")")]
    Blocked { phrase: String },
    /// No HTML parser produced a usable document
    #[error("Failed to parse HTML: {0}")]
    Parse(String),
}

/// Which strategy produced an extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    SemanticCards,
    AnchorReconstruction,
    StructuredData,
    GenericLinks,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SemanticCards => "semantic_cards",
            Self::AnchorReconstruction => "anchor_reconstruction",
            Self::StructuredData => "structured_data",
            Self::GenericLinks => "generic_links",
        }
    }
}

/// Listings recovered from one document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// `None` when no strategy matched
    pub strategy: Option<Strategy>,
    pub listings: Vec<Listing>,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }
}

/// Title terms that mark accessories rather than the product itself
pub const ACCESSORY_TERMS: &[&str] = &[
    "funda",
    "case",
    "carcasa",
    "estuche",
    "forro",
    "cargador",
    "charger",
    "cable usb",
    "screen protector",
    "protector de pantalla",
    "vidrio templado",
    "tempered glass",
    "soporte para",
    "holder",
];

/// Case-insensitive substring match against [`ACCESSORY_TERMS`]
pub fn is_accessory(title: &str) -> bool {
    let lower = title.to_lowercase();
    ACCESSORY_TERMS.iter().any(|term| lower.contains(term))
}

/// Declarative description of a site's search-results markup
///
/// Selector lists are in priority order. Everything here is plain strings so
/// profiles can be built in `const`-like source tables; [`CompiledSite`]
/// holds the parsed form.
#[derive(Debug, Clone)]
pub struct SiteProfile {
    /// Source label attached to every listing
    pub label: String,
    /// Base for resolving relative links
    pub base_url: Url,
    /// Registrable domain product links must belong to (e.g. `amazon.com`)
    pub domain: String,
    /// Product card containers
    pub card_selectors: Vec<String>,
    /// Title anchors inside a card (also drive anchor reconstruction)
    pub link_selectors: Vec<String>,
    pub title_selectors: Vec<String>,
    /// Secondary title line (brand, model) prepended to the title
    pub subtitle_selectors: Vec<String>,
    /// Card attributes that carry a machine-readable price
    pub price_attributes: Vec<String>,
    /// Current-price containers; whole/fraction are looked up inside them
    pub price_container_selectors: Vec<String>,
    pub price_whole_selectors: Vec<String>,
    pub price_fraction_selectors: Vec<String>,
    /// Separator placed between whole and fraction parts
    pub decimal_separator: char,
    /// Regex a product link's path (and query) must match
    pub product_path_pattern: String,
    /// Card attribute holding a product key (e.g. `data-asin`)
    pub key_attribute: Option<String>,
    /// Link template with a `{key}` placeholder
    pub link_template: Option<String>,
    /// Class fragments that identify a card-like ancestor
    pub card_class_hints: Vec<String>,
}

/// Site profile with selectors and patterns compiled
#[derive(Debug)]
pub struct CompiledSite {
    pub profile: SiteProfile,
    pub card_selectors: Vec<Selector>,
    pub link_selectors: Vec<Selector>,
    pub title_selectors: Vec<Selector>,
    pub subtitle_selectors: Vec<Selector>,
    pub price_container_selectors: Vec<Selector>,
    pub price_whole_selectors: Vec<Selector>,
    pub price_fraction_selectors: Vec<Selector>,
    pub product_path: Option<Regex>,
}

impl CompiledSite {
    pub fn new(profile: SiteProfile) -> Self {
        let product_path = match Regex::new(&profile.product_path_pattern) {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::warn!(
                    "Invalid product path pattern '{}' for {}: {}",
                    profile.product_path_pattern,
                    profile.label,
                    e
                );
                None
            }
        };

        Self {
            card_selectors: compile(&profile.card_selectors),
            link_selectors: compile(&profile.link_selectors),
            title_selectors: compile(&profile.title_selectors),
            subtitle_selectors: compile(&profile.subtitle_selectors),
            price_container_selectors: compile(&profile.price_container_selectors),
            price_whole_selectors: compile(&profile.price_whole_selectors),
            price_fraction_selectors: compile(&profile.price_fraction_selectors),
            product_path,
            profile,
        }
    }

    pub fn label(&self) -> &str {
        &self.profile.label
    }

    /// Resolve `href` against the site base and canonicalize it.
    ///
    /// Only http(s) URLs survive.
    pub fn resolve_link(&self, href: &str) -> Option<Url> {
        let href = href.trim();
        if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
            return None;
        }
        let url = self.profile.base_url.join(href).ok()?;
        matches!(url.scheme(), "http" | "https").then_some(url)
    }

    /// True if `url` is on this site and looks like a product page
    pub fn is_product_url(&self, url: &Url) -> bool {
        let on_domain = url.host_str().is_some_and(|host| {
            host == self.profile.domain || host.ends_with(&format!(".{}", self.profile.domain))
        });
        if !on_domain {
            return false;
        }

        let Some(re) = &self.product_path else {
            return false;
        };
        let target = match url.query() {
            Some(q) => format!("{}?{}", url.path(), q),
            None => url.path().to_string(),
        };
        re.is_match(&target) || url.host_str().is_some_and(|h| re.is_match(h))
    }

    /// Product URL built from a card key via the link template
    pub fn link_from_key(&self, key: &str) -> Option<Url> {
        let key = key.trim();
        if key.is_empty() {
            return None;
        }
        let template = self.profile.link_template.as_ref()?;
        self.resolve_link(&template.replace("{key}", key))
    }
}

fn compile(patterns: &[String]) -> Vec<Selector> {
    patterns
        .iter()
        .filter_map(|s| match Selector::parse(s) {
            Ok(sel) => Some(sel),
            Err(e) => {
                tracing::warn!("Invalid selector '{}': {:?}", s, e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// A small synthetic shop used across extractor tests
    pub fn test_profile() -> SiteProfile {
        SiteProfile {
            label: "TestShop".to_string(),
            base_url: Url::parse("https://www.shop.test/").unwrap(),
            domain: "shop.test".to_string(),
            card_selectors: vec!["li.result-card".to_string(), "div.product-card".to_string()],
            link_selectors: vec!["a.card-title".to_string()],
            title_selectors: vec![".card-title-text".to_string()],
            subtitle_selectors: vec![".card-brand".to_string()],
            price_attributes: vec!["data-price".to_string()],
            price_container_selectors: vec![".price-current".to_string()],
            price_whole_selectors: vec![".price-whole".to_string()],
            price_fraction_selectors: vec![".price-cents".to_string()],
            decimal_separator: ',',
            product_path_pattern: r"/p/[A-Z0-9]+".to_string(),
            key_attribute: Some("data-sku".to_string()),
            link_template: Some("https://www.shop.test/p/{key}".to_string()),
            card_class_hints: vec!["item".to_string(), "card".to_string()],
        }
    }

    pub fn test_site() -> CompiledSite {
        CompiledSite::new(test_profile())
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::test_site;
    use super::*;

    #[test]
    fn test_accessory_blacklist() {
        assert!(is_accessory("Funda Silicona iPhone 13"));
        assert!(is_accessory("iPhone 13 CASE transparente"));
        assert!(is_accessory("Cargador rápido 20W"));
        assert!(is_accessory("Protector De Pantalla iPhone 13"));
        assert!(!is_accessory("Apple iPhone 13 (128 GB) - Azul"));
    }

    #[test]
    fn test_invalid_selectors_are_skipped() {
        let mut profile = super::fixtures::test_profile();
        profile.card_selectors = vec!["li.ok".to_string(), "<<<".to_string()];
        let site = CompiledSite::new(profile);
        assert_eq!(site.card_selectors.len(), 1);
    }

    #[test]
    fn test_resolve_link() {
        let site = test_site();
        assert_eq!(
            site.resolve_link("/p/ABC123").unwrap().as_str(),
            "https://www.shop.test/p/ABC123"
        );
        assert!(site.resolve_link("#top").is_none());
        assert!(site.resolve_link("javascript:void(0)").is_none());
        assert!(site.resolve_link("mailto:a@b.test").is_none());
    }

    #[test]
    fn test_is_product_url() {
        let site = test_site();
        let ok = Url::parse("https://www.shop.test/p/ABC123").unwrap();
        let sub = Url::parse("https://m.shop.test/p/XYZ9").unwrap();
        let wrong_path = Url::parse("https://www.shop.test/help").unwrap();
        let wrong_domain = Url::parse("https://evilshop.test/p/ABC123").unwrap();
        assert!(site.is_product_url(&ok));
        assert!(site.is_product_url(&sub));
        assert!(!site.is_product_url(&wrong_path));
        assert!(!site.is_product_url(&wrong_domain));
    }

    #[test]
    fn test_link_from_key() {
        let site = test_site();
        assert_eq!(
            site.link_from_key("B0ABC").unwrap().as_str(),
            "https://www.shop.test/p/B0ABC"
        );
        assert!(site.link_from_key("  ").is_none());
    }
}
