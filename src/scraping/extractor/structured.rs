//! Structured-data strategy
//!
//! Walks every JSON payload embedded in the page (JSON-LD blocks, JSON
//! script tags, and object literals assigned inside inline scripts) looking
//! for objects that expose a name, a URL, and a price under known aliases.
//! Payloads may nest products arbitrarily deep, so the walk is recursive.

use scraper::Html;
use serde_json::{Map, Value};
use std::collections::HashSet;

use super::accept;
use super::text::selector;
use super::types::CompiledSite;
use crate::scraping::normalize_url;
use crate::scraping::price::parse_price_opt;
use crate::types::{Listing, ListingCandidate};

const NAME_KEYS: &[&str] = &["name", "title"];
const URL_KEYS: &[&str] = &["url", "permalink", "link", "href"];
const PRICE_KEYS: &[&str] = &["price", "lowPrice", "amount", "salePrice", "currentPrice"];
const IMAGE_KEYS: &[&str] = &["image", "thumbnail", "picture"];
const OFFER_KEYS: &[&str] = &["offers", "offer", "prices"];

/// Nesting limit for the recursive walk
const MAX_DEPTH: usize = 48;

/// Strategy 4: products described by embedded JSON
pub(super) fn structured_data(document: &Html, site: &CompiledSite, max_items: usize) -> Vec<Listing> {
    let mut walker = Walker {
        site,
        max_items,
        seen: HashSet::new(),
        listings: Vec::new(),
    };

    for payload in payloads(document) {
        walker.walk(&payload, 0);
        if walker.is_full() {
            break;
        }
    }
    walker.listings
}

/// Every JSON value that can be recovered from the page's scripts
fn payloads(document: &Html) -> Vec<Value> {
    let Some(script_sel) = selector("script") else {
        return Vec::new();
    };

    let mut out = Vec::new();
    for script in document.select(&script_sel) {
        let body = script.text().collect::<String>();
        let body = body.trim();
        if body.is_empty() {
            continue;
        }

        let kind = script
            .value()
            .attr("type")
            .unwrap_or_default()
            .to_ascii_lowercase();

        let parsed = if kind.contains("json") {
            serde_json::from_str(body).ok()
        } else {
            embedded_object(body)
        };
        match parsed {
            Some(value) => out.push(value),
            None => tracing::trace!("Skipping unparseable script payload ({} bytes)", body.len()),
        }
    }
    out
}

/// Outermost `{...}` literal inside a script body (e.g. `window.__STATE__ = {...};`)
fn embedded_object(body: &str) -> Option<Value> {
    let start = body.find('{')?;
    let end = body.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&body[start..=end]).ok()
}

struct Walker<'a> {
    site: &'a CompiledSite,
    max_items: usize,
    seen: HashSet<String>,
    listings: Vec<Listing>,
}

impl Walker<'_> {
    fn is_full(&self) -> bool {
        self.listings.len() >= self.max_items
    }

    fn walk(&mut self, value: &Value, depth: usize) {
        if depth > MAX_DEPTH || self.is_full() {
            return;
        }
        match value {
            Value::Object(map) => {
                if let Some(listing) = self.product(map) {
                    if self.seen.insert(listing.link.clone()) {
                        self.listings.push(listing);
                    }
                    return;
                }
                for child in map.values() {
                    self.walk(child, depth + 1);
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.walk(item, depth + 1);
                }
            }
            _ => {}
        }
    }

    fn product(&self, map: &Map<String, Value>) -> Option<Listing> {
        let title = string_field(map, NAME_KEYS)?;
        let link = string_field(map, URL_KEYS)
            .and_then(|href| self.site.resolve_link(&href))
            .map(|u| normalize_url(&u))?;

        let candidate = ListingCandidate {
            title: Some(title),
            link: Some(link),
            price: price_of(map).or_else(|| offer_price(map)),
            thumbnail: image_of(map).and_then(|src| self.site.resolve_link(&src).map(String::from)),
        };
        accept(self.site, candidate)
    }
}

fn string_field(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match map.get(*k)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    })
}

fn price_of(map: &Map<String, Value>) -> Option<u64> {
    PRICE_KEYS.iter().find_map(|k| price_value(map.get(*k)?))
}

/// Price under an `offers` object or the first offer in an array
fn offer_price(map: &Map<String, Value>) -> Option<u64> {
    OFFER_KEYS.iter().find_map(|k| match map.get(*k)? {
        Value::Object(offer) => price_of(offer),
        Value::Array(offers) => offers.iter().find_map(|o| o.as_object().and_then(price_of)),
        _ => None,
    })
}

/// Whole numbers map directly; anything else goes through digit extraction
fn price_value(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            let f = n.as_f64()?;
            if f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 {
                Some(f as u64)
            } else {
                parse_price_opt(&n.to_string())
            }
        }),
        Value::String(s) => parse_price_opt(s),
        _ => None,
    }
}

fn image_of(map: &Map<String, Value>) -> Option<String> {
    IMAGE_KEYS.iter().find_map(|k| match map.get(*k)? {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => items.iter().find_map(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Object(o) => o.get("url").and_then(Value::as_str).map(String::from),
            _ => None,
        }),
        Value::Object(o) => o.get("url").and_then(Value::as_str).map(String::from),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::super::types::fixtures::test_site;
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_ld_item_list() {
        let site = test_site();
        let doc = Html::parse_document(
            r#"<html><head>
            <script type="application/ld+json">
              {"@context":"https://schema.org","@type":"Organization","name":"Shop","url":"https://www.shop.test/"}
            </script>
            <script type="application/ld+json">
            {"@type":"ItemList","itemListElement":[
              {"@type":"ListItem","position":1,"item":{
                 "@type":"Product","name":"iPhone 13 128GB","url":"/p/J1",
                 "image":["https://cdn.shop.test/j1.jpg"],
                 "offers":{"@type":"Offer","price":"2899000","priceCurrency":"COP"}}},
              {"@type":"ListItem","position":2,"item":{
                 "@type":"Product","name":"Funda iPhone 13","url":"/p/J2",
                 "offers":{"price":19900}}}
            ]}
            </script></head><body></body></html>"#,
        );

        let listings = structured_data(&doc, &site, 10);
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].title, "iPhone 13 128GB");
        assert_eq!(listings[0].link, "https://www.shop.test/p/J1");
        assert_eq!(listings[0].price, 2_899_000);
        assert_eq!(listings[0].thumbnail.as_deref(), Some("https://cdn.shop.test/j1.jpg"));
    }

    #[test]
    fn test_inline_state_object() {
        let site = test_site();
        let doc = Html::parse_document(
            r#"<html><body><script>
              window.__PRELOADED_STATE__ = {"page":{"results":{"items":[
                {"title":"Galaxy A54","permalink":"https://www.shop.test/p/G54","currentPrice":1459000},
                {"title":"Galaxy A34","permalink":"https://www.shop.test/p/G34","prices":[{"amount":"$ 1.099.000"}]}
              ]}}};
            </script></body></html>"#,
        );

        let listings = structured_data(&doc, &site, 10);
        assert_eq!(listings.len(), 2);
        assert_eq!(listings[0].price, 1_459_000);
        assert_eq!(listings[1].price, 1_099_000);
    }

    #[test]
    fn test_price_value_rules() {
        assert_eq!(price_value(&json!(1299)), Some(1299));
        assert_eq!(price_value(&json!(1299.0)), Some(1299));
        assert_eq!(price_value(&json!(1299.99)), Some(129_999));
        assert_eq!(price_value(&json!("$ 1.299")), Some(1299));
        assert_eq!(price_value(&json!("gratis")), None);
        assert_eq!(price_value(&json!(null)), None);
    }

    #[test]
    fn test_malformed_json_is_skipped() {
        let site = test_site();
        let doc = Html::parse_document(
            r#"<script type="application/ld+json">{"name": "broken", </script>
               <script>var x = 1;</script>"#,
        );
        assert!(structured_data(&doc, &site, 10).is_empty());
    }
}
