//! Last-resort strategy: product-looking links plus a nearby price

use scraper::{ElementRef, Html};
use std::collections::HashSet;

use super::accept;
use super::text::{element_text, find_currency, selector, thumbnail_of};
use super::types::CompiledSite;
use crate::scraping::normalize_url;
use crate::scraping::price::parse_price_opt;
use crate::types::{Listing, ListingCandidate};

/// Anchor text shorter than this is treated as an icon or nav link
const MIN_TITLE_CHARS: usize = 10;

/// Ancestor levels searched for a price-class node
const PRICE_ANCESTOR_LEVELS: usize = 4;

/// Characters of following sibling text scanned for a currency amount
const SIBLING_WINDOW_CHARS: usize = 200;

/// Strategy 5: any on-site product link with a recoverable price
pub(super) fn generic_links(document: &Html, site: &CompiledSite, max_items: usize) -> Vec<Listing> {
    let Some(anchor_sel) = selector("a[href]") else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut listings = Vec::new();

    for anchor in document.select(&anchor_sel) {
        if listings.len() >= max_items {
            break;
        }
        let Some(url) = anchor
            .value()
            .attr("href")
            .and_then(|href| site.resolve_link(href))
            .filter(|u| site.is_product_url(u))
        else {
            continue;
        };

        let link = normalize_url(&url);
        if seen.contains(&link) {
            continue;
        }

        let title = element_text(&anchor);
        if title.chars().count() < MIN_TITLE_CHARS {
            continue;
        }

        let candidate = ListingCandidate {
            title: Some(title),
            link: Some(link.clone()),
            price: nearby_price_node(site, &anchor, &link).or_else(|| sibling_price(&anchor)),
            thumbnail: thumbnail_of(site, &anchor),
        };
        if let Some(listing) = accept(site, candidate) {
            seen.insert(link);
            listings.push(listing);
        }
    }

    listings
}

/// Price from the closest price-class node that belongs to this product.
///
/// The climb stops below any container that also links to another product,
/// so a listing never borrows a neighbour's price.
fn nearby_price_node(site: &CompiledSite, anchor: &ElementRef, link: &str) -> Option<u64> {
    let price_sel = selector("[class*='price']")?;
    anchor
        .ancestors()
        .filter_map(ElementRef::wrap)
        .take_while(|e| !matches!(e.value().name(), "body" | "html"))
        .take(PRICE_ANCESTOR_LEVELS)
        .take_while(|scope| !links_other_product(site, scope, link))
        .find_map(|scope| {
            scope.select(&price_sel).find_map(|node| {
                let text = element_text(&node);
                find_currency(&text)
                    .and_then(parse_price_opt)
                    .or_else(|| parse_price_opt(&text))
            })
        })
}

fn links_other_product(site: &CompiledSite, scope: &ElementRef, link: &str) -> bool {
    let Some(anchor_sel) = selector("a[href]") else {
        return false;
    };
    scope
        .select(&anchor_sel)
        .filter_map(|a| a.value().attr("href").and_then(|href| site.resolve_link(href)))
        .filter(|u| site.is_product_url(u))
        .any(|u| normalize_url(&u) != link)
}

fn sibling_price(anchor: &ElementRef) -> Option<u64> {
    let mut window = String::new();
    for sibling in anchor.next_siblings() {
        if window.chars().count() >= SIBLING_WINDOW_CHARS {
            break;
        }
        if let Some(text) = sibling.value().as_text() {
            window.push_str(text);
        } else if let Some(element) = ElementRef::wrap(sibling) {
            window.push_str(&element_text(&element));
        }
        window.push(' ');
    }
    let window: String = window.chars().take(SIBLING_WINDOW_CHARS).collect();
    find_currency(&window).and_then(parse_price_opt)
}
