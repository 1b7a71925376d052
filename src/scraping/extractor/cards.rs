//! Selector-driven strategies: semantic product cards, then anchor
//! reconstruction when no card container matched.

use scraper::{ElementRef, Html};
use std::collections::HashSet;

use super::text::{
    anchor_link, element_text, find_currency, first_attr, first_text, has_card_class, selector,
    thumbnail_of,
};
use super::types::CompiledSite;
use super::accept;
use crate::scraping::normalize_url;
use crate::scraping::price::parse_price_opt;
use crate::types::{Listing, ListingCandidate};

/// Maximum ancestor hops when looking for a card-like container
const MAX_CARD_DEPTH: usize = 8;

/// Nodes scanned forward from an anchor looking for a price
const FORWARD_SCAN_NODES: usize = 200;

/// Strategy 2: product card containers
pub(super) fn semantic_cards(document: &Html, site: &CompiledSite, max_items: usize) -> Vec<Listing> {
    for card_sel in &site.card_selectors {
        let mut seen = HashSet::new();
        let mut listings = Vec::new();

        for card in document.select(card_sel) {
            if listings.len() >= max_items {
                break;
            }
            let Some(listing) = parse_card(site, &card) else {
                continue;
            };
            if seen.insert(listing.link.clone()) {
                listings.push(listing);
            }
        }

        if !listings.is_empty() {
            return listings;
        }
    }
    Vec::new()
}

fn parse_card(site: &CompiledSite, card: &ElementRef) -> Option<Listing> {
    let anchor = title_anchor(site, card);

    let link = anchor
        .as_ref()
        .and_then(|a| anchor_link(site, a))
        .or_else(|| product_anchor_link(site, card))
        .or_else(|| key_link(site, card));

    let title = card_title(site, card).or_else(|| {
        anchor
            .as_ref()
            .map(element_text)
            .filter(|t| !t.is_empty())
    });

    let candidate = ListingCandidate {
        title,
        link,
        price: card_price(site, card),
        thumbnail: thumbnail_of(site, card),
    };
    accept(site, candidate)
}

/// The card's own title anchor (the card itself may be the anchor)
fn title_anchor<'a>(site: &CompiledSite, card: &ElementRef<'a>) -> Option<ElementRef<'a>> {
    if card.value().name() == "a" && card.value().attr("href").is_some() {
        return Some(*card);
    }
    site.link_selectors
        .iter()
        .find_map(|sel| card.select(sel).find(|a| a.value().attr("href").is_some()))
}

/// Nearest descendant, then ancestor, anchor pointing at a product page
fn product_anchor_link(site: &CompiledSite, card: &ElementRef) -> Option<String> {
    let anchor_sel = selector("a[href]")?;
    let product_link = |a: ElementRef| {
        let href = a.value().attr("href")?;
        let url = site.resolve_link(href)?;
        site.is_product_url(&url).then(|| normalize_url(&url))
    };

    card.select(&anchor_sel).find_map(product_link).or_else(|| {
        card.ancestors()
            .filter_map(ElementRef::wrap)
            .filter(|e| e.value().name() == "a")
            .find_map(product_link)
    })
}

fn key_link(site: &CompiledSite, card: &ElementRef) -> Option<String> {
    let attr = site.profile.key_attribute.as_deref()?;
    let key = card.value().attr(attr)?;
    site.link_from_key(key).map(|u| normalize_url(&u))
}

/// Subtitle + title when both exist, else title alone
fn card_title(site: &CompiledSite, card: &ElementRef) -> Option<String> {
    let title = first_text(card, &site.title_selectors)?;
    match first_text(card, &site.subtitle_selectors) {
        Some(sub) if !title.to_lowercase().starts_with(&sub.to_lowercase()) => {
            Some(format!("{} {}", sub, title))
        }
        _ => Some(title),
    }
}

/// Price from data attributes, then dedicated price nodes, then free text
pub(super) fn card_price(site: &CompiledSite, card: &ElementRef) -> Option<u64> {
    first_attr(card, &site.profile.price_attributes)
        .and_then(parse_price_opt)
        .or_else(|| price_nodes(site, card))
        .or_else(|| find_currency(&element_text(card)).and_then(parse_price_opt))
}

/// Whole part plus optional fraction joined with the site's decimal separator
fn price_nodes(site: &CompiledSite, card: &ElementRef) -> Option<u64> {
    let container = site
        .price_container_selectors
        .iter()
        .find_map(|sel| card.select(sel).next())
        .unwrap_or(*card);

    let whole = first_text(&container, &site.price_whole_selectors)?;
    let text = match first_text(&container, &site.price_fraction_selectors) {
        Some(fraction) => format!("{}{}{}", whole, site.profile.decimal_separator, fraction),
        None => whole,
    };
    parse_price_opt(&text)
}

/// Strategy 3: title anchors rebuilt into pseudo-cards
pub(super) fn anchor_reconstruction(
    document: &Html,
    site: &CompiledSite,
    max_items: usize,
) -> Vec<Listing> {
    let mut seen = HashSet::new();
    let mut listings = Vec::new();

    for anchor in site.link_selectors.iter().flat_map(|sel| document.select(sel)) {
        if listings.len() >= max_items {
            break;
        }
        let Some(link) = anchor_link(site, &anchor) else {
            continue;
        };
        if seen.contains(&link) {
            continue;
        }

        let card = anchor
            .ancestors()
            .filter_map(ElementRef::wrap)
            .take(MAX_CARD_DEPTH)
            .take_while(|e| !holds_other_listing(site, e, &link))
            .find(|e| has_card_class(site, e));

        let title = Some(element_text(&anchor))
            .filter(|t| !t.is_empty())
            .or_else(|| card.as_ref().and_then(|c| card_title(site, c)));

        let price = card
            .as_ref()
            .and_then(|c| card_price(site, c))
            .or_else(|| price_after(document, &anchor));

        let candidate = ListingCandidate {
            title,
            link: Some(link.clone()),
            price,
            thumbnail: card.as_ref().and_then(|c| thumbnail_of(site, c)),
        };
        if let Some(listing) = accept(site, candidate) {
            seen.insert(link);
            listings.push(listing);
        }
    }

    listings
}

/// True if `container` also holds a title anchor for a different product
fn holds_other_listing(site: &CompiledSite, container: &ElementRef, link: &str) -> bool {
    site.link_selectors
        .iter()
        .flat_map(|sel| container.select(sel))
        .filter_map(|a| anchor_link(site, &a))
        .any(|other| other != link)
}

/// First `$`-prefixed text after `anchor` in document order.
///
/// A bare currency symbol is joined with the following text nodes until
/// digits show up, since the amount often sits in a sibling span.
fn price_after(document: &Html, anchor: &ElementRef) -> Option<u64> {
    let anchor_id = anchor.id();
    let mut texts = document
        .root_element()
        .descendants()
        .skip_while(|n| n.id() != anchor_id)
        .skip(1)
        .take(FORWARD_SCAN_NODES)
        .filter_map(|n| n.value().as_text().map(|t| t.trim().to_string()))
        .filter(|t| !t.is_empty());

    let start = texts.find(|t| t.starts_with('$'))?;
    let mut buf = start;
    for next in texts.by_ref().take(3) {
        if buf.chars().any(|c| c.is_ascii_digit()) {
            break;
        }
        buf.push(' ');
        buf.push_str(&next);
    }
    parse_price_opt(&buf)
}
