//! Listing deduplication
//!
//! Listings collapse on a composite key of `(link, price, title prefix)`.
//! The first occurrence wins; survivors are then sorted ascending by price
//! with a stable sort so ties keep their first-seen order.

use std::collections::HashSet;

use crate::types::Listing;
use crate::util::char_prefix;

/// Number of title characters that participate in the dedupe key
pub const TITLE_KEY_CHARS: usize = 40;

/// Composite dedupe key for a listing
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListingKey {
    link: String,
    price: u64,
    title_prefix: String,
}

impl ListingKey {
    pub fn of(listing: &Listing) -> Self {
        Self {
            link: listing.link.clone(),
            price: listing.price,
            title_prefix: char_prefix(&listing.title, TITLE_KEY_CHARS).to_string(),
        }
    }
}

/// Listing deduplicator keyed on [`ListingKey`]
#[derive(Debug, Default)]
pub struct ListingDeduplicator {
    seen: HashSet<ListingKey>,
}

impl ListingDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true the first time a key is offered
    pub fn is_new(&mut self, listing: &Listing) -> bool {
        self.seen.insert(ListingKey::of(listing))
    }
}

/// Dedupe (first occurrence wins), cap at `limit`, then sort by price.
pub fn dedupe_and_sort(listings: Vec<Listing>, limit: usize) -> Vec<Listing> {
    let mut dedup = ListingDeduplicator::new();
    let mut kept: Vec<Listing> = listings
        .into_iter()
        .filter(|l| dedup.is_new(l))
        .take(limit)
        .collect();

    sort_by_price(&mut kept);
    kept
}

/// Stable ascending sort by price
pub fn sort_by_price(listings: &mut [Listing]) {
    listings.sort_by_key(|l| l.price);
}

/// Order-independent dedupe for merged multi-source results.
///
/// Listings are first put in a total order (price, then link, title, source,
/// thumbnail) so that both the surviving duplicate and the position of
/// equal-priced listings do not depend on the order they arrived in.
pub fn dedupe_canonical(mut listings: Vec<Listing>) -> Vec<Listing> {
    listings.sort_by(|a, b| {
        a.price
            .cmp(&b.price)
            .then_with(|| a.link.cmp(&b.link))
            .then_with(|| a.title.cmp(&b.title))
            .then_with(|| a.source.cmp(&b.source))
            .then_with(|| a.thumbnail.cmp(&b.thumbnail))
    });

    let mut dedup = ListingDeduplicator::new();
    listings.retain(|l| dedup.is_new(l));
    listings
}
