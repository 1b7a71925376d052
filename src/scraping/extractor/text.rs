//! DOM text and attribute helpers shared by the strategies

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;

use super::types::CompiledSite;
use crate::scraping::normalize_url;
use crate::util::collapse_whitespace;

/// Elements whose text never reaches the screen
const INVISIBLE_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "head"];

/// Attributes checked for a thumbnail, lazy-load first
const IMAGE_ATTRIBUTES: &[&str] = &["data-src", "data-lazy-src", "data-srcset", "src"];

/// Currency symbol followed by a grouped or long run of digits
pub(super) fn currency_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\s?\d{1,3}(?:[.,]\d{3})+|\$\s?\d{4,}").ok())
        .as_ref()
}

pub(super) fn selector(css: &'static str) -> Option<Selector> {
    Selector::parse(css).ok()
}

/// All text under `element`, whitespace collapsed
pub(super) fn element_text(element: &ElementRef) -> String {
    collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

/// Lowercased text a user would see, excluding script/style content
pub(super) fn visible_text(document: &Html) -> String {
    let mut out = String::new();
    for node in document.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| INVISIBLE_ELEMENTS.contains(&e.name()))
        });
        if !hidden {
            out.push_str(text);
            out.push(' ');
        }
    }
    collapse_whitespace(&out).to_lowercase()
}

/// Text of the first element matching any selector, in priority order
pub(super) fn first_text(scope: &ElementRef, selectors: &[Selector]) -> Option<String> {
    selectors.iter().find_map(|sel| {
        scope
            .select(sel)
            .map(|el| element_text(&el))
            .find(|t| !t.is_empty())
    })
}

/// First non-empty attribute value among `names`
pub(super) fn first_attr<'a>(element: &ElementRef<'a>, names: &[String]) -> Option<&'a str> {
    names.iter().find_map(|name| {
        element
            .value()
            .attr(name)
            .map(str::trim)
            .filter(|v| !v.is_empty())
    })
}

/// First currency-looking substring of `text`
pub(super) fn find_currency(text: &str) -> Option<&str> {
    currency_regex()?.find(text).map(|m| m.as_str())
}

/// Resolve an anchor's href into a canonical absolute product link
pub(super) fn anchor_link(site: &CompiledSite, anchor: &ElementRef) -> Option<String> {
    let href = anchor.value().attr("href")?;
    site.resolve_link(href).map(|u| normalize_url(&u))
}

/// Thumbnail URL from the first `<img>` in `scope`, lazy-load attributes
/// before the eager `src`
pub(super) fn thumbnail_of(site: &CompiledSite, scope: &ElementRef) -> Option<String> {
    let img_sel = selector("img")?;
    scope.select(&img_sel).find_map(|img| {
        IMAGE_ATTRIBUTES.iter().find_map(|attr| {
            let raw = img.value().attr(attr)?.trim();
            // srcset: first candidate only
            let candidate = raw.split([',', ' ']).next().unwrap_or_default();
            if candidate.is_empty() || candidate.starts_with("data:") {
                return None;
            }
            site.resolve_link(candidate).map(|u| u.to_string())
        })
    })
}

/// True if one of `element`'s own class tokens carries a card class hint.
///
/// A hint matches a whole token or a `-`/`_` delimited part of one, so
/// `item` matches `grid-item` and `ui-search-result` matches
/// `ui-search-result__wrapper` but not `ui-search-results`.
pub(super) fn has_card_class(site: &CompiledSite, element: &ElementRef) -> bool {
    let hints = &site.profile.card_class_hints;
    element
        .value()
        .classes()
        .any(|token| hints.iter().any(|hint| token_has_hint(token, hint)))
}

fn token_has_hint(token: &str, hint: &str) -> bool {
    let is_delim = |c: Option<char>| c.map_or(true, |c| c == '-' || c == '_');
    !hint.is_empty()
        && token.match_indices(hint).any(|(at, _)| {
            is_delim(token[..at].chars().next_back())
                && is_delim(token[at + hint.len()..].chars().next())
        })
}
