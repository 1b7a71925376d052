//! Search query normalization

use std::fmt;

/// A validated, non-empty product search query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    text: String,
}

impl Query {
    /// Build a query from free text. Returns `None` for empty or
    /// whitespace-only input.
    pub fn new(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self {
            text: trimmed.to_string(),
        })
    }

    /// The trimmed query text
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// URL-path-safe slug of the query
    pub fn slug(&self) -> String {
        slugify(&self.text)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Turn free text into a URL-safe slug.
///
/// - Lowercases ASCII letters
/// - Maps whitespace to `-`
/// - Strips everything that is not `[a-z0-9-]`
/// - Collapses runs of `-` and trims leading/trailing `-`
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_hyphen = false;

    for ch in text.chars() {
        let ch = if ch.is_whitespace() { '-' } else { ch.to_ascii_lowercase() };

        if ch == '-' {
            pending_hyphen = true;
        } else if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(ch);
        }
    }

    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_well_formed(slug: &str) -> bool {
        !slug.starts_with('-')
            && !slug.ends_with('-')
            && !slug.contains("--")
            && slug
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    }

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("iphone 13"), "iphone-13");
        assert_eq!(slugify("  Samsung   Galaxy S23 "), "samsung-galaxy-s23");
        assert_eq!(slugify("PS5 - Digital!!"), "ps5-digital");
        assert_eq!(slugify("--already-slugged--"), "already-slugged");
    }

    #[test]
    fn test_slugify_strips_non_ascii() {
        assert_eq!(slugify("cañón portátil"), "caon-porttil");
        assert_eq!(slugify("¿?¡!"), "");
    }

    #[test]
    fn test_slugify_idempotent_and_well_formed() {
        let inputs = [
            "iphone 13",
            "  Apple  iPhone 13 Pro Max (256GB) ",
            "a - - b",
            "---",
            "Xiaomi_Redmi.Note#12",
            "tab\tseparated\nlines",
            "",
        ];
        for input in inputs {
            let once = slugify(input);
            assert_eq!(slugify(&once), once, "not idempotent for {:?}", input);
            assert!(is_well_formed(&once), "malformed slug {:?}", once);
        }
    }

    #[test]
    fn test_query_rejects_empty() {
        assert!(Query::new("").is_none());
        assert!(Query::new("   \n").is_none());
        let q = Query::new("  iphone 13 ").unwrap();
        assert_eq!(q.as_str(), "iphone 13");
        assert_eq!(q.slug(), "iphone-13");
    }
}
