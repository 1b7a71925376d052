//! Anti-automation interstitial detection

use scraper::Html;

use super::text::visible_text;

/// Lowercase phrases that only appear on block/challenge pages
pub const BLOCK_PHRASES: &[&str] = &[
    "captcha",
    "robot check",
    "are you a robot",
    "not a robot",
    "access denied",
    "unusual traffic",
    "verify you are human",
    "enter the characters you see below",
    "no soy un robot",
    "no eres un robot",
    "acceso denegado",
    "tráfico inusual",
    "verifica que eres humano",
    "confirma que eres humano",
];

/// The first block phrase found in the document's visible text
pub fn detect_block(document: &Html) -> Option<&'static str> {
    let text = visible_text(document);
    BLOCK_PHRASES
        .iter()
        .copied()
        .find(|phrase| text.contains(phrase))
}
