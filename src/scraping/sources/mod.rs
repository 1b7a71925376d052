//! Built-in sources

pub mod amazon;
pub mod mercadolibre;

use std::sync::Arc;
use std::time::Duration;

use crate::config::ScrapingConfig;
use crate::scraping::adapter::SiteAdapter;
use crate::scraping::fetcher::SessionFactory;
use crate::scraping::shaper::DelayRange;

/// Delay before each warm-up visit
pub const WARMUP_DELAY: DelayRange = DelayRange {
    min: Duration::from_millis(300),
    max: Duration::from_millis(900),
};

/// Built-in sources in registration order
pub fn builtin(config: &ScrapingConfig, sessions: Arc<dyn SessionFactory>) -> Vec<SiteAdapter> {
    [
        mercadolibre::adapter(config, sessions.clone()),
        amazon::adapter(config, sessions),
    ]
    .into_iter()
    .flatten()
    .collect()
}

pub(crate) fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
