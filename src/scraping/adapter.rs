//! Source adapters: one site's fetch-and-extract pipeline
//!
//! An adapter never fails outward. Every problem (transport, parse, block
//! page) is folded into the returned [`SourceOutcome`] so a misbehaving site
//! cannot take its siblings down with it.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

use super::dedup::dedupe_and_sort;
use super::extractor::{ExtractError, ExtractionChain, SiteProfile};
use super::fetcher::{decode_body, FetchError, HttpSession, SessionFactory};
use super::query::Query;
use super::shaper::{RequestShaper, ShaperPolicy};
use crate::types::{SourceError, SourceOutcome};

/// A searchable source
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Stable lookup key (e.g. `mercadolibre`)
    fn key(&self) -> &str;

    /// Human-readable label attached to listings and errors
    fn label(&self) -> &str;

    /// Search for `query`, returning at most `max_items` listings
    async fn run(&self, query: &str, max_items: usize) -> SourceOutcome;
}

/// Builds a site's search-results URL for a query
pub type SearchUrlFn = fn(&Query) -> Option<Url>;

/// Adapter for a site described by a [`SiteProfile`]
pub struct SiteAdapter {
    key: String,
    chain: Arc<ExtractionChain>,
    shaper: RequestShaper,
    sessions: Arc<dyn SessionFactory>,
    search_url: SearchUrlFn,
    pacing: bool,
}

impl SiteAdapter {
    pub fn new(
        key: impl Into<String>,
        profile: SiteProfile,
        policy: ShaperPolicy,
        search_url: SearchUrlFn,
        sessions: Arc<dyn SessionFactory>,
    ) -> Self {
        Self {
            key: key.into(),
            chain: Arc::new(ExtractionChain::new(profile)),
            shaper: RequestShaper::new(policy),
            sessions,
            search_url,
            pacing: true,
        }
    }

    /// Replace the request shaper (e.g. with a seeded one)
    pub fn with_shaper(mut self, shaper: RequestShaper) -> Self {
        self.shaper = shaper;
        self
    }

    /// Enable or disable the randomized sleeps before requests
    pub fn with_pacing(mut self, pacing: bool) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn shaper(&self) -> &RequestShaper {
        &self.shaper
    }

    pub fn search_url(&self, query: &Query) -> Option<Url> {
        (self.search_url)(query)
    }

    async fn pause(&self, delay: Duration) {
        if self.pacing && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    /// Best-effort warm-up visits; failures are logged and ignored
    async fn warm_up(&self, session: &dyn HttpSession) {
        for step in self.shaper.warmup_plan() {
            self.pause(step.delay).await;
            match session.get(&step.url).await {
                Ok(page) => tracing::debug!(
                    "{}: warm-up {} -> {}",
                    self.label(),
                    step.url,
                    page.status_code
                ),
                Err(e) => tracing::debug!("{}: warm-up {} failed: {}", self.label(), step.url, e),
            }
        }
    }

    fn transport_failure(&self, err: FetchError) -> SourceOutcome {
        tracing::warn!("{}: request failed: {}", self.label(), err);
        SourceOutcome::failed(SourceError::Transport(err.to_string()))
    }
}

#[async_trait]
impl SourceAdapter for SiteAdapter {
    fn key(&self) -> &str {
        &self.key
    }

    fn label(&self) -> &str {
        self.chain.site().label()
    }

    async fn run(&self, query: &str, max_items: usize) -> SourceOutcome {
        let Some(query) = Query::new(query) else {
            return SourceOutcome::empty();
        };
        let Some(url) = self.search_url(&query) else {
            return self.transport_failure(FetchError::InvalidUrl(query.to_string()));
        };

        let start = Instant::now();
        self.pause(self.shaper.pre_request_delay()).await;

        let session = match self.sessions.open(&self.shaper.profile()) {
            Ok(session) => session,
            Err(e) => return self.transport_failure(e),
        };

        self.warm_up(session.as_ref()).await;

        let response = match session.get(&url).await {
            Ok(response) => response,
            Err(e) => return self.transport_failure(e),
        };
        tracing::debug!(
            "{}: {} {} ({}, {} bytes) in {:?}",
            self.label(),
            response.status_code,
            response.final_url,
            response.content_type,
            response.body.len(),
            response.fetch_duration
        );

        // Parsing and the strategy walk are CPU-bound; keep them off the runtime workers.
        let chain = Arc::clone(&self.chain);
        let extraction = tokio::task::spawn_blocking(move || {
            let body = decode_body(&response);
            chain.extract(&body, max_items)
        })
        .await;

        let extraction = match extraction {
            Ok(Ok(extraction)) => extraction,
            Ok(Err(ExtractError::Blocked { phrase })) => {
                return SourceOutcome::failed(SourceError::Blocked { phrase });
            }
            Ok(Err(ExtractError::Parse(e))) => {
                tracing::warn!("{}: {}", self.label(), e);
                return SourceOutcome::failed(SourceError::Parse(e));
            }
            Err(e) => {
                tracing::warn!("{}: extraction task failed: {}", self.label(), e);
                return SourceOutcome::failed(SourceError::Parse(format!(
                    "extraction task failed: {}",
                    e
                )));
            }
        };

        let listings = dedupe_and_sort(extraction.listings, max_items);
        tracing::info!(
            "{}: {} listings for \"{}\" via {} in {:?}",
            self.label(),
            listings.len(),
            query,
            extraction.strategy.map(|s| s.as_str()).unwrap_or("none"),
            start.elapsed()
        );
        SourceOutcome::ok(listings)
    }
}
