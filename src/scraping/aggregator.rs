//! Multi-source aggregation
//!
//! One task per resolved source runs on a `JoinSet`, bounded by a semaphore
//! sized to the source count (minimum 2). Results are merged as tasks
//! finish; a failing, blocked, or panicking source only contributes an
//! entry to `errors`. The merged listings go through an order-independent
//! dedupe and price sort, so the final order never depends on which source
//! answered first.

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::dedup::dedupe_canonical;
use super::registry::SourceRegistry;
use crate::types::{AggregatedResult, Listing, SourceOutcome};

/// Minimum worker slots regardless of source count
const MIN_WORKERS: usize = 2;

/// Fans a query out to registered sources and merges the results
#[derive(Clone)]
pub struct Aggregator {
    registry: Arc<SourceRegistry>,
}

impl Aggregator {
    pub fn new(registry: Arc<SourceRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Search `sources` (all registered sources when `None`) for `query`.
    ///
    /// Unknown source keys are ignored. An empty query dispatches nothing.
    pub async fn aggregate(
        &self,
        query: &str,
        sources: Option<&[String]>,
        max_items: usize,
    ) -> AggregatedResult {
        let query = query.trim();
        if query.is_empty() {
            return AggregatedResult::empty(query);
        }

        let adapters = self.registry.resolve(sources);
        if adapters.is_empty() {
            tracing::debug!("No sources resolved for \"{}\"", query);
            return AggregatedResult::empty(query);
        }

        let start = Instant::now();
        let sources_queried: Vec<String> = adapters.iter().map(|a| a.label().to_string()).collect();
        let semaphore = Arc::new(Semaphore::new(adapters.len().max(MIN_WORKERS)));

        let mut tasks = JoinSet::new();
        for adapter in adapters {
            let semaphore = semaphore.clone();
            let query = query.to_string();
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let label = adapter.label().to_string();
                let outcome = AssertUnwindSafe(adapter.run(&query, max_items))
                    .catch_unwind()
                    .await;
                (label, outcome)
            });
        }

        let mut merged: Vec<Listing> = Vec::new();
        let mut errors: Vec<String> = Vec::new();

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((label, Ok(outcome))) => merge(&label, outcome, &mut merged, &mut errors),
                Ok((label, Err(_))) => {
                    tracing::error!("{}: source task panicked", label);
                    errors.push(format!("{}: source task panicked", label));
                }
                Err(e) => {
                    tracing::error!("Source task failed to complete: {}", e);
                    errors.push(format!("source task failed: {}", e));
                }
            }
        }

        let listings = dedupe_canonical(merged);
        let best_item = listings.first().cloned();

        tracing::info!(
            "\"{}\": {} listings from {} sources ({} errors) in {:?}",
            query,
            listings.len(),
            sources_queried.len(),
            errors.len(),
            start.elapsed()
        );

        AggregatedResult {
            listings,
            errors,
            query: query.to_string(),
            sources_queried,
            best_item,
        }
    }
}

fn merge(label: &str, outcome: SourceOutcome, listings: &mut Vec<Listing>, errors: &mut Vec<String>) {
    if let Some(err) = outcome.error {
        errors.push(format!("{}: {}", label, err));
    }
    listings.extend(outcome.listings.into_iter().map(|l| l.with_source(label)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraping::adapter::SourceAdapter;
    use crate::types::SourceError;
    use async_trait::async_trait;
    use std::time::Duration;

    /// Adapter returning a fixed outcome after a delay
    struct Fixed {
        key: &'static str,
        label: &'static str,
        delay_ms: u64,
        outcome: SourceOutcome,
    }

    #[async_trait]
    impl SourceAdapter for Fixed {
        fn key(&self) -> &str {
            self.key
        }
        fn label(&self) -> &str {
            self.label
        }
        async fn run(&self, _query: &str, _max_items: usize) -> SourceOutcome {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
            self.outcome.clone()
        }
    }

    struct Panicking;

    #[async_trait]
    impl SourceAdapter for Panicking {
        fn key(&self) -> &str {
            "boom"
        }
        fn label(&self) -> &str {
            "Boom"
        }
        async fn run(&self, _query: &str, _max_items: usize) -> SourceOutcome {
            panic!("adapter bug");
        }
    }

    fn listing(title: &str, link: &str, price: u64) -> Listing {
        Listing::new(title, link, price, None, "raw")
    }

    fn aggregator(adapters: Vec<Arc<dyn SourceAdapter>>) -> Aggregator {
        let registry = SourceRegistry::empty();
        for adapter in adapters {
            registry.register(adapter);
        }
        Aggregator::new(Arc::new(registry))
    }

    fn fixed(key: &'static str, label: &'static str, delay_ms: u64, outcome: SourceOutcome) -> Arc<dyn SourceAdapter> {
        Arc::new(Fixed {
            key,
            label,
            delay_ms,
            outcome,
        })
    }

    #[tokio::test]
    async fn test_empty_query_dispatches_nothing() {
        let agg = aggregator(vec![fixed("a", "A", 0, SourceOutcome::empty())]);
        let result = agg.aggregate("  ", None, 10).await;
        assert!(result.sources_queried.is_empty());
        assert!(result.listings.is_empty());
        assert!(result.best_item.is_none());
    }

    #[tokio::test]
    async fn test_merges_sorts_and_labels() {
        let agg = aggregator(vec![
            fixed(
                "slow",
                "Slow",
                30,
                SourceOutcome::ok(vec![listing("Phone 1", "https://a.test/1", 100_000)]),
            ),
            fixed(
                "fast",
                "Fast",
                0,
                SourceOutcome::ok(vec![
                    listing("Phone 2", "https://b.test/2", 50_000),
                    listing("Phone 3", "https://b.test/3", 75_000),
                ]),
            ),
        ]);

        let result = agg.aggregate("iphone 13", None, 10).await;
        let prices: Vec<u64> = result.listings.iter().map(|l| l.price).collect();
        assert_eq!(prices, [50_000, 75_000, 100_000]);
        assert_eq!(result.best_item.as_ref().map(|l| l.price), Some(50_000));
        assert_eq!(result.listings[0].source, "Fast");
        assert_eq!(result.listings[2].source, "Slow");
        assert_eq!(result.sources_queried, ["Slow", "Fast"]);
        assert!(result.errors.is_empty());
    }

    #[tokio::test]
    async fn test_blocked_source_is_isolated() {
        let agg = aggregator(vec![
            fixed(
                "blocked",
                "Blocked",
                0,
                SourceOutcome::failed(SourceError::Blocked {
                    phrase: "captcha".to_string(),
                }),
            ),
            fixed(
                "good",
                "Good",
                10,
                SourceOutcome::ok(vec![
                    listing("Phone A", "https://g.test/a", 2),
                    listing("Phone B", "https://g.test/b", 1),
                ]),
            ),
        ]);

        let result = agg.aggregate("phone", None, 10).await;
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].starts_with("Blocked: "));
        assert_eq!(result.listings.len(), 2);
        assert!(result.listings.iter().all(|l| l.source == "Good"));
    }

    #[tokio::test]
    async fn test_panicking_source_is_contained() {
        let agg = aggregator(vec![
            Arc::new(Panicking),
            fixed(
                "ok",
                "Ok",
                0,
                SourceOutcome::ok(vec![listing("Phone", "https://o.test/1", 10)]),
            ),
        ]);

        let result = agg.aggregate("phone", None, 10).await;
        assert_eq!(result.listings.len(), 1);
        assert_eq!(result.errors, ["Boom: source task panicked"]);
    }

    #[tokio::test]
    async fn test_unknown_keys_are_ignored() {
        let agg = aggregator(vec![fixed(
            "a",
            "A",
            0,
            SourceOutcome::ok(vec![listing("Phone", "https://a.test/1", 10)]),
        )]);

        let keys = vec!["a".to_string(), "missing".to_string()];
        let result = agg.aggregate("phone", Some(&keys), 10).await;
        assert_eq!(result.sources_queried, ["A"]);
        assert!(result.errors.is_empty());

        let none = agg.aggregate("phone", Some(&["missing".to_string()]), 10).await;
        assert!(none.sources_queried.is_empty());
        assert!(none.errors.is_empty());
    }

    #[tokio::test]
    async fn test_order_independent_of_completion() {
        let a = SourceOutcome::ok(vec![listing("Same", "https://x.test/1", 100)]);
        let b = SourceOutcome::ok(vec![
            listing("Same", "https://x.test/1", 100),
            listing("Other", "https://x.test/2", 100),
        ]);

        let first = aggregator(vec![fixed("a", "A", 0, a.clone()), fixed("b", "B", 20, b.clone())])
            .aggregate("q", None, 10)
            .await;
        let second = aggregator(vec![fixed("a", "A", 20, a), fixed("b", "B", 0, b)])
            .aggregate("q", None, 10)
            .await;

        assert_eq!(first.listings, second.listings);
        assert_eq!(first.listings.len(), 2);
    }
}
