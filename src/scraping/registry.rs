//! Source registry
//!
//! Maps source keys to adapters in registration order. Built-in sources are
//! registered lazily on first use, exactly once, and only if nothing was
//! registered explicitly before that.

use parking_lot::RwLock;
use std::sync::{Arc, OnceLock};

use super::adapter::SourceAdapter;
use super::fetcher::{FetchEngine, SessionFactory};
use super::sources;
use crate::config::ScrapingConfig;
use crate::types::SourceInfo;

type DefaultsFn = Box<dyn Fn() -> Vec<Arc<dyn SourceAdapter>> + Send + Sync>;

#[derive(Default)]
struct Entries {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    seeded: bool,
}

/// Registered sources, keyed by [`SourceAdapter::key`]
pub struct SourceRegistry {
    entries: RwLock<Entries>,
    defaults: Option<DefaultsFn>,
}

impl SourceRegistry {
    /// Registry with no built-in sources
    pub fn empty() -> Self {
        Self {
            entries: RwLock::new(Entries::default()),
            defaults: None,
        }
    }

    /// Registry that lazily installs the built-in sources
    pub fn new(config: ScrapingConfig, sessions: Arc<dyn SessionFactory>) -> Self {
        Self::with_defaults(move || {
            sources::builtin(&config, sessions.clone())
                .into_iter()
                .map(|a| Arc::new(a) as Arc<dyn SourceAdapter>)
                .collect()
        })
    }

    /// Registry that lazily installs whatever `defaults` returns
    pub fn with_defaults<F>(defaults: F) -> Self
    where
        F: Fn() -> Vec<Arc<dyn SourceAdapter>> + Send + Sync + 'static,
    {
        Self {
            entries: RwLock::new(Entries::default()),
            defaults: Some(Box::new(defaults)),
        }
    }

    /// Process-wide registry with default configuration and transport
    pub fn global() -> &'static SourceRegistry {
        static GLOBAL: OnceLock<SourceRegistry> = OnceLock::new();
        GLOBAL.get_or_init(|| {
            let config = ScrapingConfig::default();
            let engine = FetchEngine::new(config.fetch_config());
            SourceRegistry::new(config, Arc::new(engine))
        })
    }

    /// Install the default sources if this is the first use.
    ///
    /// Safe under concurrent first use: the check and the install happen
    /// under one write lock.
    pub fn ensure_defaults(&self) {
        if self.entries.read().seeded {
            return;
        }

        let mut entries = self.entries.write();
        if entries.seeded {
            return;
        }
        entries.seeded = true;

        if !entries.adapters.is_empty() {
            return;
        }
        if let Some(defaults) = &self.defaults {
            entries.adapters = defaults();
            tracing::debug!("Registered {} default sources", entries.adapters.len());
        }
    }

    /// Register an adapter, replacing any existing one with the same key in place
    pub fn register(&self, adapter: Arc<dyn SourceAdapter>) {
        let mut entries = self.entries.write();
        match entries.adapters.iter().position(|a| a.key() == adapter.key()) {
            Some(idx) => entries.adapters[idx] = adapter,
            None => entries.adapters.push(adapter),
        }
    }

    pub fn get(&self, key: &str) -> Option<Arc<dyn SourceAdapter>> {
        self.ensure_defaults();
        self.entries
            .read()
            .adapters
            .iter()
            .find(|a| a.key() == key)
            .cloned()
    }

    /// `{key, label}` of every source, in registration order
    pub fn list(&self) -> Vec<SourceInfo> {
        self.ensure_defaults();
        self.entries
            .read()
            .adapters
            .iter()
            .map(|a| SourceInfo {
                key: a.key().to_string(),
                label: a.label().to_string(),
            })
            .collect()
    }

    /// Adapters for `keys` (all sources when `None` or empty).
    ///
    /// Unknown keys are skipped and duplicates collapse; order follows
    /// registration order.
    pub fn resolve(&self, keys: Option<&[String]>) -> Vec<Arc<dyn SourceAdapter>> {
        self.ensure_defaults();
        let entries = self.entries.read();

        let Some(keys) = keys.filter(|k| !k.is_empty()) else {
            return entries.adapters.clone();
        };

        for key in keys {
            if !entries.adapters.iter().any(|a| a.key() == key) {
                tracing::debug!("Ignoring unknown source key '{}'", key);
            }
        }
        entries
            .adapters
            .iter()
            .filter(|a| keys.iter().any(|k| k == a.key()))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.ensure_defaults();
        self.entries.read().adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SourceOutcome;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Named(&'static str, &'static str);

    #[async_trait]
    impl SourceAdapter for Named {
        fn key(&self) -> &str {
            self.0
        }
        fn label(&self) -> &str {
            self.1
        }
        async fn run(&self, _query: &str, _max_items: usize) -> SourceOutcome {
            SourceOutcome::empty()
        }
    }

    fn defaults() -> Vec<Arc<dyn SourceAdapter>> {
        vec![Arc::new(Named("a", "Alpha")), Arc::new(Named("b", "Beta"))]
    }

    #[test]
    fn test_lazy_defaults_in_order() {
        let registry = SourceRegistry::with_defaults(defaults);
        let keys: Vec<String> = registry.list().into_iter().map(|s| s.key).collect();
        assert_eq!(keys, ["a", "b"]);
    }

    #[test]
    fn test_explicit_registration_suppresses_defaults() {
        let registry = SourceRegistry::with_defaults(defaults);
        registry.register(Arc::new(Named("c", "Gamma")));
        assert_eq!(registry.len(), 1);
        assert!(registry.get("a").is_none());
    }

    #[test]
    fn test_register_replaces_in_place() {
        let registry = SourceRegistry::with_defaults(defaults);
        registry.ensure_defaults();
        registry.register(Arc::new(Named("a", "Alpha v2")));
        registry.register(Arc::new(Named("z", "Zeta")));

        let list = registry.list();
        assert_eq!(list.len(), 3);
        assert_eq!(list[0].label, "Alpha v2");
        assert_eq!(list[2].key, "z");
    }

    #[test]
    fn test_resolve_drops_unknown_keys() {
        let registry = SourceRegistry::with_defaults(defaults);
        let keys = vec!["b".to_string(), "nope".to_string(), "b".to_string()];
        let resolved = registry.resolve(Some(&keys));
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].key(), "b");

        assert_eq!(registry.resolve(None).len(), 2);
        assert_eq!(registry.resolve(Some(&[])).len(), 2);
        assert!(registry.resolve(Some(&["nope".to_string()])).is_empty());
    }

    #[test]
    fn test_concurrent_first_use_seeds_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let registry = Arc::new(SourceRegistry::with_defaults(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            defaults()
        }));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || registry.list().len())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), 2);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_empty_registry() {
        let registry = SourceRegistry::empty();
        assert!(registry.is_empty());
        assert!(registry.list().is_empty());
    }

    #[test]
    fn test_global_has_builtin_sources() {
        let keys: Vec<String> = SourceRegistry::global()
            .list()
            .into_iter()
            .map(|s| s.key)
            .collect();
        assert_eq!(keys, ["mercadolibre", "amazon"]);
    }
}
