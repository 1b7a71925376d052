//! Request shaping for outbound fetches
//!
//! Builds a randomized-but-plausible browser request profile per fetch:
//! user agent and referer drawn from fixed pools, locale headers, a
//! probabilistic Do-Not-Track flag, and pacing delays. Warm-up plans pick one
//! or two generic pages on the target site to visit before the real query.
//!
//! All randomness comes from a seedable `ChaCha8Rng`, so tests can pin the
//! generator and assert on the shape of what comes out.

use parking_lot::Mutex;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::time::Duration;
use url::Url;

/// Browser user agents rotated across requests
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/125.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4_1 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4.1 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (Windows NT 10.0; rv:124.0) Gecko/20100101 Firefox/124.0",
];

pub const DEFAULT_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";
pub const DEFAULT_ACCEPT_LANGUAGE: &str = "es-CO,es;q=0.9,en-US;q=0.8";
pub const DEFAULT_ACCEPT_ENCODING: &str = "gzip, deflate, br";
pub const DEFAULT_DNT_PROBABILITY: f64 = 0.6;

/// Uniform delay range, inclusive on both ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    pub min: Duration,
    pub max: Duration,
}

impl DelayRange {
    pub const ZERO: Self = Self {
        min: Duration::ZERO,
        max: Duration::ZERO,
    };

    /// Build a range from milliseconds; bounds are swapped if reversed
    pub fn from_millis(min_ms: u64, max_ms: u64) -> Self {
        let (lo, hi) = if min_ms <= max_ms {
            (min_ms, max_ms)
        } else {
            (max_ms, min_ms)
        };
        Self {
            min: Duration::from_millis(lo),
            max: Duration::from_millis(hi),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.max.is_zero()
    }

    fn sample<R: Rng>(&self, rng: &mut R) -> Duration {
        let lo = self.min.as_millis() as u64;
        let hi = self.max.as_millis() as u64;
        if lo >= hi {
            return self.min;
        }
        Duration::from_millis(rng.gen_range(lo..=hi))
    }
}

/// Per-source shaping policy
#[derive(Debug, Clone)]
pub struct ShaperPolicy {
    /// Referers to rotate through
    pub referers: Vec<String>,
    pub accept_language: String,
    pub accept_encoding: String,
    /// Probability (0.0-1.0) that the DNT header is "1"
    pub dnt_probability: f64,
    /// Delay before the primary search request
    pub pre_request_delay: DelayRange,
    /// Candidate pages for warm-up visits
    pub warmup_urls: Vec<Url>,
    /// Delay before each warm-up visit
    pub warmup_delay: DelayRange,
    pub warmup_enabled: bool,
}

impl Default for ShaperPolicy {
    fn default() -> Self {
        Self {
            referers: vec!["https://www.google.com/".to_string()],
            accept_language: DEFAULT_ACCEPT_LANGUAGE.to_string(),
            accept_encoding: DEFAULT_ACCEPT_ENCODING.to_string(),
            dnt_probability: DEFAULT_DNT_PROBABILITY,
            pre_request_delay: DelayRange::ZERO,
            warmup_urls: Vec::new(),
            warmup_delay: DelayRange::ZERO,
            warmup_enabled: false,
        }
    }
}

/// Header values for one outbound request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestProfile {
    pub user_agent: String,
    pub referer: String,
    pub accept: String,
    pub accept_language: String,
    pub accept_encoding: String,
    pub dnt: bool,
}

impl RequestProfile {
    /// Header name/value pairs in the order a browser would send them
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        vec![
            ("user-agent", self.user_agent.clone()),
            ("accept", self.accept.clone()),
            ("accept-language", self.accept_language.clone()),
            ("accept-encoding", self.accept_encoding.clone()),
            ("referer", self.referer.clone()),
            ("dnt", if self.dnt { "1" } else { "0" }.to_string()),
        ]
    }
}

/// One warm-up visit: wait `delay`, then GET `url`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarmupStep {
    pub url: Url,
    pub delay: Duration,
}

/// Randomized request shaper for a single source
pub struct RequestShaper {
    policy: ShaperPolicy,
    rng: Mutex<ChaCha8Rng>,
}

impl RequestShaper {
    /// Create a shaper seeded from OS entropy
    pub fn new(policy: ShaperPolicy) -> Self {
        Self {
            policy,
            rng: Mutex::new(ChaCha8Rng::from_entropy()),
        }
    }

    /// Create a shaper with a fixed seed (reproducible output)
    pub fn with_seed(policy: ShaperPolicy, seed: u64) -> Self {
        Self {
            policy,
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
        }
    }

    pub fn policy(&self) -> &ShaperPolicy {
        &self.policy
    }

    /// Draw a fresh request profile
    pub fn profile(&self) -> RequestProfile {
        let mut rng = self.rng.lock();

        let user_agent = USER_AGENTS
            .choose(&mut *rng)
            .copied()
            .unwrap_or(USER_AGENTS[0])
            .to_string();

        let referer = self
            .policy
            .referers
            .choose(&mut *rng)
            .cloned()
            .unwrap_or_default();

        let dnt = rng.gen_bool(self.policy.dnt_probability.clamp(0.0, 1.0));

        RequestProfile {
            user_agent,
            referer,
            accept: DEFAULT_ACCEPT.to_string(),
            accept_language: self.policy.accept_language.clone(),
            accept_encoding: self.policy.accept_encoding.clone(),
            dnt,
        }
    }

    /// Delay to apply before the primary request
    pub fn pre_request_delay(&self) -> Duration {
        let mut rng = self.rng.lock();
        self.policy.pre_request_delay.sample(&mut *rng)
    }

    /// Pick one or two warm-up pages, each with its own delay.
    ///
    /// Empty when warm-up is disabled or no candidate pages are configured.
    pub fn warmup_plan(&self) -> Vec<WarmupStep> {
        if !self.policy.warmup_enabled || self.policy.warmup_urls.is_empty() {
            return Vec::new();
        }

        let mut rng = self.rng.lock();
        let max_steps = self.policy.warmup_urls.len().min(2);
        let steps = rng.gen_range(1..=max_steps);

        let pages: Vec<Url> = self
            .policy
            .warmup_urls
            .choose_multiple(&mut *rng, steps)
            .cloned()
            .collect();

        pages
            .into_iter()
            .map(|url| WarmupStep {
                url,
                delay: self.policy.warmup_delay.sample(&mut *rng),
            })
            .collect()
    }
}
