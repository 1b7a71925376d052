//! Configuration for pricescout

mod logging;
mod scraping;

pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use scraping::ScrapingConfig;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "pricescout.toml";

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Search pipeline configuration
    #[serde(default)]
    pub scraping: ScrapingConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load and validate configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file '{}': {}", path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to defaults
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Validate all configuration fields.
    ///
    /// Collects every problem and reports them together.
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();
        let s = &self.scraping;

        if s.max_items_per_source == 0 {
            errors.push("max_items_per_source must be positive".to_string());
        }
        if s.request_timeout_secs == 0 {
            errors.push("request_timeout_secs must be positive".to_string());
        }
        if s.connect_timeout_secs == 0 {
            errors.push("connect_timeout_secs must be positive".to_string());
        }
        if s.max_retries == 0 {
            errors.push("max_retries must be at least 1".to_string());
        }
        if s.max_content_size == 0 {
            errors.push("max_content_size must be positive".to_string());
        }
        if !(0.0..=1.0).contains(&s.dnt_probability) {
            errors.push("dnt_probability must be between 0.0 and 1.0".to_string());
        }
        if s.accept_language.trim().is_empty() {
            errors.push("accept_language must not be empty".to_string());
        }
        for (key, [min, max]) in &s.delay_ms {
            if min > max {
                errors.push(format!(
                    "delay_ms.{}: min ({}) must not exceed max ({})",
                    key, min, max
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            anyhow::bail!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            );
        }
    }

    /// Commented TOML rendering of the default configuration
    pub fn default_toml() -> String {
        let config = Self::default();
        let s = &config.scraping;
        format!(
            r#"# pricescout configuration

[scraping]
# Listings kept per source after dedupe
max_items_per_source = {}
request_timeout_secs = {}
connect_timeout_secs = {}
# Attempts when a connection cannot be established (no retry on HTTP status)
max_retries = {}
pool_max_idle_per_host = {}
max_content_size = {}
# Probability of sending "DNT: 1"
dnt_probability = {:?}
accept_language = "{}"
warmup_enabled = {}
pacing_enabled = {}

# Per-source pre-request delay overrides, [min, max] in milliseconds
[scraping.delay_ms]
# mercadolibre = [500, 1500]
# amazon = [1000, 2500]

[logging]
# text | json
format = "text"
# trace | debug | info | warn | error
level = "{}"
dependency_level = "{}"
"#,
            s.max_items_per_source,
            s.request_timeout_secs,
            s.connect_timeout_secs,
            s.max_retries,
            s.pool_max_idle_per_host,
            s.max_content_size,
            s.dnt_probability,
            s.accept_language,
            s.warmup_enabled,
            s.pacing_enabled,
            config.logging.level,
            config.logging.dependency_level,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_passes_validation() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_reports_all_errors_together() {
        let mut cfg = Config::default();
        cfg.scraping.max_items_per_source = 0;
        cfg.scraping.dnt_probability = 1.5;
        cfg.scraping.delay_ms.insert("amazon".to_string(), [900, 100]);

        let err = cfg.validate().unwrap_err().to_string();
        assert!(err.contains("max_items_per_source must be positive"), "{}", err);
        assert!(err.contains("dnt_probability must be between 0.0 and 1.0"), "{}", err);
        assert!(err.contains("delay_ms.amazon"), "{}", err);
    }

    #[test]
    fn validate_rejects_zero_retries() {
        let mut cfg = Config::default();
        cfg.scraping.max_retries = 0;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("max_retries must be at least 1"));
    }

    #[test]
    fn default_toml_round_trips() {
        let parsed: Config = toml::from_str(&Config::default_toml()).unwrap();
        assert!(parsed.validate().is_ok());
        assert_eq!(parsed.scraping.max_items_per_source, 20);
        assert_eq!(parsed.scraping.dnt_probability, 0.6);
        assert!(parsed.scraping.delay_ms.is_empty());
        assert_eq!(parsed.logging.level, LogLevel::Info);
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[scraping]\nmax_items_per_source = 3\npacing_enabled = false").unwrap();

        let cfg = Config::load(file.path()).unwrap();
        assert_eq!(cfg.scraping.max_items_per_source, 3);
        assert!(!cfg.scraping.pacing_enabled);
        assert_eq!(cfg.scraping.request_timeout_secs, 15);
    }

    #[test]
    fn load_rejects_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[scraping]\nmax_items_per_source = 0").unwrap();
        assert!(Config::load(file.path()).is_err());

        let missing = Config::load_or_default(Path::new("/nonexistent/pricescout.toml")).unwrap();
        assert_eq!(missing.scraping.max_items_per_source, 20);
    }
}
