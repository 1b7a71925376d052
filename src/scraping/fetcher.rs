//! Fetch engine for source searches
//!
//! A fetch goes through a short-lived *session*: one `reqwest::Client` with a
//! cookie store and the shaped request headers baked in, so warm-up visits
//! and the real search share connection and cookie state the way a browser
//! tab would. Sessions come from a [`SessionFactory`], which is the seam
//! tests use to substitute canned responses.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::io::Read;
use std::time::{Duration, Instant};
use thiserror::Error;
use url::Url;

use super::shaper::RequestProfile;

/// Errors that can occur during fetching
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("Timeout after {0:?}")]
    Timeout(Duration),
    #[error("Content too large: {0} bytes")]
    ContentTooLarge(usize),
    #[error("Failed to parse URL: {0}")]
    InvalidUrl(String),
    #[error("Invalid header {0}")]
    InvalidHeader(String),
}

/// Result of a successful fetch
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// The fetched URL (may differ from request due to redirects)
    pub final_url: Url,
    /// HTTP status code
    pub status_code: u16,
    /// Response headers
    pub headers: Vec<(String, String)>,
    /// Raw response body
    pub body: Vec<u8>,
    /// Content type
    pub content_type: String,
    /// Time taken to fetch
    pub fetch_duration: Duration,
}

impl FetchResult {
    /// Get a header value
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Declared content encoding, lowercased
    pub fn content_encoding(&self) -> Option<String> {
        self.header("content-encoding")
            .map(|v| v.trim().to_ascii_lowercase())
            .filter(|v| !v.is_empty())
    }
}

/// Configuration for the fetch engine
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Per-request timeout
    pub timeout: Duration,
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Maximum response size (bytes)
    pub max_content_size: usize,
    /// Maximum redirects to follow
    pub max_redirects: usize,
    /// Idle connections kept per host
    pub pool_max_idle_per_host: usize,
    /// Total attempts when the connection itself cannot be established
    pub max_retries: u32,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            connect_timeout: Duration::from_secs(10),
            max_content_size: 10 * 1024 * 1024, // 10 MB
            max_redirects: 10,
            pool_max_idle_per_host: 30,
            max_retries: 3,
        }
    }
}

/// A browsing session that can issue GET requests
#[async_trait]
pub trait HttpSession: Send + Sync {
    async fn get(&self, url: &Url) -> Result<FetchResult, FetchError>;
}

/// Opens sessions configured with a shaped request profile
pub trait SessionFactory: Send + Sync {
    fn open(&self, profile: &RequestProfile) -> Result<Box<dyn HttpSession>, FetchError>;
}

/// `reqwest`-backed session factory
#[derive(Debug, Clone, Default)]
pub struct FetchEngine {
    config: FetchConfig,
}

impl FetchEngine {
    pub fn new(config: FetchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn default_headers(profile: &RequestProfile) -> Result<HeaderMap, FetchError> {
        let mut headers = HeaderMap::new();
        for (name, value) in profile.headers() {
            let value = HeaderValue::from_str(&value)
                .map_err(|_| FetchError::InvalidHeader(name.to_string()))?;
            headers.insert(HeaderName::from_static(name), value);
        }
        Ok(headers)
    }
}

impl SessionFactory for FetchEngine {
    fn open(&self, profile: &RequestProfile) -> Result<Box<dyn HttpSession>, FetchError> {
        let client = reqwest::Client::builder()
            .default_headers(Self::default_headers(profile)?)
            .cookie_store(true)
            .pool_max_idle_per_host(self.config.pool_max_idle_per_host)
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(self.config.timeout)
            .connect_timeout(self.config.connect_timeout)
            .redirect(reqwest::redirect::Policy::limited(self.config.max_redirects))
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()?;

        Ok(Box::new(ReqwestSession {
            client,
            config: self.config.clone(),
        }))
    }
}

/// How a failed send is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SendFailure {
    /// Connection could not be established; try again
    Retry,
    /// A timeout fired; carries the limit that was exceeded
    TimedOut(Duration),
    /// Give up with the underlying error
    Fatal,
}

/// Classify a send error on attempt `attempt` (1-based).
///
/// Connect failures, including connect timeouts, are retried until the
/// attempts run out. Timeouts after the connection is up are not retried.
fn classify_send_error(
    is_connect: bool,
    is_timeout: bool,
    attempt: u32,
    config: &FetchConfig,
) -> SendFailure {
    let attempts = config.max_retries.max(1);
    match (is_connect, is_timeout) {
        (true, _) if attempt < attempts => SendFailure::Retry,
        (true, true) => SendFailure::TimedOut(config.connect_timeout),
        (false, true) => SendFailure::TimedOut(config.timeout),
        _ => SendFailure::Fatal,
    }
}

/// Session over a single `reqwest::Client`
pub struct ReqwestSession {
    client: reqwest::Client,
    config: FetchConfig,
}

impl ReqwestSession {
    /// Send with bounded retries on connection establishment failures only
    async fn send_with_retry(&self, url: &Url) -> Result<reqwest::Response, FetchError> {
        let mut attempt = 1;

        loop {
            let e = match self.client.get(url.as_str()).send().await {
                Ok(response) => return Ok(response),
                Err(e) => e,
            };
            match classify_send_error(e.is_connect(), e.is_timeout(), attempt, &self.config) {
                SendFailure::Retry => {
                    tracing::debug!(
                        "Connection to {} failed (attempt {}/{}): {}",
                        url,
                        attempt,
                        self.config.max_retries.max(1),
                        e
                    );
                    attempt += 1;
                }
                SendFailure::TimedOut(limit) => return Err(FetchError::Timeout(limit)),
                SendFailure::Fatal => return Err(FetchError::Http(e)),
            }
        }
    }
}

#[async_trait]
impl HttpSession for ReqwestSession {
    async fn get(&self, url: &Url) -> Result<FetchResult, FetchError> {
        let start = Instant::now();

        let response = self.send_with_retry(url).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let final_url = response.url().clone();

        // Extract headers
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or_default().to_string()))
            .collect();

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("text/html")
            .to_string();

        // Check content length
        if let Some(len) = response.content_length() {
            if len as usize > self.config.max_content_size {
                return Err(FetchError::ContentTooLarge(len as usize));
            }
        }

        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(self.config.timeout)
            } else {
                FetchError::Http(e)
            }
        })?;

        if body.len() > self.config.max_content_size {
            return Err(FetchError::ContentTooLarge(body.len()));
        }

        Ok(FetchResult {
            final_url,
            status_code: status.as_u16(),
            headers,
            body: body.to_vec(),
            content_type,
            fetch_duration: start.elapsed(),
        })
    }
}

/// Decode a response body to text.
///
/// Bodies still marked `Content-Encoding: br` (the client passes some through
/// untouched) are brotli-decompressed here. If decompression fails the raw
/// bytes are decoded instead; invalid UTF-8 is replaced rather than rejected.
pub fn decode_body(result: &FetchResult) -> String {
    if result.content_encoding().as_deref() == Some("br") {
        match decompress_brotli(&result.body) {
            Ok(bytes) => return String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                tracing::debug!(
                    "Brotli decode failed for {}, using raw bytes: {}",
                    result.final_url,
                    e
                );
            }
        }
    }

    String::from_utf8_lossy(&result.body).into_owned()
}

fn decompress_brotli(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len() * 4);
    brotli::Decompressor::new(data, 4096).read_to_end(&mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn result_with(body: Vec<u8>, encoding: Option<&str>) -> FetchResult {
        let mut headers = vec![("content-type".to_string(), "text/html".to_string())];
        if let Some(enc) = encoding {
            headers.push(("Content-Encoding".to_string(), enc.to_string()));
        }
        FetchResult {
            final_url: Url::parse("https://shop.test/s?k=phone").unwrap(),
            status_code: 200,
            headers,
            body,
            content_type: "text/html".to_string(),
            fetch_duration: Duration::from_millis(10),
        }
    }

    fn brotli_compress(input: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        {
            let mut writer = brotli::CompressorWriter::new(&mut out, 4096, 5, 22);
            writer.write_all(input).unwrap();
        }
        out
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let result = result_with(Vec::new(), Some("BR"));
        assert_eq!(result.header("content-encoding"), Some("BR"));
        assert_eq!(result.content_encoding().as_deref(), Some("br"));
        assert!(result.header("etag").is_none());
    }

    #[test]
    fn test_decode_plain_body() {
        let result = result_with("<p>Año</p>".as_bytes().to_vec(), None);
        assert_eq!(decode_body(&result), "<p>Año</p>");
    }

    #[test]
    fn test_decode_brotli_body() {
        let html = "<html><body><p>Celular $ 1.299.900</p></body></html>";
        let result = result_with(brotli_compress(html.as_bytes()), Some("br"));
        assert_eq!(decode_body(&result), html);
    }

    #[test]
    fn test_decode_falls_back_to_raw_bytes() {
        // Already-decoded body with a stale encoding header
        let html = "<html><body>plain</body></html>";
        let result = result_with(html.as_bytes().to_vec(), Some("br"));
        assert_eq!(decode_body(&result), html);
    }

    #[test]
    fn test_decode_replaces_invalid_utf8() {
        let result = result_with(vec![b'o', b'k', 0xff, b'!'], None);
        assert_eq!(decode_body(&result), "ok\u{fffd}!");
    }

    #[test]
    fn test_connect_timeout_is_retried() {
        let config = FetchConfig::default();
        assert_eq!(classify_send_error(true, true, 1, &config), SendFailure::Retry);
        assert_eq!(classify_send_error(true, false, 2, &config), SendFailure::Retry);
        assert_eq!(
            classify_send_error(true, true, 3, &config),
            SendFailure::TimedOut(config.connect_timeout)
        );
        assert_eq!(classify_send_error(true, false, 3, &config), SendFailure::Fatal);
    }

    #[test]
    fn test_timeout_after_connect_is_not_retried() {
        let config = FetchConfig::default();
        assert_eq!(
            classify_send_error(false, true, 1, &config),
            SendFailure::TimedOut(config.timeout)
        );
        assert_eq!(classify_send_error(false, false, 1, &config), SendFailure::Fatal);
    }

    #[test]
    fn test_single_attempt_never_retries() {
        let config = FetchConfig {
            max_retries: 0,
            ..Default::default()
        };
        assert_eq!(
            classify_send_error(true, true, 1, &config),
            SendFailure::TimedOut(config.connect_timeout)
        );
    }

    #[test]
    fn test_session_factory_accepts_shaped_profile() {
        let engine = FetchEngine::default();
        let profile = RequestProfile {
            user_agent: crate::scraping::shaper::USER_AGENTS[0].to_string(),
            referer: "https://www.google.com/".to_string(),
            accept: crate::scraping::shaper::DEFAULT_ACCEPT.to_string(),
            accept_language: "es-CO".to_string(),
            accept_encoding: "gzip".to_string(),
            dnt: true,
        };
        assert!(engine.open(&profile).is_ok());
    }

    #[test]
    fn test_session_factory_rejects_bad_header() {
        let engine = FetchEngine::default();
        let profile = RequestProfile {
            user_agent: "bad\nagent".to_string(),
            referer: String::new(),
            accept: String::new(),
            accept_language: String::new(),
            accept_encoding: String::new(),
            dnt: false,
        };
        assert!(matches!(
            engine.open(&profile),
            Err(FetchError::InvalidHeader(_))
        ));
    }
}
