//! HTTP client for the credential-injecting proxy.
//!
//! Every call funnels through one FIFO queue: a single request is in flight
//! at a time and a minimum gap separates one completion from the next
//! dispatch. Before each attempt the [`RateLedger`] must grant a slot.
//! Throttled (429) responses are retried with back-off and permanently widen
//! the gap for the rest of the session.

mod endpoints;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use reqwest::{Client, Url};
use tokio::sync::Mutex;
use tokio::time::Instant;

use lfdash_core::AppConfig;

use crate::error::ProxyError;
use crate::rate_limit::{default_ladder, RateLedger, RateRule};
use crate::retry::retry_with_backoff;

pub use endpoints::PageQuery;

/// Floor for the pacing gap once the proxy has throttled us.
const THROTTLED_MIN_GAP_MS: u64 = 1_000;
const MAX_GAP_MS: u64 = 10_000;

const UPSTREAM_STATUS_HEADER: &str = "x-upstream-status";
const UPSTREAM_URL_HEADER: &str = "x-upstream-url";

/// Tunables for [`ProxyClient`].
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Minimum gap between a completion and the next queued dispatch.
    pub request_gap_ms: u64,
    /// Additional attempts after a throttled response.
    pub max_retries: u32,
    pub backoff_base_ms: u64,
    pub rate_rules: Vec<RateRule>,
}

impl ClientSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            timeout_secs: config.request_timeout_secs,
            user_agent: config.user_agent.clone(),
            request_gap_ms: config.request_gap_ms,
            max_retries: config.max_retries,
            backoff_base_ms: config.retry_backoff_base_ms,
            rate_rules: default_ladder(),
        }
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: "lfdash/0.1 (visitor-intelligence)".to_owned(),
            request_gap_ms: 250,
            max_retries: 3,
            backoff_base_ms: 1_000,
            rate_rules: default_ladder(),
        }
    }
}

/// A logical request: a vendor path plus query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyRequest {
    pub path: String,
    pub query: Vec<(String, String)>,
}

impl ProxyRequest {
    #[must_use]
    pub fn new(path: &str) -> Self {
        Self {
            path: path.trim_start_matches('/').to_owned(),
            query: Vec::new(),
        }
    }

    #[must_use]
    pub fn param(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_owned(), value.into()));
        self
    }
}

/// Which path a call takes through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lane {
    /// Strict FIFO queue with pacing. The default for everything.
    Serial,
    /// Bypasses the queue but still honors the rate ledger. Reserved for
    /// fixed-size enrichment batches.
    Burst,
}

/// A parsed proxy response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(serde_json::Value),
    /// Body that did not parse as JSON, kept verbatim.
    Text(String),
}

impl Payload {
    #[must_use]
    pub fn parse(body: String) -> Self {
        match serde_json::from_str(&body) {
            Ok(value) => Payload::Json(value),
            Err(_) => Payload::Text(body),
        }
    }

    #[must_use]
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Payload::Json(value) => Some(value),
            Payload::Text(_) => None,
        }
    }
}

#[derive(Debug, Default)]
struct QueueSlot {
    last_completed: Option<Instant>,
}

/// Client for the proxy's vendor-mirroring REST surface.
#[derive(Debug)]
pub struct ProxyClient {
    client: Client,
    base_url: Url,
    max_retries: u32,
    backoff_base_ms: u64,
    gap_ms: AtomicU64,
    throttled: AtomicBool,
    queue: Mutex<QueueSlot>,
    ledger: RateLedger,
}

impl ProxyClient {
    /// # Errors
    ///
    /// Returns [`ProxyError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`ProxyError::InvalidBaseUrl`] if
    /// `base_url` does not parse.
    pub fn new(base_url: &str, settings: ClientSettings) -> Result<Self, ProxyError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(settings.user_agent.as_str())
            .build()?;

        // Exactly one trailing slash so `Url::join` appends instead of
        // replacing the last path segment.
        let normalised = format!("{}/", base_url.trim().trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| ProxyError::InvalidBaseUrl {
            base_url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            base_url,
            max_retries: settings.max_retries,
            backoff_base_ms: settings.backoff_base_ms,
            gap_ms: AtomicU64::new(settings.request_gap_ms),
            throttled: AtomicBool::new(false),
            queue: Mutex::new(QueueSlot::default()),
            ledger: RateLedger::new(settings.rate_rules),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Current inter-request gap; grows after throttling.
    #[must_use]
    pub fn request_gap(&self) -> Duration {
        Duration::from_millis(self.gap_ms.load(Ordering::Relaxed))
    }

    /// Whether any response this session has been a 429.
    #[must_use]
    pub fn was_throttled(&self) -> bool {
        self.throttled.load(Ordering::Relaxed)
    }

    /// Sends `request` through the serial queue.
    ///
    /// # Errors
    ///
    /// - [`ProxyError::Throttled`] if every attempt was answered with 429.
    /// - [`ProxyError::Status`] for any other non-2xx status (not retried).
    /// - [`ProxyError::Http`] on network or TLS failure (not retried).
    pub async fn fetch(&self, request: &ProxyRequest) -> Result<Payload, ProxyError> {
        self.fetch_in(Lane::Serial, request).await
    }

    /// Sends `request` through the given lane.
    ///
    /// # Errors
    ///
    /// Same as [`Self::fetch`].
    pub async fn fetch_in(&self, lane: Lane, request: &ProxyRequest) -> Result<Payload, ProxyError> {
        let url = self.build_url(request)?;
        match lane {
            Lane::Burst => self.dispatch(&url).await,
            Lane::Serial => {
                let mut slot = self.queue.lock().await;
                if let Some(previous) = slot.last_completed {
                    let ready_at = previous + self.request_gap();
                    tokio::time::sleep_until(ready_at).await;
                }
                let result = self.dispatch(&url).await;
                slot.last_completed = Some(Instant::now());
                result
            }
        }
    }

    async fn dispatch(&self, url: &Url) -> Result<Payload, ProxyError> {
        retry_with_backoff(self.max_retries, self.backoff_base_ms, || async {
            self.ledger.acquire().await;
            self.send_once(url).await
        })
        .await
    }

    async fn send_once(&self, url: &Url) -> Result<Payload, ProxyError> {
        let response = self
            .client
            .get(url.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_ms = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok())
                .map(|secs| secs.saturating_mul(1_000));
            self.note_throttled();
            return Err(ProxyError::Throttled {
                url: url.to_string(),
                retry_after_ms,
            });
        }

        if !status.is_success() {
            let header = |name: &str| {
                response
                    .headers()
                    .get(name)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_owned)
            };
            let upstream_status = header(UPSTREAM_STATUS_HEADER);
            let upstream_url = header(UPSTREAM_URL_HEADER);
            let body = response.text().await.unwrap_or_default();
            return Err(ProxyError::Status {
                status: status.as_u16(),
                url: url.to_string(),
                upstream_status,
                upstream_url,
                body,
            });
        }

        let body = response.text().await?;
        Ok(Payload::parse(body))
    }

    /// Marks the session throttled and widens the pacing gap for good.
    fn note_throttled(&self) {
        self.throttled.store(true, Ordering::Relaxed);
        let previous = self
            .gap_ms
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |gap| {
                Some(widened_gap(gap))
            })
            .unwrap_or_else(|gap| gap);
        let current = widened_gap(previous);
        if current != previous {
            tracing::warn!(
                previous_gap_ms = previous,
                gap_ms = current,
                "proxy throttled, raising inter-request gap for this session"
            );
        }
    }

    /// Builds the full request URL with percent-encoded query parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::InvalidBaseUrl`] if the path cannot be joined.
    fn build_url(&self, request: &ProxyRequest) -> Result<Url, ProxyError> {
        let mut url = self
            .base_url
            .join(&request.path)
            .map_err(|e| ProxyError::InvalidBaseUrl {
                base_url: self.base_url.to_string(),
                reason: format!("cannot join path \"{}\": {e}", request.path),
            })?;
        if !request.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in &request.query {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }
}

fn widened_gap(gap_ms: u64) -> u64 {
    gap_ms
        .max(gap_ms.saturating_mul(2).clamp(THROTTLED_MIN_GAP_MS, MAX_GAP_MS))
}

#[cfg(test)]
#[path = "../client_test.rs"]
mod tests;
