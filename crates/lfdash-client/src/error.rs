use thiserror::Error;

/// Errors raised by the proxy request pipeline.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx, non-429 response. Upstream diagnostics come from the proxy's
    /// `X-Upstream-Status` / `X-Upstream-Url` headers.
    #[error("proxy returned HTTP {status} for {url}{}", upstream_suffix(.upstream_status.as_deref(), .upstream_url.as_deref()))]
    Status {
        status: u16,
        url: String,
        upstream_status: Option<String>,
        upstream_url: Option<String>,
        body: String,
    },

    /// HTTP 429. Retried by the pipeline; surfaces only once retries run out.
    #[error("throttled by proxy for {url}")]
    Throttled {
        url: String,
        retry_after_ms: Option<u64>,
    },

    #[error("invalid proxy base URL \"{base_url}\": {reason}")]
    InvalidBaseUrl { base_url: String, reason: String },
}

fn upstream_suffix(status: Option<&str>, url: Option<&str>) -> String {
    match (status, url) {
        (None, None) => String::new(),
        (Some(s), None) => format!(" (upstream status {s})"),
        (None, Some(u)) => format!(" (upstream {u})"),
        (Some(s), Some(u)) => format!(" (upstream status {s} from {u})"),
    }
}
