use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    /// Base URL of the credential-injecting proxy. `None` runs on demo data.
    pub proxy_url: Option<String>,
    pub log_level: String,
    pub reps_path: PathBuf,
    pub session_path: PathBuf,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub request_gap_ms: u64,
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
    pub page_size: u32,
    pub max_visit_pages: u32,
    pub recent_sample_size: usize,
    pub enrich_batch_size: usize,
    pub ip_access_code: Option<String>,
    pub codes_access_code: Option<String>,
}

impl AppConfig {
    #[must_use]
    pub fn is_demo(&self) -> bool {
        self.proxy_url.is_none()
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("proxy_url", &self.proxy_url)
            .field("log_level", &self.log_level)
            .field("reps_path", &self.reps_path)
            .field("session_path", &self.session_path)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("request_gap_ms", &self.request_gap_ms)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_base_ms", &self.retry_backoff_base_ms)
            .field("page_size", &self.page_size)
            .field("max_visit_pages", &self.max_visit_pages)
            .field("recent_sample_size", &self.recent_sample_size)
            .field("enrich_batch_size", &self.enrich_batch_size)
            .field(
                "ip_access_code",
                &self.ip_access_code.as_ref().map(|_| "[redacted]"),
            )
            .field(
                "codes_access_code",
                &self.codes_access_code.as_ref().map(|_| "[redacted]"),
            )
            .finish()
    }
}
