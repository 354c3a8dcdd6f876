use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Parsing and validation are decoupled from the real environment so they can
/// be tested with a plain `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    // Empty strings count as unset so `.env` templates with blank values work.
    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let positive = |var: &str, value: u64| -> Result<(), ConfigError> {
        if value == 0 {
            return Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    };

    let env = parse_environment(&or_default("LFDASH_ENV", "development"))?;

    let proxy_url = optional("LFDASH_PROXY_URL");
    if proxy_url.is_none() && env == Environment::Production {
        return Err(ConfigError::MissingEnvVar("LFDASH_PROXY_URL".to_string()));
    }

    let log_level = or_default("LFDASH_LOG_LEVEL", "info");
    let reps_path = PathBuf::from(or_default("LFDASH_REPS_PATH", "./config/reps.yaml"));
    let session_path = PathBuf::from(or_default(
        "LFDASH_SESSION_PATH",
        "./.lfdash-session.json",
    ));

    let request_timeout_secs = parse_u64("LFDASH_REQUEST_TIMEOUT_SECS", "30")?;
    let user_agent = or_default("LFDASH_USER_AGENT", "lfdash/0.1 (visitor-intelligence)");
    let request_gap_ms = parse_u64("LFDASH_REQUEST_GAP_MS", "250")?;
    let max_retries = parse_u32("LFDASH_MAX_RETRIES", "3")?;
    let retry_backoff_base_ms = parse_u64("LFDASH_RETRY_BACKOFF_BASE_MS", "1000")?;

    let page_size = parse_u32("LFDASH_PAGE_SIZE", "100")?;
    positive("LFDASH_PAGE_SIZE", u64::from(page_size))?;
    let max_visit_pages = parse_u32("LFDASH_MAX_VISIT_PAGES", "10")?;
    positive("LFDASH_MAX_VISIT_PAGES", u64::from(max_visit_pages))?;
    let recent_sample_size = parse_usize("LFDASH_RECENT_SAMPLE_SIZE", "25")?;
    let enrich_batch_size = parse_usize("LFDASH_ENRICH_BATCH_SIZE", "5")?;
    positive("LFDASH_ENRICH_BATCH_SIZE", enrich_batch_size as u64)?;

    let ip_access_code = optional("LFDASH_IP_ACCESS_CODE");
    let codes_access_code = optional("LFDASH_CODES_ACCESS_CODE");

    Ok(AppConfig {
        env,
        proxy_url,
        log_level,
        reps_path,
        session_path,
        request_timeout_secs,
        user_agent,
        request_gap_ms,
        max_retries,
        retry_backoff_base_ms,
        page_size,
        max_visit_pages,
        recent_sample_size,
        enrich_batch_size,
        ip_access_code,
        codes_access_code,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` for anything other than
/// `development`, `test`, or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "LFDASH_ENV".to_string(),
            reason: format!("unknown environment \"{other}\""),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
