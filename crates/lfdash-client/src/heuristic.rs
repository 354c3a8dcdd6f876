//! Heuristic IP extraction.
//!
//! Vendor visit records sometimes carry the visitor IP under an unexpected
//! key or nested a few levels down. This walks the record looking for it.
//! Results are best-effort and may be wrong; callers treat them as display
//! hints, never as trusted data. The walk is bounded by `max_depth`.

use std::net::IpAddr;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

pub const DEFAULT_MAX_DEPTH: usize = 4;

const IP_ALIASES: [&str; 6] = [
    "IPAddress",
    "IpAddress",
    "IP",
    "VisitorIP",
    "VisitorIpAddress",
    "ipAddress",
];

static IPV4_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:\d{1,3}\.){3}\d{1,3}\b").expect("valid ipv4 regex"));

/// Returns the first plausible IP address in `record`.
///
/// Known aliases at the top level win. Otherwise nested objects and arrays
/// are searched, down to `max_depth` levels, for keys containing `ip`.
#[must_use]
pub fn extract_ip(record: &Value, max_depth: usize) -> Option<String> {
    if let Value::Object(map) = record {
        for alias in IP_ALIASES {
            if let Some(ip) = map.get(alias).and_then(ip_from_value) {
                return Some(ip);
            }
        }
    }
    walk(record, max_depth)
}

fn walk(value: &Value, depth_left: usize) -> Option<String> {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                if looks_like_ip_key(key) {
                    if let Some(ip) = ip_from_value(child) {
                        return Some(ip);
                    }
                }
            }
            if depth_left == 0 {
                return None;
            }
            map.values().find_map(|child| walk(child, depth_left - 1))
        }
        Value::Array(items) if depth_left > 0 => {
            items.iter().find_map(|child| walk(child, depth_left - 1))
        }
        _ => None,
    }
}

/// Splits `ClientIp`, `client_ip`, and `VISITOR-IP` style keys into
/// lowercased words.
fn key_words(key: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;
    for c in key.chars() {
        if !c.is_ascii_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_ascii_uppercase() && prev_lower {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
        current.push(c.to_ascii_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// `ip` must be a whole word of the key, so `Zip` and `Membership` do not match.
fn looks_like_ip_key(key: &str) -> bool {
    key_words(key)
        .iter()
        .any(|word| matches!(word.as_str(), "ip" | "ipaddress" | "ipaddr" | "ipv4" | "ipv6"))
}

fn ip_from_value(value: &Value) -> Option<String> {
    let raw = value.as_str()?.trim();
    if raw.parse::<IpAddr>().is_ok() {
        return Some(raw.to_string());
    }
    IPV4_RE
        .find(raw)
        .map(|m| m.as_str())
        .filter(|candidate| candidate.parse::<IpAddr>().is_ok())
        .map(str::to_string)
}
