//! Summary reports derived from the filtered business set.

use std::borrow::Borrow;
use std::collections::HashMap;

use chrono::{DateTime, TimeDelta, Utc};

use lfdash_core::{Business, DateRange};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKey {
    State,
    Industry,
    Country,
}

impl GroupKey {
    fn value(self, business: &Business) -> Option<&str> {
        let raw = match self {
            GroupKey::State => business.location.state.as_deref(),
            GroupKey::Industry => business.industry.as_deref(),
            GroupKey::Country => business.location.country.as_deref(),
        };
        raw.map(str::trim).filter(|v| !v.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupCount {
    pub label: String,
    pub weight: u64,
}

/// Top `n` groups by summed visits.
///
/// When no business in the set has any recorded visits, each business counts
/// once instead. Businesses without a value for `key` are left out.
#[must_use]
pub fn top_groups<B: Borrow<Business>>(businesses: &[B], key: GroupKey, n: usize) -> Vec<GroupCount> {
    let weighted = businesses.iter().any(|b| b.borrow().visits > 0);
    let mut totals: HashMap<&str, u64> = HashMap::new();
    for business in businesses {
        let business = business.borrow();
        if let Some(label) = key.value(business) {
            *totals.entry(label).or_default() += if weighted { business.visits } else { 1 };
        }
    }

    let mut groups: Vec<GroupCount> = totals
        .into_iter()
        .map(|(label, weight)| GroupCount {
            label: label.to_string(),
            weight,
        })
        .collect();
    groups.sort_by(|a, b| b.weight.cmp(&a.weight).then_with(|| a.label.cmp(&b.label)));
    groups.truncate(n);
    groups
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecencyBucket {
    pub label: String,
    pub count: usize,
}

/// Businesses bucketed by time since last visit.
///
/// Bucket bounds sit at a quarter, half, and the whole of the range length,
/// followed by "older" and "never".
#[must_use]
pub fn recency_histogram<B: Borrow<Business>>(businesses: &[B], window: &DateRange) -> Vec<RecencyBucket> {
    let length = window.length().max(TimeDelta::minutes(4));
    let bounds = [length / 4, length / 2, length];
    let mut counts = [0usize; 5];

    for business in businesses {
        let slot = match business.borrow().last_visit {
            None => 4,
            Some(last) => {
                let age = window.end - last;
                bounds.iter().position(|bound| age <= *bound).unwrap_or(3)
            }
        };
        counts[slot] += 1;
    }

    let mut labels: Vec<String> = bounds.iter().map(|b| format!("≤{}", span_label(*b))).collect();
    labels.push("older".to_string());
    labels.push("never".to_string());
    labels
        .into_iter()
        .zip(counts)
        .map(|(label, count)| RecencyBucket { label, count })
        .collect()
}

fn span_label(span: TimeDelta) -> String {
    let hours = span.num_hours();
    if hours >= 48 {
        format!("{}d", hours / 24)
    } else if hours >= 1 {
        format!("{hours}h")
    } else {
        format!("{}m", span.num_minutes())
    }
}

/// The `n` businesses with the latest last visit. Businesses never visited are skipped.
#[must_use]
pub fn most_recent<B: Borrow<Business>>(businesses: &[B], n: usize) -> Vec<Business> {
    let mut seen: Vec<&Business> = businesses
        .iter()
        .map(Borrow::borrow)
        .filter(|b| b.last_visit.is_some())
        .collect();
    seen.sort_by(|a, b| b.last_visit.cmp(&a.last_visit).then_with(|| a.name.cmp(&b.name)));
    seen.into_iter().take(n).cloned().collect()
}

/// Compact age label: `now`, `12m`, `5h`, `3d`, or `—` when unknown.
#[must_use]
pub fn time_ago(ts: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(ts) = ts else {
        return "—".to_string();
    };
    let minutes = (now - ts).num_minutes();
    if minutes < 1 {
        return "now".to_string();
    }
    if minutes < 60 {
        return format!("{minutes}m");
    }
    let hours = minutes / 60;
    if hours < 24 {
        return format!("{hours}h");
    }
    format!("{}d", hours / 24)
}
