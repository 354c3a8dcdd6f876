//! Per-business page-view summaries, fetched on demand.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use lfdash_core::{BusinessId, DateRange, PageSummary, PageVisit};

use crate::client::{Lane, PageQuery, ProxyClient};
use crate::error::ProxyError;

/// Orders `pages` by view time and fills in each page's duration.
///
/// A page lasts until the next page view; the last page lasts until
/// `visit_end`, or has no duration when the end is unknown. Negative gaps
/// (clock skew in the vendor data) are treated as unknown.
pub fn page_durations(pages: &mut [PageVisit], visit_end: Option<DateTime<Utc>>) {
    pages.sort_by_key(|p| (p.viewed_at.is_none(), p.viewed_at));

    let ends: Vec<Option<DateTime<Utc>>> = (0..pages.len())
        .map(|i| match pages.get(i + 1) {
            Some(next) => next.viewed_at,
            None => visit_end,
        })
        .collect();

    for (page, end) in pages.iter_mut().zip(ends) {
        page.duration_secs = match (page.viewed_at, end) {
            (Some(start), Some(end)) if end >= start => Some((end - start).num_seconds()),
            _ => None,
        };
    }
}

#[derive(Debug, Default)]
struct UrlTally {
    title: Option<String>,
    views: u64,
    total_secs: i64,
    timed: u32,
}

/// Rolls page views up per URL, most viewed first.
#[must_use]
pub fn summarize(pages: &[PageVisit]) -> Vec<PageSummary> {
    let mut tallies: HashMap<&str, UrlTally> = HashMap::new();
    for page in pages.iter().filter(|p| !p.url.is_empty()) {
        let tally = tallies.entry(page.url.as_str()).or_default();
        tally.views += 1;
        if tally.title.is_none() {
            tally.title.clone_from(&page.title);
        }
        if let Some(secs) = page.duration_secs {
            tally.total_secs += secs;
            tally.timed += 1;
        }
    }

    let mut summaries: Vec<PageSummary> = tallies
        .into_iter()
        .map(|(url, tally)| PageSummary {
            url: url.to_string(),
            title: tally.title,
            views: tally.views,
            avg_duration_secs: average_secs(tally.total_secs, tally.timed),
        })
        .collect();
    summaries.sort_by(|a, b| b.views.cmp(&a.views).then_with(|| a.url.cmp(&b.url)));
    summaries
}

#[allow(clippy::cast_precision_loss)]
fn average_secs(total: i64, count: u32) -> Option<f64> {
    (count > 0).then(|| total as f64 / f64::from(count))
}

/// Fetches up to `max_visits` of the business's visits in `range`, then the
/// pages of each, and summarizes them.
///
/// # Errors
///
/// Returns the visit-list [`ProxyError`]. A failed page lookup for one visit
/// is logged and that visit is left out.
pub async fn summarize_business_pages(
    client: &ProxyClient,
    business_id: &BusinessId,
    range: &DateRange,
    max_visits: u32,
) -> Result<Vec<PageSummary>, ProxyError> {
    let max_visits = max_visits.max(1);
    let visits = client
        .visits_by_business_page(Lane::Serial, business_id, range, PageQuery::first(max_visits))
        .await?;

    let mut all_pages = Vec::new();
    for visit in visits.items.iter().take(max_visits as usize) {
        let Some(visit_id) = &visit.id else {
            continue;
        };
        match client.pages_by_visit(visit_id).await {
            Ok(mut pages) => {
                page_durations(&mut pages, visit.ended_at);
                all_pages.extend(pages);
            }
            Err(e) => {
                tracing::warn!(business_id = %business_id, visit_id = %visit_id, error = %e, "page lookup failed");
            }
        }
    }

    Ok(summarize(&all_pages))
}
