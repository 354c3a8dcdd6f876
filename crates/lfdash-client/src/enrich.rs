//! Turning aggregated visit stats into full business records.
//!
//! Detail lookups run in fixed-size concurrent batches on the burst lane;
//! each batch settles completely before the next starts, which bounds the
//! number of simultaneous connections to `batch_size`.

use futures::future::join_all;

use lfdash_core::{Business, BusinessId, DateRange, VisitStats};

use crate::client::{Lane, PageQuery, ProxyClient};

/// Visits fetched per business when back-filling missing activity.
const HYDRATE_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Enrichment {
    /// One record per input id, in input order.
    pub businesses: Vec<Business>,
    /// Records synthesized because no detail record could be fetched.
    pub fallbacks: usize,
}

/// Placeholder for a business known only through its visits.
#[must_use]
pub fn synthetic_business(id: &BusinessId, stats: &VisitStats) -> Business {
    Business::synthetic(id.clone(), stats)
}

/// Fetches a detail record for every id in `ordered_stats` and merges the
/// aggregated stats onto it.
///
/// Never fails: a failed or empty lookup yields a synthetic record.
pub async fn enrich_businesses(
    client: &ProxyClient,
    ordered_stats: &[(BusinessId, VisitStats)],
    batch_size: usize,
) -> Enrichment {
    let mut enrichment = Enrichment {
        businesses: Vec::with_capacity(ordered_stats.len()),
        fallbacks: 0,
    };

    for batch in ordered_stats.chunks(batch_size.max(1)) {
        let lookups = batch.iter().map(|(id, _)| client.business(Lane::Burst, id));
        let results = join_all(lookups).await;

        for ((id, stats), result) in batch.iter().zip(results) {
            let business = match result {
                Ok(Some(mut business)) => {
                    // Keyed by the aggregation id, whatever form the detail echoes.
                    business.id = Some(id.clone());
                    business.apply_stats(stats);
                    business
                }
                Ok(None) => {
                    tracing::debug!(business_id = %id, "no detail record; using placeholder");
                    enrichment.fallbacks += 1;
                    synthetic_business(id, stats)
                }
                Err(e) => {
                    tracing::debug!(business_id = %id, error = %e, "detail lookup failed; using placeholder");
                    enrichment.fallbacks += 1;
                    synthetic_business(id, stats)
                }
            };
            enrichment.businesses.push(business);
        }
    }

    tracing::info!(
        businesses = enrichment.businesses.len(),
        fallbacks = enrichment.fallbacks,
        "business enrichment complete"
    );
    enrichment
}

/// Back-fills visit stats on rep-assigned businesses that arrived without
/// activity fields. Businesses that already carry activity are not fetched.
///
/// Returns the number of businesses updated.
pub async fn hydrate_assigned(
    client: &ProxyClient,
    businesses: &mut [Business],
    range: &DateRange,
    batch_size: usize,
) -> usize {
    let pending: Vec<(usize, BusinessId)> = businesses
        .iter()
        .enumerate()
        .filter(|(_, b)| !b.has_activity())
        .filter_map(|(idx, b)| b.id.clone().map(|id| (idx, id)))
        .collect();
    if pending.is_empty() {
        return 0;
    }

    let mut hydrated = 0;
    for batch in pending.chunks(batch_size.max(1)) {
        let lookups = batch.iter().map(|(_, id)| {
            client.visits_by_business_page(Lane::Burst, id, range, PageQuery::first(HYDRATE_PAGE_SIZE))
        });
        let results = join_all(lookups).await;

        for ((idx, id), result) in batch.iter().zip(results) {
            match result {
                Ok(page) => {
                    let mut stats = VisitStats::default();
                    for visit in &page.items {
                        stats.record(visit);
                    }
                    if let Some(records) = page.record_count {
                        stats.visits = stats.visits.max(records);
                    }
                    if stats.visits > 0 {
                        businesses[*idx].apply_stats(&stats);
                        hydrated += 1;
                    }
                }
                Err(e) => {
                    tracing::debug!(business_id = %id, error = %e, "visit summary lookup failed");
                }
            }
        }
    }

    tracing::debug!(candidates = pending.len(), hydrated, "assigned-business hydration complete");
    hydrated
}
