//! Client-side aggregation of the paginated visit log.
//!
//! Pages are walked in ascending order so page-1 statistics exist before any
//! later page is requested. The walk stops at `max_pages`; a result known to
//! have more data than was fetched is flagged `capped`, and pages that failed
//! are counted in `error_count` rather than aborting the run.

use std::collections::HashMap;

use lfdash_core::{AppConfig, BusinessId, DateRange, Visit, VisitId, VisitStats};

use crate::client::{PageQuery, ProxyClient};
use crate::error::ProxyError;
use crate::normalize::ListPage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateSettings {
    pub page_size: u32,
    pub max_pages: u32,
    pub recent_sample_size: usize,
}

impl AggregateSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            page_size: config.page_size,
            max_pages: config.max_visit_pages,
            recent_sample_size: config.recent_sample_size,
        }
    }
}

impl Default for AggregateSettings {
    fn default() -> Self {
        Self {
            page_size: 100,
            max_pages: 10,
            recent_sample_size: 25,
        }
    }
}

/// Per-business stats in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BusinessStats {
    order: Vec<BusinessId>,
    by_id: HashMap<BusinessId, VisitStats>,
}

impl BusinessStats {
    fn record(&mut self, id: &BusinessId, visit: &Visit) {
        if let Some(stats) = self.by_id.get_mut(id) {
            stats.record(visit);
            return;
        }
        let mut stats = VisitStats::default();
        stats.record(visit);
        self.order.push(id.clone());
        self.by_id.insert(id.clone(), stats);
    }

    #[must_use]
    pub fn get(&self, id: &BusinessId) -> Option<&VisitStats> {
        self.by_id.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&BusinessId, &VisitStats)> {
        self.order
            .iter()
            .filter_map(|id| self.by_id.get(id).map(|stats| (id, stats)))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    #[must_use]
    pub fn total_visits(&self) -> u64 {
        self.by_id.values().map(|s| s.visits).sum()
    }
}

/// Result of one aggregation run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisitAggregation {
    pub stats: BusinessStats,
    /// Most recent visits, newest first.
    pub recent: Vec<Visit>,
    /// Visitor IPs found inline in visit records.
    pub ip_harvest: HashMap<VisitId, String>,
    pub pages_fetched: u32,
    /// Total pages reported (or implied) by the first response.
    pub total_pages: Option<u32>,
    /// Visits attributed to a business.
    pub visits_counted: u64,
    /// Visits with no resolvable business id.
    pub skipped: u64,
    /// More data existed beyond `max_pages`.
    pub capped: bool,
    pub error_count: u32,
}

impl VisitAggregation {
    /// Stats ordered by visits desc, then most recent visit desc.
    #[must_use]
    pub fn ordered(&self) -> Vec<(BusinessId, VisitStats)> {
        let mut rows: Vec<(BusinessId, VisitStats)> = self
            .stats
            .iter()
            .map(|(id, stats)| (id.clone(), stats.clone()))
            .collect();
        rows.sort_by(|(a_id, a), (b_id, b)| {
            b.visits
                .cmp(&a.visits)
                .then_with(|| b.last_visit.cmp(&a.last_visit))
                .then_with(|| a_id.cmp(b_id))
        });
        rows
    }

    /// Whether the result may be missing data.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        self.capped || self.error_count > 0
    }

    fn absorb(&mut self, page: ListPage<Visit>, sample_size: usize) {
        self.pages_fetched += 1;
        for visit in page.items {
            if let (Some(id), Some(ip)) = (&visit.id, &visit.ip) {
                self.ip_harvest.insert(id.clone(), ip.clone());
            }
            let Some(business_id) = visit.business_id.clone() else {
                self.skipped += 1;
                continue;
            };
            self.stats.record(&business_id, &visit);
            self.visits_counted += 1;
            self.recent.push(visit);
        }
        self.recent
            .sort_by(|a, b| b.started_at.cmp(&a.started_at));
        self.recent.truncate(sample_size);
    }
}

/// Total pages from `PageCount`, or implied by `RecordCount`.
fn total_pages(page: &ListPage<Visit>, page_size: u32) -> Option<u32> {
    page.page_count.filter(|n| *n > 0).or_else(|| {
        page.record_count.and_then(|records| {
            let pages = records.div_ceil(u64::from(page_size.max(1))).max(1);
            u32::try_from(pages).ok()
        })
    })
}

/// Walks the visit log for `range` and accumulates per-business stats.
///
/// # Errors
///
/// Returns the first page's [`ProxyError`]; nothing can be aggregated
/// without it. Failures on later pages are counted in
/// [`VisitAggregation::error_count`].
pub async fn aggregate_visits(
    client: &ProxyClient,
    range: &DateRange,
    settings: AggregateSettings,
) -> Result<VisitAggregation, ProxyError> {
    let page_size = settings.page_size.max(1);
    let max_pages = settings.max_pages.max(1);
    let mut query = PageQuery::first(page_size);

    let first = client.all_visits_page(range, query).await?;
    let total = total_pages(&first, page_size);
    let mut last_full = first.items.len() >= page_size as usize;

    let mut agg = VisitAggregation {
        total_pages: total,
        ..VisitAggregation::default()
    };
    agg.absorb(first, settings.recent_sample_size);

    loop {
        let more_remaining = match total {
            Some(total) => query.page_no < total,
            None => last_full,
        };
        if !more_remaining {
            break;
        }
        if query.page_no >= max_pages {
            agg.capped = true;
            break;
        }

        query = query.next();
        match client.all_visits_page(range, query).await {
            Ok(page) => {
                last_full = page.items.len() >= page_size as usize;
                agg.absorb(page, settings.recent_sample_size);
            }
            Err(e) => {
                agg.error_count += 1;
                tracing::warn!(page = query.page_no, error = %e, "visit page fetch failed");
                if total.is_none() {
                    // Without a page count there is no way to know whether
                    // anything follows the failed page.
                    break;
                }
            }
        }
    }

    tracing::info!(
        businesses = agg.stats.len(),
        visits = agg.visits_counted,
        skipped = agg.skipped,
        pages = agg.pages_fetched,
        total_pages = ?agg.total_pages,
        capped = agg.capped,
        errors = agg.error_count,
        "visit aggregation complete"
    );
    Ok(agg)
}
