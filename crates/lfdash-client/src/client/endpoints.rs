//! Typed helpers for the vendor paths mirrored by the proxy.
//!
//! Range-scoped calls send `datefrom`/`dateto` in the vendor's day-first
//! format; list calls page with `pagesize`/`pageno` (1-based).

use lfdash_core::{Business, BusinessId, DateRange, PageVisit, RepUser, Visit, VisitId};

use super::{Lane, ProxyClient, ProxyRequest};
use crate::dates::format_vendor_datetime;
use crate::error::ProxyError;
use crate::normalize::{
    extract_list, extract_record, normalize_business, normalize_page_visit, normalize_rep_user,
    normalize_visit, ListEndpoint, ListPage,
};

const ASSIGNED_TO_LIST: &str = "Reference/GetAssignedToList";
const PORTAL_LOGINS: &str = "Reference/GetClientPortalLogins";
const ALL_BUSINESSES: &str = "Business/GetAllBusinesses";
const BUSINESSES_BY_ASSIGNED_TO: &str = "Business/GetBusinessesByAssignedTo";
const BUSINESS: &str = "Business/GetBusiness";
const ALL_VISITS: &str = "Visit/GetAllVisits";
const VISITS_BY_BUSINESS: &str = "Visit/GetVisitsByBusiness";
const VISIT_DETAILS: &str = "Visit/GetVisitDetails";
const PAGES: &str = "Page/GetPages";
const PAGES_BY_VISIT: &str = "Page/GetPagesByVisit";

/// One page of a paginated listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageQuery {
    pub page_size: u32,
    /// 1-based.
    pub page_no: u32,
}

impl PageQuery {
    #[must_use]
    pub fn first(page_size: u32) -> Self {
        Self {
            page_size,
            page_no: 1,
        }
    }

    #[must_use]
    pub fn next(self) -> Self {
        Self {
            page_no: self.page_no.saturating_add(1),
            ..self
        }
    }
}

impl ProxyRequest {
    #[must_use]
    fn in_range(self, range: &DateRange) -> Self {
        self.param("datefrom", format_vendor_datetime(range.start))
            .param("dateto", format_vendor_datetime(range.end))
    }

    #[must_use]
    fn paged(self, page: PageQuery) -> Self {
        self.param("pagesize", page.page_size.to_string())
            .param("pageno", page.page_no.to_string())
    }
}

impl ProxyClient {
    /// Reps that businesses can be assigned to.
    ///
    /// # Errors
    ///
    /// Propagates any [`ProxyError`] from the request pipeline.
    pub async fn assigned_to_list(&self) -> Result<Vec<RepUser>, ProxyError> {
        let payload = self.fetch(&ProxyRequest::new(ASSIGNED_TO_LIST)).await?;
        Ok(extract_list(ListEndpoint::AssignedTo, &payload)
            .items
            .iter()
            .filter_map(normalize_rep_user)
            .collect())
    }

    /// # Errors
    ///
    /// Propagates any [`ProxyError`] from the request pipeline.
    pub async fn portal_logins(&self) -> Result<Vec<RepUser>, ProxyError> {
        let payload = self.fetch(&ProxyRequest::new(PORTAL_LOGINS)).await?;
        Ok(extract_list(ListEndpoint::PortalLogins, &payload)
            .items
            .iter()
            .filter_map(normalize_rep_user)
            .collect())
    }

    /// # Errors
    ///
    /// Propagates any [`ProxyError`] from the request pipeline.
    pub async fn all_businesses_page(
        &self,
        range: &DateRange,
        page: PageQuery,
    ) -> Result<ListPage<Business>, ProxyError> {
        let request = ProxyRequest::new(ALL_BUSINESSES).in_range(range).paged(page);
        let payload = self.fetch(&request).await?;
        Ok(extract_list(ListEndpoint::Businesses, &payload).map(|raw| normalize_business(&raw)))
    }

    /// Businesses assigned to one rep, usually carrying inline activity fields.
    ///
    /// # Errors
    ///
    /// Propagates any [`ProxyError`] from the request pipeline.
    pub async fn businesses_by_assigned_to_page(
        &self,
        assigned_to: &str,
        range: &DateRange,
        page: PageQuery,
    ) -> Result<ListPage<Business>, ProxyError> {
        let request = ProxyRequest::new(BUSINESSES_BY_ASSIGNED_TO)
            .param("assignedtoid", assigned_to)
            .in_range(range)
            .paged(page);
        let payload = self.fetch(&request).await?;
        Ok(extract_list(ListEndpoint::Businesses, &payload).map(|raw| normalize_business(&raw)))
    }

    /// Detail record for one business. `Ok(None)` when the response holds no record.
    ///
    /// # Errors
    ///
    /// Propagates any [`ProxyError`] from the request pipeline.
    pub async fn business(
        &self,
        lane: Lane,
        id: &BusinessId,
    ) -> Result<Option<Business>, ProxyError> {
        let request = ProxyRequest::new(BUSINESS).param("businessid", id.as_str());
        let payload = self.fetch_in(lane, &request).await?;
        Ok(extract_record(&payload).map(|raw| {
            let mut business = normalize_business(&raw);
            // Detail responses sometimes omit the id the caller asked for.
            if business.id.is_none() {
                business.id = Some(id.clone());
                if business.generic {
                    business.name = Business::synthetic_name(id);
                }
            }
            business
        }))
    }

    /// # Errors
    ///
    /// Propagates any [`ProxyError`] from the request pipeline.
    pub async fn all_visits_page(
        &self,
        range: &DateRange,
        page: PageQuery,
    ) -> Result<ListPage<Visit>, ProxyError> {
        let request = ProxyRequest::new(ALL_VISITS).in_range(range).paged(page);
        let payload = self.fetch(&request).await?;
        Ok(extract_list(ListEndpoint::Visits, &payload).map(|raw| normalize_visit(&raw)))
    }

    /// Visits for one business. Visits missing a business id inherit `id`.
    ///
    /// # Errors
    ///
    /// Propagates any [`ProxyError`] from the request pipeline.
    pub async fn visits_by_business_page(
        &self,
        lane: Lane,
        id: &BusinessId,
        range: &DateRange,
        page: PageQuery,
    ) -> Result<ListPage<Visit>, ProxyError> {
        let request = ProxyRequest::new(VISITS_BY_BUSINESS)
            .param("businessid", id.as_str())
            .in_range(range)
            .paged(page);
        let payload = self.fetch_in(lane, &request).await?;
        Ok(extract_list(ListEndpoint::Visits, &payload).map(|raw| {
            let mut visit = normalize_visit(&raw);
            visit.business_id.get_or_insert_with(|| id.clone());
            visit
        }))
    }

    /// # Errors
    ///
    /// Propagates any [`ProxyError`] from the request pipeline.
    pub async fn visit_details(&self, id: &VisitId) -> Result<Option<Visit>, ProxyError> {
        let request = ProxyRequest::new(VISIT_DETAILS).param("visitid", id.as_str());
        let payload = self.fetch(&request).await?;
        Ok(extract_record(&payload).map(|raw| {
            let mut visit = normalize_visit(&raw);
            visit.id.get_or_insert_with(|| id.clone());
            visit
        }))
    }

    /// Page views across all visits in range.
    ///
    /// # Errors
    ///
    /// Propagates any [`ProxyError`] from the request pipeline.
    pub async fn pages(
        &self,
        range: &DateRange,
        page: PageQuery,
    ) -> Result<ListPage<PageVisit>, ProxyError> {
        let request = ProxyRequest::new(PAGES).in_range(range).paged(page);
        let payload = self.fetch(&request).await?;
        Ok(extract_list(ListEndpoint::Pages, &payload).map(|raw| normalize_page_visit(&raw)))
    }

    /// # Errors
    ///
    /// Propagates any [`ProxyError`] from the request pipeline.
    pub async fn pages_by_visit(&self, id: &VisitId) -> Result<Vec<PageVisit>, ProxyError> {
        let request = ProxyRequest::new(PAGES_BY_VISIT).param("visitid", id.as_str());
        let payload = self.fetch(&request).await?;
        Ok(extract_list(ListEndpoint::Pages, &payload)
            .items
            .iter()
            .map(normalize_page_visit)
            .collect())
    }
}
