//! Canonical business, visit, and page-visit types.
//!
//! Raw vendor records are mapped into these by the normalizer in
//! `lfdash-client`. Identifiers arrive as strings or numbers depending on the
//! endpoint, so they are wrapped in newtypes that only exist in canonical
//! string form.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical string key for a vendor business.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BusinessId(String);

impl BusinessId {
    /// Returns `None` for empty or whitespace-only input.
    #[must_use]
    pub fn new(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| Self(trimmed.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BusinessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical string key for a vendor visit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VisitId(String);

impl VisitId {
    /// Returns `None` for empty or whitespace-only input.
    #[must_use]
    pub fn new(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| Self(trimmed.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VisitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub city: Option<String>,
    /// US states are stored as two-letter postal codes.
    pub state: Option<String>,
    /// Stored as a canonical abbreviation where one is known (`USA`, `UK`).
    pub country: Option<String>,
}

impl Location {
    /// `"Austin, TX, USA"`, skipping missing parts.
    #[must_use]
    pub fn display(&self) -> String {
        [&self.city, &self.state, &self.country]
            .into_iter()
            .filter_map(|part| part.as_deref())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// A visited organization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Business {
    pub id: Option<BusinessId>,
    pub name: String,
    pub location: Location,
    pub industry: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub employees: Option<u64>,
    pub address: Option<String>,
    pub visits: u64,
    pub pages: u64,
    pub last_visit: Option<DateTime<Utc>>,
    pub first_visit: Option<DateTime<Utc>>,
    /// Explicit vendor "is new" flag, when the endpoint supplies one.
    pub is_new: Option<bool>,
    /// Set on placeholders synthesized without a vendor record.
    pub generic: bool,
}

impl Business {
    #[must_use]
    pub fn synthetic_name(id: &BusinessId) -> String {
        format!("Business {id}")
    }

    /// Minimal placeholder carrying only derived stats.
    #[must_use]
    pub fn synthetic(id: BusinessId, stats: &VisitStats) -> Self {
        let mut business = Self {
            name: Self::synthetic_name(&id),
            id: Some(id),
            generic: true,
            ..Self::default()
        };
        business.apply_stats(stats);
        business
    }

    /// Whether the vendor record already carried activity fields.
    #[must_use]
    pub fn has_activity(&self) -> bool {
        self.visits > 0 || self.last_visit.is_some()
    }

    /// Overwrites activity fields with aggregated stats.
    ///
    /// `first_visit` is the vendor's first-seen date and is left alone;
    /// range-scoped stats cannot know it.
    pub fn apply_stats(&mut self, stats: &VisitStats) {
        self.visits = stats.visits;
        self.pages = stats.pages;
        self.last_visit = stats.last_visit;
    }

    /// True for placeholders and records with no real vendor name.
    #[must_use]
    pub fn is_generic(&self) -> bool {
        if self.generic {
            return true;
        }
        let name = self.name.trim();
        if name.is_empty() || name.eq_ignore_ascii_case("unknown") {
            return true;
        }
        match name.strip_prefix("Business ") {
            Some(rest) => {
                let rest = rest.trim();
                rest.chars().all(|c| c.is_ascii_digit())
                    || self.id.as_ref().is_some_and(|id| id.as_str() == rest)
            }
            None => false,
        }
    }

    /// Lowercased haystack used by free-text search.
    #[must_use]
    pub fn searchable_text(&self) -> String {
        [
            Some(self.name.as_str()),
            self.location.city.as_deref(),
            self.location.state.as_deref(),
            self.location.country.as_deref(),
            self.industry.as_deref(),
            self.website.as_deref(),
            self.address.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
    }
}

/// One browsing session by one visitor at one business.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visit {
    pub id: Option<VisitId>,
    /// Weak reference; the business may not be loaded yet.
    pub business_id: Option<BusinessId>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub pages: u64,
    /// Access-gated; never rendered without an unlocked gate.
    pub ip: Option<String>,
    pub referrer: Option<String>,
}

/// One page view within a visit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageVisit {
    pub url: String,
    pub title: Option<String>,
    pub viewed_at: Option<DateTime<Utc>>,
    /// Seconds until the next page view or the visit end.
    pub duration_secs: Option<i64>,
}

/// Per-URL roll-up of page views for one business.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSummary {
    pub url: String,
    pub title: Option<String>,
    pub views: u64,
    pub avg_duration_secs: Option<f64>,
}

/// Visit statistics accumulated for one business.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitStats {
    pub visits: u64,
    pub pages: u64,
    pub last_visit: Option<DateTime<Utc>>,
    /// Earliest visit inside the aggregated range, not a first-seen date.
    pub earliest_visit: Option<DateTime<Utc>>,
}

impl VisitStats {
    pub fn record(&mut self, visit: &Visit) {
        self.visits += 1;
        self.pages += visit.pages;
        if let Some(started) = visit.started_at {
            if self.last_visit.is_none_or(|last| started > last) {
                self.last_visit = Some(started);
            }
            if self.earliest_visit.is_none_or(|first| started < first) {
                self.earliest_visit = Some(started);
            }
        }
    }
}

/// A rep or portal user record from the reference endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepUser {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn id(raw: &str) -> BusinessId {
        BusinessId::new(raw).unwrap()
    }

    #[test]
    fn business_id_trims_and_rejects_blank() {
        assert_eq!(id("  42 ").as_str(), "42");
        assert!(BusinessId::new("   ").is_none());
    }

    #[test]
    fn synthetic_business_is_generic_and_carries_stats() {
        let stats = VisitStats {
            visits: 4,
            pages: 9,
            last_visit: Some(Utc.with_ymd_and_hms(2026, 1, 9, 14, 4, 0).unwrap()),
            earliest_visit: Some(Utc.with_ymd_and_hms(2026, 1, 8, 9, 0, 0).unwrap()),
        };
        let b = Business::synthetic(id("42"), &stats);
        assert_eq!(b.name, "Business 42");
        assert!(b.generic);
        assert!(b.is_generic());
        assert_eq!(b.visits, 4);
        assert_eq!(b.pages, 9);
        assert!(b.first_visit.is_none());
    }

    #[test]
    fn applying_stats_keeps_vendor_first_seen_date() {
        let first_seen = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let mut b = Business {
            name: "Acme".into(),
            first_visit: Some(first_seen),
            ..Business::default()
        };
        let mut stats = VisitStats::default();
        stats.record(&Visit {
            started_at: Some(Utc.with_ymd_and_hms(2026, 1, 9, 10, 0, 0).unwrap()),
            pages: 2,
            ..Visit::default()
        });
        b.apply_stats(&stats);
        assert_eq!(b.first_visit, Some(first_seen));
        assert_eq!(b.visits, 1);
        assert_eq!(b.last_visit, stats.last_visit);
    }

    #[test]
    fn generic_name_detection() {
        let named = |name: &str| Business {
            name: name.to_string(),
            ..Business::default()
        };
        assert!(named("Business 42").is_generic());
        assert!(named("").is_generic());
        assert!(named("Unknown").is_generic());
        assert!(!named("Business Solutions Ltd").is_generic());
        assert!(!named("Acme").is_generic());
    }

    #[test]
    fn visit_stats_track_extremes() {
        let at = |h| Some(Utc.with_ymd_and_hms(2026, 1, 9, h, 0, 0).unwrap());
        let mut stats = VisitStats::default();
        for (hour, pages) in [(10, 2), (14, 3), (8, 1)] {
            stats.record(&Visit {
                started_at: at(hour),
                pages,
                ..Visit::default()
            });
        }
        assert_eq!(stats.visits, 3);
        assert_eq!(stats.pages, 6);
        assert_eq!(stats.last_visit, at(14));
        assert_eq!(stats.earliest_visit, at(8));
    }

    #[test]
    fn location_display_skips_missing_parts() {
        let loc = Location {
            city: Some("Austin".into()),
            state: None,
            country: Some("USA".into()),
        };
        assert_eq!(loc.display(), "Austin, USA");
    }

    #[test]
    fn searchable_text_is_lowercased() {
        let b = Business {
            name: "Acme Bearings".into(),
            industry: Some("Manufacturing".into()),
            ..Business::default()
        };
        let text = b.searchable_text();
        assert!(text.contains("acme bearings"));
        assert!(text.contains("manufacturing"));
    }
}
