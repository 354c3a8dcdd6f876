//! Filter predicates over the aggregated business collection.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use lfdash_core::{Business, DateRange};

use crate::error::ParseOptionError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortMode {
    /// Composite default; currently the same order as `Visits`.
    #[default]
    Activity,
    Visits,
    Pages,
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SortMode::Activity => "activity",
            SortMode::Visits => "visits",
            SortMode::Pages => "pages",
        })
    }
}

impl FromStr for SortMode {
    type Err = ParseOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "activity" => Ok(SortMode::Activity),
            "visits" => Ok(SortMode::Visits),
            "pages" => Ok(SortMode::Pages),
            _ => Err(ParseOptionError::new("sort mode", s)),
        }
    }
}

/// Quick-filter tiles. At most one is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tile {
    New,
    /// Every business with activity; clears the other tiles.
    Visits,
    Returning,
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Tile::New => "new",
            Tile::Visits => "visits",
            Tile::Returning => "returning",
        })
    }
}

impl FromStr for Tile {
    type Err = ParseOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "new" => Ok(Tile::New),
            "visits" | "all" => Ok(Tile::Visits),
            "returning" => Ok(Tile::Returning),
            _ => Err(ParseOptionError::new("tile", s)),
        }
    }
}

/// User-selected predicate set.
///
/// New-only and returning-only are both derived from the single active
/// tile, so they can never be set together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    pub query: String,
    pub min_visits: u64,
    pub tile: Option<Tile>,
    pub hide_generic: bool,
    pub sort: SortMode,
    pub country: Option<String>,
    pub state: Option<String>,
}

impl FilterState {
    #[must_use]
    pub fn new_only(&self) -> bool {
        self.tile == Some(Tile::New)
    }

    #[must_use]
    pub fn returning_only(&self) -> bool {
        self.tile == Some(Tile::Returning)
    }

    /// Clicking the active tile again clears it.
    pub fn toggle_tile(&mut self, tile: Tile) {
        self.tile = if self.tile == Some(tile) {
            None
        } else {
            Some(tile)
        };
    }
}

/// Instants fixed for one filtering pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterContext {
    pub range_start: DateTime<Utc>,
    pub now: DateTime<Utc>,
}

impl FilterContext {
    #[must_use]
    pub fn for_window(window: &DateRange) -> Self {
        Self {
            range_start: window.start,
            now: window.end,
        }
    }

    #[must_use]
    pub fn window(&self) -> DateRange {
        DateRange {
            start: self.range_start,
            end: self.now,
        }
    }
}

/// First seen inside the range, else an explicit vendor flag, else a single visit.
#[must_use]
pub fn is_new(business: &Business, ctx: &FilterContext) -> bool {
    if business
        .first_visit
        .is_some_and(|first| first >= ctx.range_start)
    {
        return true;
    }
    if business.is_new == Some(true) {
        return true;
    }
    business.first_visit.is_none() && business.is_new.is_none() && business.visits == 1
}

#[must_use]
pub fn is_returning(business: &Business) -> bool {
    business.visits > 1
}

fn eq_field(value: Option<&str>, wanted: Option<&str>) -> bool {
    match wanted.map(str::trim).filter(|w| !w.is_empty()) {
        None => true,
        Some(wanted) => value.is_some_and(|v| v.trim().eq_ignore_ascii_case(wanted)),
    }
}

/// Every predicate except the tile ones.
#[must_use]
pub fn passes_base(business: &Business, filters: &FilterState) -> bool {
    if filters.hide_generic && business.is_generic() {
        return false;
    }
    if business.visits < filters.min_visits {
        return false;
    }
    if !eq_field(business.location.country.as_deref(), filters.country.as_deref())
        || !eq_field(business.location.state.as_deref(), filters.state.as_deref())
    {
        return false;
    }
    let query = filters.query.trim().to_lowercase();
    query.is_empty() || business.searchable_text().contains(&query)
}

#[must_use]
pub fn passes_tile(business: &Business, tile: Option<Tile>, ctx: &FilterContext) -> bool {
    match tile {
        None => true,
        Some(Tile::Visits) => business.visits > 0,
        Some(Tile::Returning) => is_returning(business),
        Some(Tile::New) => is_new(business, ctx),
    }
}

/// The filtered subset, in input order.
#[must_use]
pub fn apply_filters<'a>(
    businesses: &'a [Business],
    filters: &FilterState,
    ctx: &FilterContext,
) -> Vec<&'a Business> {
    businesses
        .iter()
        .filter(|b| passes_base(b, filters) && passes_tile(b, filters.tile, ctx))
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use lfdash_core::{BusinessId, Location};

    use super::*;

    fn ctx() -> FilterContext {
        FilterContext {
            range_start: Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap(),
            now: Utc.with_ymd_and_hms(2026, 1, 9, 18, 0, 0).unwrap(),
        }
    }

    fn acme() -> Business {
        Business {
            id: BusinessId::new("42"),
            name: "Acme".into(),
            visits: 3,
            last_visit: Some(Utc.with_ymd_and_hms(2026, 1, 9, 14, 4, 0).unwrap()),
            ..Business::default()
        }
    }

    #[test]
    fn min_visits_threshold() {
        let all = [acme()];
        let mut filters = FilterState {
            min_visits: 2,
            ..FilterState::default()
        };
        assert_eq!(apply_filters(&all, &filters, &ctx()).len(), 1);
        filters.min_visits = 5;
        assert!(apply_filters(&all, &filters, &ctx()).is_empty());
    }

    #[test]
    fn hide_generic_drops_placeholder_names_regardless_of_other_filters() {
        let generic = Business {
            name: "Business 42".into(),
            visits: 50,
            ..acme()
        };
        let all = [generic];
        let filters = FilterState {
            hide_generic: true,
            query: "business".into(),
            ..FilterState::default()
        };
        assert!(apply_filters(&all, &filters, &ctx()).is_empty());
    }

    #[test]
    fn new_detection_order() {
        let c = ctx();
        let inside = Business {
            first_visit: Some(c.range_start),
            visits: 9,
            ..acme()
        };
        assert!(is_new(&inside, &c));

        let flagged = Business {
            first_visit: Some(Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()),
            is_new: Some(true),
            ..acme()
        };
        assert!(is_new(&flagged, &c));

        let old = Business {
            first_visit: Some(Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()),
            visits: 1,
            ..acme()
        };
        assert!(!is_new(&old, &c));

        let single = Business {
            visits: 1,
            ..acme()
        };
        assert!(is_new(&single, &c));

        let explicit_no = Business {
            visits: 1,
            is_new: Some(false),
            ..acme()
        };
        assert!(!is_new(&explicit_no, &c));
    }

    #[test]
    fn tiles_are_mutually_exclusive() {
        let mut filters = FilterState::default();
        filters.toggle_tile(Tile::New);
        assert!(filters.new_only());
        filters.toggle_tile(Tile::Returning);
        assert!(filters.returning_only());
        assert!(!filters.new_only());
        filters.toggle_tile(Tile::Returning);
        assert_eq!(filters.tile, None);
    }

    #[test]
    fn returning_tile_needs_more_than_one_visit() {
        let once = Business {
            visits: 1,
            ..acme()
        };
        let all = [acme(), once];
        let filters = FilterState {
            tile: Some(Tile::Returning),
            ..FilterState::default()
        };
        let kept = apply_filters(&all, &filters, &ctx());
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].visits, 3);
    }

    #[test]
    fn location_and_text_filters() {
        let austin = Business {
            location: Location {
                city: Some("Austin".into()),
                state: Some("TX".into()),
                country: Some("USA".into()),
            },
            industry: Some("Bearings".into()),
            ..acme()
        };
        let all = [austin, acme()];

        let by_state = FilterState {
            state: Some("tx".into()),
            ..FilterState::default()
        };
        assert_eq!(apply_filters(&all, &by_state, &ctx()).len(), 1);

        let by_text = FilterState {
            query: "  BEARINGS ".into(),
            ..FilterState::default()
        };
        assert_eq!(apply_filters(&all, &by_text, &ctx()).len(), 1);

        let blank_country = FilterState {
            country: Some(String::new()),
            ..FilterState::default()
        };
        assert_eq!(apply_filters(&all, &blank_country, &ctx()).len(), 2);
    }

    #[test]
    fn option_parsing() {
        assert_eq!("Visits".parse::<SortMode>(), Ok(SortMode::Visits));
        assert_eq!("returning".parse::<Tile>(), Ok(Tile::Returning));
        assert!("loudest".parse::<SortMode>().is_err());
    }
}
