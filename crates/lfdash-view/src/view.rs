//! The full derived view: filtered and sorted list, tile counts, reports.
//!
//! Everything a presentation layer shows comes from one [`DerivedView`], so
//! panels cannot disagree about which data set they describe.

use lfdash_core::Business;

use crate::filter::{is_new, is_returning, passes_base, passes_tile, FilterContext, FilterState};
use crate::report::{most_recent, recency_histogram, top_groups, GroupCount, GroupKey, RecencyBucket};
use crate::sort::sort_businesses;

const TOP_GROUPS: usize = 5;
const RECENT_LIST: usize = 10;

/// Tile headline numbers over the set filtered by every non-tile predicate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TileCounts {
    pub new: usize,
    /// Summed visits, not businesses.
    pub visits: u64,
    pub returning: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reports {
    pub top_states: Vec<GroupCount>,
    pub top_industries: Vec<GroupCount>,
    pub top_countries: Vec<GroupCount>,
    pub recency: Vec<RecencyBucket>,
    pub recent: Vec<Business>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivedView {
    pub businesses: Vec<Business>,
    pub tiles: TileCounts,
    pub reports: Reports,
    /// Size of the unfiltered collection.
    pub total: usize,
}

/// Filters, sorts, and summarizes `all` in one pass with one fixed context.
#[must_use]
pub fn derive_view(all: &[Business], filters: &FilterState, ctx: &FilterContext) -> DerivedView {
    let base: Vec<&Business> = all.iter().filter(|b| passes_base(b, filters)).collect();

    let tiles = TileCounts {
        new: base.iter().filter(|b| is_new(b, ctx)).count(),
        visits: base.iter().map(|b| b.visits).sum(),
        returning: base.iter().filter(|b| is_returning(b)).count(),
    };

    let mut shown: Vec<&Business> = base
        .into_iter()
        .filter(|b| passes_tile(b, filters.tile, ctx))
        .collect();
    sort_businesses(&mut shown, filters.sort);

    let reports = Reports {
        top_states: top_groups(&shown, GroupKey::State, TOP_GROUPS),
        top_industries: top_groups(&shown, GroupKey::Industry, TOP_GROUPS),
        top_countries: top_groups(&shown, GroupKey::Country, TOP_GROUPS),
        recency: recency_histogram(&shown, &ctx.window()),
        recent: most_recent(&shown, RECENT_LIST),
    };

    DerivedView {
        businesses: shown.into_iter().cloned().collect(),
        tiles,
        reports,
        total: all.len(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use lfdash_core::BusinessId;

    use super::*;
    use crate::filter::{SortMode, Tile};

    fn ctx() -> FilterContext {
        FilterContext {
            range_start: Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap(),
            now: Utc.with_ymd_and_hms(2026, 1, 9, 18, 0, 0).unwrap(),
        }
    }

    fn business(id: &str, name: &str, visits: u64) -> Business {
        Business {
            id: BusinessId::new(id),
            name: name.into(),
            visits,
            pages: visits * 2,
            last_visit: Some(Utc.with_ymd_and_hms(2026, 1, 9, 10, 0, 0).unwrap()),
            ..Business::default()
        }
    }

    fn sample() -> Vec<Business> {
        vec![
            business("1", "Three", 3),
            business("2", "Ten", 10),
            business("3", "Once", 1),
            business("4", "Business 4", 2),
        ]
    }

    #[test]
    fn tile_counts_ignore_the_active_tile() {
        let all = sample();
        let mut filters = FilterState::default();
        let unfiltered = derive_view(&all, &filters, &ctx());
        filters.tile = Some(Tile::Returning);
        let returning = derive_view(&all, &filters, &ctx());

        assert_eq!(unfiltered.tiles, returning.tiles);
        assert_eq!(returning.tiles.returning, 3);
        assert_eq!(returning.tiles.visits, 16);
        assert_eq!(returning.tiles.new, 1);
        assert_eq!(returning.businesses.len(), 3);
    }

    #[test]
    fn tile_counts_follow_base_filters() {
        let all = sample();
        let filters = FilterState {
            hide_generic: true,
            ..FilterState::default()
        };
        let view = derive_view(&all, &filters, &ctx());
        assert_eq!(view.tiles.visits, 14);
        assert_eq!(view.total, 4);
        assert_eq!(view.businesses.len(), 3);
    }

    #[test]
    fn derivation_is_idempotent() {
        let all = sample();
        let filters = FilterState {
            sort: SortMode::Visits,
            min_visits: 2,
            ..FilterState::default()
        };
        let first = derive_view(&all, &filters, &ctx());
        let second = derive_view(&first.businesses, &filters, &ctx());
        assert_eq!(first.businesses, second.businesses);
        let names: Vec<&str> = first.businesses.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, ["Ten", "Three", "Business 4"]);
    }
}
