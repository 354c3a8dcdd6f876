use std::borrow::Borrow;
use std::cmp::Ordering;

use lfdash_core::Business;

use crate::filter::SortMode;

/// Total order for `mode`. Name then id break remaining ties, so sorting is
/// deterministic for any input order.
#[must_use]
pub fn compare(a: &Business, b: &Business, mode: SortMode) -> Ordering {
    let primary = match mode {
        SortMode::Activity | SortMode::Visits => b
            .visits
            .cmp(&a.visits)
            .then_with(|| b.pages.cmp(&a.pages)),
        SortMode::Pages => b
            .pages
            .cmp(&a.pages)
            .then_with(|| b.visits.cmp(&a.visits)),
    };
    primary
        .then_with(|| b.last_visit.cmp(&a.last_visit))
        .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        .then_with(|| a.id.cmp(&b.id))
}

pub fn sort_businesses<B: Borrow<Business>>(items: &mut [B], mode: SortMode) {
    items.sort_by(|a, b| compare(a.borrow(), b.borrow(), mode));
}
