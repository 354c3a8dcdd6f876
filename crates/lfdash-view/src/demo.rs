//! Deterministic synthetic data for running without a proxy.
//!
//! Output depends only on the seed key (rep code or `ALL`), the range, and
//! the `now` passed in.

use chrono::{DateTime, TimeDelta, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use lfdash_core::{
    Business, BusinessId, DateRange, Location, PageSummary, RangeOption, Visit, VisitId,
};

const COMPANIES: [&str; 12] = [
    "Ahlstrom",
    "ACME Manufacturing",
    "Blue River Tooling",
    "Delta Packaging",
    "Evergreen Supply",
    "Frontier Hydraulics",
    "Great Lakes Paper",
    "Henderson Foundry",
    "IronWorks MRO",
    "Juniper Plastics",
    "Keystone Conveyor",
    "Lakeshore Fabrication",
];

const PLACES: [(&str, &str); 8] = [
    ("Cincinnati", "OH"),
    ("Louisville", "KY"),
    ("Indianapolis", "IN"),
    ("Dayton", "OH"),
    ("Nashville", "TN"),
    ("Columbus", "OH"),
    ("Lexington", "KY"),
    ("Fort Wayne", "IN"),
];

const INDUSTRIES: [&str; 5] = [
    "Manufacturing",
    "Paper & Packaging",
    "Food Processing",
    "Metal Fabrication",
    "Wholesale Distribution",
];

const PAGES: [(&str, &str); 9] = [
    ("/bearings/6205", "6205 Deep Groove Bearing"),
    ("/belts/3vx", "3VX Cogged V-Belts"),
    ("/seals/viton", "Viton Oil Seals"),
    ("/couplings/lovejoy", "Lovejoy Jaw Couplings"),
    ("/lubrication/grease", "Industrial Grease"),
    ("/pulleys/sheaves", "Sheaves & Pulleys"),
    ("/hydraulics/fittings", "Hydraulic Fittings"),
    ("/shop/checkout", "Checkout"),
    ("/contact", "Contact Us"),
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DemoSnapshot {
    pub businesses: Vec<Business>,
    pub recent: Vec<Visit>,
}

/// Stable seed from a key and range; independent of process or platform.
#[must_use]
pub fn demo_seed(key: &str, range: RangeOption) -> u64 {
    let hours = u64::try_from(range.duration().num_hours()).unwrap_or(0);
    key.bytes()
        .fold(hours, |acc, b| acc.wrapping_mul(31).wrapping_add(u64::from(b)))
}

fn minutes_in(window: &DateRange) -> i64 {
    window.length().num_minutes().max(1)
}

fn slug(name: &str) -> String {
    name.chars()
        .filter(char::is_ascii_alphanumeric)
        .collect::<String>()
        .to_lowercase()
}

/// Businesses and a recent-visit sample for one rep (or `ALL`) and range.
#[must_use]
pub fn demo_snapshot(key: &str, range: RangeOption, now: DateTime<Utc>) -> DemoSnapshot {
    let mut rng = StdRng::seed_from_u64(demo_seed(key, range));
    let window = range.window_ending(now);
    let span = minutes_in(&window);

    let count = rng.random_range(7..=COMPANIES.len());
    let offset = rng.random_range(0..COMPANIES.len());
    let mut businesses = Vec::with_capacity(count);
    for i in 0..count {
        let name = COMPANIES[(offset + i) % COMPANIES.len()];
        let (city, state) = PLACES[rng.random_range(0..PLACES.len())];
        let visits: u64 = rng.random_range(1..=12);
        let last_ago = rng.random_range(0..span);
        let first_visit = if rng.random_bool(0.3) {
            Some(now - TimeDelta::minutes(rng.random_range(last_ago..=span)))
        } else {
            Some(window.start - TimeDelta::days(rng.random_range(1..=180)))
        };
        businesses.push(Business {
            id: BusinessId::new(&format!("demo-{}", (offset + i) % COMPANIES.len())),
            name: name.to_string(),
            location: Location {
                city: Some(city.to_string()),
                state: Some(state.to_string()),
                country: Some("USA".to_string()),
            },
            industry: Some(INDUSTRIES[rng.random_range(0..INDUSTRIES.len())].to_string()),
            website: Some(format!("https://www.{}.com", slug(name))),
            phone: Some(format!("555-01{:02}", rng.random_range(0..100))),
            employees: Some(rng.random_range(10..=2_000)),
            address: None,
            visits,
            pages: visits * rng.random_range(1..=5),
            last_visit: Some(now - TimeDelta::minutes(last_ago)),
            first_visit,
            is_new: None,
            generic: false,
        });
    }

    let mut recent: Vec<Visit> = (0..9u32)
        .map(|i| {
            let business = &businesses[i as usize % businesses.len()];
            let minutes_ago = (i64::from(i) * 37 + rng.random_range(0..span)) % span;
            let started = now - TimeDelta::minutes(minutes_ago);
            Visit {
                id: VisitId::new(&format!("demo-visit-{i}")),
                business_id: business.id.clone(),
                started_at: Some(started),
                ended_at: Some(started + TimeDelta::minutes(rng.random_range(1..=15))),
                pages: rng.random_range(1..=6),
                ip: Some(format!("203.0.113.{}", rng.random_range(1..=254))),
                referrer: None,
            }
        })
        .collect();
    recent.sort_by(|a, b| b.started_at.cmp(&a.started_at));

    DemoSnapshot { businesses, recent }
}

/// Visits for one demo business, newest first. One visit per recorded visit, up to 20.
#[must_use]
pub fn demo_visits(business: &Business, window: &DateRange) -> Vec<Visit> {
    let Some(id) = &business.id else {
        return Vec::new();
    };
    let mut rng = StdRng::seed_from_u64(demo_seed(id.as_str(), RangeOption::Hours(1)));
    let span = minutes_in(window);
    let mut visits: Vec<Visit> = (0..business.visits.min(20))
        .map(|i| {
            let started = window.end - TimeDelta::minutes(rng.random_range(0..span));
            Visit {
                id: VisitId::new(&format!("{id}-v{i}")),
                business_id: Some(id.clone()),
                started_at: Some(started),
                ended_at: Some(started + TimeDelta::minutes(rng.random_range(1..=15))),
                pages: rng.random_range(1..=6),
                ip: Some(format!("198.51.100.{}", rng.random_range(1..=254))),
                referrer: Some("https://www.google.com/".to_string()),
            }
        })
        .collect();
    visits.sort_by(|a, b| b.started_at.cmp(&a.started_at));
    visits
}

/// Page summary for one demo business, most viewed first.
#[must_use]
pub fn demo_pages(business: &Business) -> Vec<PageSummary> {
    let key = business.id.as_ref().map_or(business.name.as_str(), BusinessId::as_str);
    let mut rng = StdRng::seed_from_u64(demo_seed(key, RangeOption::Days(1)));
    let count = rng.random_range(2..=5);
    let start = rng.random_range(0..PAGES.len());
    let mut pages: Vec<PageSummary> = (0..count)
        .map(|i| {
            let (url, title) = PAGES[(start + i) % PAGES.len()];
            PageSummary {
                url: url.to_string(),
                title: Some(title.to_string()),
                views: rng.random_range(1..=business.pages.max(1)),
                avg_duration_secs: Some(f64::from(rng.random_range(5u32..=240))),
            }
        })
        .collect();
    pages.sort_by(|a, b| b.views.cmp(&a.views).then_with(|| a.url.cmp(&b.url)));
    pages
}
