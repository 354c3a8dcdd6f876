//! Plain-text rendering of dashboard views.

use chrono::{DateTime, Utc};

use lfdash_core::{Business, PageSummary, RepConfig, Visit};
use lfdash_view::{time_ago, Dashboard, DashboardState, GroupCount, SettingsView};

const NAME_WIDTH: usize = 36;

/// `"AOS • Andrew Osborne | 7d | Live"`, plus coverage and throttling notes.
#[must_use]
pub fn status_line(state: &DashboardState) -> String {
    let mut line = format!("{} | {} | {}", state.mode, state.range, state.status);
    let coverage = state.coverage;
    if coverage.capped {
        match coverage.total_pages {
            Some(total) => line.push_str(&format!(
                " | showing {} of {total} pages",
                coverage.pages_fetched
            )),
            None => line.push_str(&format!(" | stopped after {} pages", coverage.pages_fetched)),
        }
    }
    if coverage.error_count > 0 {
        line.push_str(&format!(" | {} pages failed", coverage.error_count));
    }
    if state.rate_limited {
        line.push_str(" | rate limited");
    }
    line
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

#[must_use]
pub fn business_row(business: &Business, now: DateTime<Utc>) -> String {
    let id = business.id.as_ref().map_or("-", |id| id.as_str());
    format!(
        "{:<name_w$}  {:>6}  {:>6}  {:>5}  {:<10}  {}",
        truncate(&business.name, NAME_WIDTH),
        business.visits,
        business.pages,
        time_ago(business.last_visit, now),
        id,
        business.location.display(),
        name_w = NAME_WIDTH,
    )
}

fn group_line(title: &str, groups: &[GroupCount]) -> String {
    if groups.is_empty() {
        return format!("{title}: —");
    }
    let parts: Vec<String> = groups
        .iter()
        .map(|g| format!("{} ({})", g.label, g.weight))
        .collect();
    format!("{title}: {}", parts.join(", "))
}

/// Formats seconds as `"45s"` or `"3m 05s"`.
#[must_use]
pub fn duration_label(secs: f64) -> String {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let total = secs.max(0.0).round() as u64;
    if total < 60 {
        format!("{total}s")
    } else {
        format!("{}m {:02}s", total / 60, total % 60)
    }
}

pub fn print_dashboard(dashboard: &Dashboard, limit: usize, now: DateTime<Utc>) {
    let state = dashboard.state();
    let view = dashboard.view();
    println!("{}", status_line(state));
    println!(
        "New {}  |  Visits {}  |  Returning {}",
        view.tiles.new, view.tiles.visits, view.tiles.returning
    );
    println!();

    if view.businesses.is_empty() {
        println!("No businesses match ({} loaded).", view.total);
    } else {
        println!(
            "{:<name_w$}  {:>6}  {:>6}  {:>5}  {:<10}  LOCATION",
            "BUSINESS",
            "VISITS",
            "PAGES",
            "LAST",
            "ID",
            name_w = NAME_WIDTH,
        );
        for business in view.businesses.iter().take(limit) {
            println!("{}", business_row(business, now));
        }
        if view.businesses.len() > limit {
            println!("… {} more", view.businesses.len() - limit);
        }
        println!("{} of {} businesses", view.businesses.len(), view.total);
    }

    let reports = &view.reports;
    println!();
    println!("{}", group_line("Top states", &reports.top_states));
    println!("{}", group_line("Top industries", &reports.top_industries));
    println!("{}", group_line("Top countries", &reports.top_countries));
    let recency: Vec<String> = reports
        .recency
        .iter()
        .map(|b| format!("{} {}", b.label, b.count))
        .collect();
    println!("Last visit: {}", recency.join(" | "));
    if !reports.recent.is_empty() {
        let recent: Vec<String> = reports
            .recent
            .iter()
            .map(|b| format!("{} ({})", b.name, time_ago(b.last_visit, now)))
            .collect();
        println!("Recently active: {}", recent.join(", "));
    }
}

pub fn print_pages(pages: &[PageSummary]) {
    if pages.is_empty() {
        println!("No page views in range.");
        return;
    }
    println!("{:>5}  {:>8}  PAGE", "VIEWS", "AVG");
    for page in pages {
        let avg = page.avg_duration_secs.map_or_else(|| "—".to_string(), duration_label);
        let label = page.title.as_deref().filter(|t| !t.is_empty()).unwrap_or(&page.url);
        println!("{:>5}  {avg:>8}  {label}", page.views);
    }
}

pub fn print_visits(visits: &[Visit], now: DateTime<Utc>) {
    if visits.is_empty() {
        println!("No visits in range.");
        return;
    }
    for visit in visits {
        let id = visit.id.as_ref().map_or("-", |id| id.as_str());
        let mut line = format!(
            "{:<10}  {:>5}  {:>3} pages",
            id,
            time_ago(visit.started_at, now),
            visit.pages
        );
        if let Some(referrer) = &visit.referrer {
            line.push_str(&format!("  from {referrer}"));
        }
        if let Some(ip) = &visit.ip {
            line.push_str(&format!("  [{ip}]"));
        }
        println!("{line}");
    }
}

pub fn print_codes(reps: &[&RepConfig]) {
    for rep in reps {
        println!("{}  {}", rep.code, rep.name);
    }
}

pub fn print_settings(settings: &SettingsView) {
    println!("Mode:      {}", settings.mode);
    println!("Rep:       {}", settings.rep.as_deref().unwrap_or("—"));
    println!("Range:     {}", settings.range);
    println!("Source:    {}", settings.source);
    println!(
        "Proxy URL: {}",
        settings.proxy_url.as_deref().unwrap_or("(not set)")
    );
}
