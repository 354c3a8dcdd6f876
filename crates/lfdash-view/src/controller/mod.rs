//! View-state controller.
//!
//! [`Dashboard`] owns the canonical [`DashboardState`] and exposes one entry
//! point per user action. Each entry point finishes by re-deriving the full
//! [`DerivedView`], so the list, tiles, and reports always describe the same
//! data.
//!
//! Refreshes are split into [`Dashboard::begin_refresh`], [`RefreshPlan::run`],
//! and [`Dashboard::complete_refresh`]. Every `begin_refresh` bumps a
//! generation counter and only the outcome of the latest generation is
//! applied; anything older is discarded.

mod state;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use lfdash_client::pages::summarize_business_pages;
use lfdash_client::{
    aggregate_visits, enrich_businesses, hydrate_assigned, AggregateSettings, ClientSettings, Lane,
    PageQuery, ProxyClient, ProxyError,
};
use lfdash_core::{
    normalize_code, AppConfig, Business, BusinessId, DateRange, PageSummary, RangeOption,
    RepConfig, RepRoster, RepUser, Visit, VisitId, VisitStats,
};

use crate::access::AccessGate;
use crate::demo;
use crate::error::{DashboardError, SignInError};
use crate::filter::{FilterContext, FilterState, Tile};
use crate::view::{derive_view, DerivedView};

pub use state::{Coverage, DashboardState, DetailCaches, Mode, Status};

/// Where refresh data comes from.
#[derive(Debug, Clone)]
pub enum Source {
    Live(Arc<ProxyClient>),
    /// Deterministic synthetic data; used when no proxy URL is configured.
    Demo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardSettings {
    pub aggregate: AggregateSettings,
    pub enrich_batch_size: usize,
    /// Visits sampled when summarizing a business's pages.
    pub page_summary_visits: u32,
}

impl DashboardSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            aggregate: AggregateSettings::from_app_config(config),
            enrich_batch_size: config.enrich_batch_size,
            ..Self::default()
        }
    }
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            aggregate: AggregateSettings::default(),
            enrich_batch_size: 5,
            page_summary_visits: 10,
        }
    }
}

/// What happened to a refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshApplied {
    Updated,
    /// The refresh failed; the previous data is still shown.
    Failed(String),
    /// A newer refresh started before this one finished.
    Discarded,
    NotSignedIn,
}

/// Data produced by one refresh.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub businesses: Vec<Business>,
    pub recent: Vec<Visit>,
    pub ips: HashMap<VisitId, String>,
    pub coverage: Coverage,
    pub resolved_user_id: Option<String>,
    pub live: bool,
    pub rate_limited: bool,
}

/// Everything a refresh needs, captured when it starts.
#[derive(Debug, Clone)]
pub struct RefreshPlan {
    generation: u64,
    mode: Mode,
    range: RangeOption,
    window: DateRange,
    source: Source,
    settings: DashboardSettings,
}

#[derive(Debug)]
pub struct RefreshOutcome {
    generation: u64,
    window: DateRange,
    result: Result<Snapshot, DashboardError>,
}

impl RefreshOutcome {
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl RefreshPlan {
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub async fn run(self) -> RefreshOutcome {
        let result = match &self.source {
            Source::Demo => Ok(self.demo_snapshot()),
            Source::Live(client) => self.live_snapshot(client).await,
        };
        RefreshOutcome {
            generation: self.generation,
            window: self.window,
            result,
        }
    }

    fn demo_snapshot(&self) -> Snapshot {
        let data = demo::demo_snapshot(self.mode.key(), self.range, self.window.end);
        let ips = data
            .recent
            .iter()
            .filter_map(|v| Some((v.id.clone()?, v.ip.clone()?)))
            .collect();
        Snapshot {
            businesses: data.businesses,
            recent: data.recent,
            ips,
            ..Snapshot::default()
        }
    }

    async fn live_snapshot(&self, client: &ProxyClient) -> Result<Snapshot, DashboardError> {
        let mut snapshot = match &self.mode {
            Mode::Unauthenticated => return Err(DashboardError::NotSignedIn),
            Mode::AllActivity => {
                let agg = aggregate_visits(client, &self.window, self.settings.aggregate).await?;
                let enrichment =
                    enrich_businesses(client, &agg.ordered(), self.settings.enrich_batch_size)
                        .await;
                Snapshot {
                    businesses: enrichment.businesses,
                    coverage: Coverage {
                        pages_fetched: agg.pages_fetched,
                        total_pages: agg.total_pages,
                        capped: agg.capped,
                        error_count: agg.error_count,
                        fallbacks: enrichment.fallbacks,
                    },
                    recent: agg.recent,
                    ips: agg.ip_harvest,
                    ..Snapshot::default()
                }
            }
            Mode::RepScoped { rep, user_id } => {
                let user_id = match user_id {
                    Some(id) => id.clone(),
                    None => resolve_user_id(client, rep).await?,
                };
                let (mut businesses, coverage) =
                    fetch_assigned(client, &user_id, &self.window, self.settings.aggregate)
                        .await?;
                hydrate_assigned(
                    client,
                    &mut businesses,
                    &self.window,
                    self.settings.enrich_batch_size,
                )
                .await;
                Snapshot {
                    businesses,
                    coverage,
                    resolved_user_id: Some(user_id),
                    ..Snapshot::default()
                }
            }
        };
        snapshot.live = true;
        snapshot.rate_limited = client.was_throttled();
        Ok(snapshot)
    }
}

/// Finds the rep's vendor user id by display name.
async fn resolve_user_id(client: &ProxyClient, rep: &RepConfig) -> Result<String, DashboardError> {
    let by_name = |users: Vec<RepUser>| {
        users
            .into_iter()
            .find(|u| u.name.trim().eq_ignore_ascii_case(rep.name.trim()))
            .map(|u| u.id)
    };
    if let Some(id) = by_name(client.assigned_to_list().await?) {
        return Ok(id);
    }
    if let Some(id) = by_name(client.portal_logins().await?) {
        return Ok(id);
    }
    Err(DashboardError::UnresolvedRep {
        code: rep.code.clone(),
        name: rep.name.clone(),
    })
}

/// Pages through a rep's assigned businesses, keeping the first record per id.
async fn fetch_assigned(
    client: &ProxyClient,
    user_id: &str,
    window: &DateRange,
    settings: AggregateSettings,
) -> Result<(Vec<Business>, Coverage), ProxyError> {
    let page_size = settings.page_size.max(1);
    let mut query = PageQuery::first(page_size);
    let first = client
        .businesses_by_assigned_to_page(user_id, window, query)
        .await?;

    let mut coverage = Coverage {
        pages_fetched: 1,
        total_pages: first.page_count,
        ..Coverage::default()
    };
    let mut last_full = first.items.len() >= page_size as usize;
    let mut businesses = first.items;

    loop {
        let more = match coverage.total_pages {
            Some(total) => query.page_no < total,
            None => last_full,
        };
        if !more {
            break;
        }
        if query.page_no >= settings.max_pages.max(1) {
            coverage.capped = true;
            break;
        }
        query = query.next();
        match client
            .businesses_by_assigned_to_page(user_id, window, query)
            .await
        {
            Ok(page) => {
                coverage.pages_fetched += 1;
                last_full = page.items.len() >= page_size as usize;
                businesses.extend(page.items);
            }
            Err(e) => {
                coverage.error_count += 1;
                tracing::warn!(page = query.page_no, error = %e, "assigned business page fetch failed");
                if coverage.total_pages.is_none() {
                    break;
                }
            }
        }
    }

    let mut seen = HashSet::new();
    businesses.retain(|b| b.id.as_ref().is_none_or(|id| seen.insert(id.clone())));
    Ok((businesses, coverage))
}

/// Settings panel contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsView {
    pub mode: String,
    pub rep: Option<String>,
    pub range: RangeOption,
    pub source: &'static str,
    pub proxy_url: Option<String>,
}

/// The dashboard: state, data source, and the entry points that mutate them.
#[derive(Debug)]
pub struct Dashboard {
    state: DashboardState,
    source: Source,
    roster: RepRoster,
    ip_gate: AccessGate,
    codes_gate: AccessGate,
    settings: DashboardSettings,
    clock: fn() -> DateTime<Utc>,
}

impl Dashboard {
    #[must_use]
    pub fn new(source: Source, roster: RepRoster, settings: DashboardSettings) -> Self {
        let mut dashboard = Self {
            state: DashboardState::default(),
            source,
            roster,
            ip_gate: AccessGate::closed_when_unset(None),
            codes_gate: AccessGate::open_when_unset(None),
            settings,
            clock: Utc::now,
        };
        dashboard.rederive();
        dashboard
    }

    /// Builds a live dashboard when a proxy URL is configured, else a demo one.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError`] if the proxy client cannot be constructed.
    pub fn from_app_config(config: &AppConfig, roster: RepRoster) -> Result<Self, ProxyError> {
        let source = match &config.proxy_url {
            Some(url) => Source::Live(Arc::new(ProxyClient::new(
                url,
                ClientSettings::from_app_config(config),
            )?)),
            None => Source::Demo,
        };
        Ok(Self::new(source, roster, DashboardSettings::from_app_config(config))
            .with_access_codes(
                config.ip_access_code.clone(),
                config.codes_access_code.clone(),
            ))
    }

    /// IP visibility stays locked without an IP code; the code listing is
    /// open without a codes code.
    #[must_use]
    pub fn with_access_codes(mut self, ip_code: Option<String>, codes_code: Option<String>) -> Self {
        self.ip_gate = AccessGate::closed_when_unset(ip_code);
        self.codes_gate = AccessGate::open_when_unset(codes_code);
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self.rederive();
        self
    }

    #[must_use]
    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    #[must_use]
    pub fn view(&self) -> &DerivedView {
        &self.state.view
    }

    #[must_use]
    pub fn roster(&self) -> &RepRoster {
        &self.roster
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        matches!(self.source, Source::Live(_))
    }

    /// Checks a sign-in code against the roster.
    ///
    /// # Errors
    ///
    /// [`SignInError::InvalidFormat`] unless the code is three letters,
    /// [`SignInError::UnknownCode`] if it is not in the roster.
    pub fn validate_code(&self, raw: &str) -> Result<RepConfig, SignInError> {
        let code = normalize_code(raw);
        if code.chars().count() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(SignInError::InvalidFormat);
        }
        self.roster
            .lookup(&code)
            .cloned()
            .ok_or_else(|| SignInError::UnknownCode {
                code,
                known: self.roster.codes().map(str::to_string).collect(),
            })
    }

    /// Restores a previous session's mode and range without fetching.
    pub fn resume(&mut self, mode: Mode, range: RangeOption) {
        self.state.mode = mode;
        self.state.range = range;
        self.state.clear_data();
        self.rederive();
    }

    /// Signs in as a rep and loads their data.
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError::SignIn`] for a rejected code; the current
    /// state is left untouched in that case.
    pub async fn sign_in(&mut self, raw_code: &str) -> Result<RefreshApplied, DashboardError> {
        let rep = self.validate_code(raw_code)?;
        tracing::info!(code = %rep.code, "signed in");
        let user_id = rep.user_id.clone();
        self.enter_mode(Mode::RepScoped { rep, user_id });
        Ok(self.refresh().await)
    }

    /// Switches to the all-activity view and loads it.
    pub async fn explore(&mut self) -> RefreshApplied {
        self.enter_mode(Mode::AllActivity);
        self.refresh().await
    }

    /// From a rep session, returns to the signed-out state. From the
    /// all-activity view, stays there but resets filters and caches.
    pub fn sign_out(&mut self) {
        match self.state.mode {
            Mode::Unauthenticated => {}
            Mode::RepScoped { .. } => {
                self.state.mode = Mode::Unauthenticated;
                self.state.clear_data();
                self.state.filters = FilterState::default();
                self.state.ips_unlocked = false;
                self.state.status = Status::Ready;
                self.abandon_in_flight();
            }
            Mode::AllActivity => {
                self.state.caches.clear();
                self.state.filters = FilterState::default();
                self.state.ips_unlocked = false;
            }
        }
        self.rederive();
    }

    /// Changes the lookback range. Detail caches are dropped since they are
    /// range-scoped; the data is reloaded when signed in.
    pub async fn set_range(&mut self, range: RangeOption) -> RefreshApplied {
        self.state.range = range;
        self.state.caches.clear();
        if self.state.mode.is_authenticated() {
            self.refresh().await
        } else {
            self.rederive();
            RefreshApplied::NotSignedIn
        }
    }

    pub fn set_filters(&mut self, filters: FilterState) {
        self.state.filters = filters;
        self.rederive();
    }

    /// Toggles a tile; at most one tile is active.
    pub fn click_tile(&mut self, tile: Tile) {
        self.state.filters.toggle_tile(tile);
        self.rederive();
    }

    /// Returns whether IPs are now visible.
    pub fn unlock_ips(&mut self, code: &str) -> bool {
        self.state.ips_unlocked = self.ip_gate.check(Some(code));
        self.state.ips_unlocked
    }

    /// The rep roster, behind the codes gate.
    ///
    /// # Errors
    ///
    /// [`DashboardError::AccessDenied`] if the gate is closed to `access`.
    pub fn rep_codes(&self, access: Option<&str>) -> Result<Vec<&RepConfig>, DashboardError> {
        if !self.codes_gate.check(access) {
            return Err(DashboardError::AccessDenied);
        }
        Ok(self.roster.iter().collect())
    }

    #[must_use]
    pub fn settings_view(&self) -> SettingsView {
        let (source, proxy_url) = match &self.source {
            Source::Live(client) => ("Live", Some(client.base_url().to_string())),
            Source::Demo => ("Demo", None),
        };
        SettingsView {
            mode: self.state.mode.to_string(),
            rep: match &self.state.mode {
                Mode::RepScoped { rep, .. } => Some(rep.code.clone()),
                _ => None,
            },
            range: self.state.range,
            source,
            proxy_url,
        }
    }

    /// Reloads data for the current mode and range.
    pub async fn refresh(&mut self) -> RefreshApplied {
        let Ok(plan) = self.begin_refresh() else {
            return RefreshApplied::NotSignedIn;
        };
        let outcome = plan.run().await;
        self.complete_refresh(outcome)
    }

    /// Starts a refresh generation. Any outcome from an earlier generation
    /// will be discarded.
    ///
    /// # Errors
    ///
    /// [`DashboardError::NotSignedIn`] when signed out.
    pub fn begin_refresh(&mut self) -> Result<RefreshPlan, DashboardError> {
        if !self.state.mode.is_authenticated() {
            return Err(DashboardError::NotSignedIn);
        }
        self.state.generation += 1;
        self.state.loading = true;
        self.state.status = Status::Loading;
        Ok(RefreshPlan {
            generation: self.state.generation,
            mode: self.state.mode.clone(),
            range: self.state.range,
            window: self.state.range.window_ending((self.clock)()),
            source: self.source.clone(),
            settings: self.settings,
        })
    }

    /// Applies `outcome` if it belongs to the latest generation.
    pub fn complete_refresh(&mut self, outcome: RefreshOutcome) -> RefreshApplied {
        if outcome.generation != self.state.generation {
            tracing::info!(
                generation = outcome.generation,
                latest = self.state.generation,
                "discarding stale refresh result"
            );
            return RefreshApplied::Discarded;
        }
        self.state.loading = false;

        let applied = match outcome.result {
            Ok(snapshot) => {
                if let (Mode::RepScoped { user_id, .. }, Some(resolved)) =
                    (&mut self.state.mode, snapshot.resolved_user_id)
                {
                    user_id.get_or_insert(resolved);
                }
                self.state.businesses = snapshot.businesses;
                self.state.recent = snapshot.recent;
                self.state.window = Some(outcome.window);
                self.state.coverage = snapshot.coverage;
                self.state.caches.ips.extend(snapshot.ips);
                self.state.rate_limited |= snapshot.rate_limited;
                self.state.status = if snapshot.live {
                    Status::Live
                } else {
                    Status::Demo
                };
                if snapshot.coverage.is_partial() {
                    tracing::warn!(
                        capped = snapshot.coverage.capped,
                        errors = snapshot.coverage.error_count,
                        "loaded data is incomplete"
                    );
                }
                RefreshApplied::Updated
            }
            Err(e) => {
                tracing::warn!(error = %e, "refresh failed; keeping previous data");
                if let Source::Live(client) = &self.source {
                    self.state.rate_limited |= client.was_throttled();
                }
                let message = e.to_string();
                self.state.status = Status::Error(message.clone());
                RefreshApplied::Failed(message)
            }
        };
        self.rederive();
        applied
    }

    /// Page summary for one business, cached per id.
    ///
    /// # Errors
    ///
    /// [`DashboardError::NotLoaded`] before the first refresh, or the
    /// proxy error from the lookup.
    pub async fn business_pages(&mut self, id: &BusinessId) -> Result<Vec<PageSummary>, DashboardError> {
        if let Some(cached) = self.state.caches.pages.get(id) {
            return Ok(cached.clone());
        }
        let window = self.state.window.ok_or(DashboardError::NotLoaded)?;
        let pages = match &self.source {
            Source::Live(client) => {
                let client = Arc::clone(client);
                summarize_business_pages(&client, id, &window, self.settings.page_summary_visits)
                    .await?
            }
            Source::Demo => self.find(id).map(demo::demo_pages).unwrap_or_default(),
        };
        self.state.caches.pages.insert(id.clone(), pages.clone());
        Ok(pages)
    }

    /// Visits for one business in the loaded range, newest first, cached per
    /// id. IPs are stripped unless unlocked.
    ///
    /// # Errors
    ///
    /// [`DashboardError::NotLoaded`] before the first refresh, or the
    /// proxy error from the lookup.
    pub async fn business_visits(&mut self, id: &BusinessId) -> Result<Vec<Visit>, DashboardError> {
        if !self.state.caches.visits.contains_key(id) {
            let window = self.state.window.ok_or(DashboardError::NotLoaded)?;
            let mut visits = match &self.source {
                Source::Live(client) => {
                    let client = Arc::clone(client);
                    let query = PageQuery::first(self.settings.aggregate.page_size);
                    client
                        .visits_by_business_page(Lane::Serial, id, &window, query)
                        .await?
                        .items
                }
                Source::Demo => self
                    .find(id)
                    .map(|b| demo::demo_visits(b, &window))
                    .unwrap_or_default(),
            };
            visits.sort_by(|a, b| b.started_at.cmp(&a.started_at));

            let mut stats = VisitStats::default();
            for visit in &visits {
                stats.record(visit);
                if let (Some(visit_id), Some(ip)) = (&visit.id, &visit.ip) {
                    self.state.caches.ips.insert(visit_id.clone(), ip.clone());
                }
            }
            self.state.caches.visit_stats.insert(id.clone(), stats);
            self.state.caches.visits.insert(id.clone(), visits);
        }

        let mut visits = self
            .state
            .caches
            .visits
            .get(id)
            .cloned()
            .unwrap_or_default();
        if !self.state.ips_unlocked {
            for visit in &mut visits {
                visit.ip = None;
            }
        }
        Ok(visits)
    }

    /// IP for one visit, from the harvest cache or a detail lookup.
    ///
    /// # Errors
    ///
    /// [`DashboardError::AccessDenied`] unless IPs are unlocked, or the
    /// proxy error from the lookup.
    pub async fn visit_ip(&mut self, id: &VisitId) -> Result<Option<String>, DashboardError> {
        if !self.state.ips_unlocked {
            return Err(DashboardError::AccessDenied);
        }
        if let Some(ip) = self.state.caches.ips.get(id) {
            return Ok(Some(ip.clone()));
        }
        let Source::Live(client) = &self.source else {
            return Ok(None);
        };
        let client = Arc::clone(client);
        let ip = client.visit_details(id).await?.and_then(|v| v.ip);
        if let Some(ip) = &ip {
            self.state.caches.ips.insert(id.clone(), ip.clone());
        }
        Ok(ip)
    }

    fn find(&self, id: &BusinessId) -> Option<&Business> {
        self.state
            .businesses
            .iter()
            .find(|b| b.id.as_ref() == Some(id))
    }

    fn enter_mode(&mut self, mode: Mode) {
        if self.state.mode != mode {
            self.state.clear_data();
        }
        self.state.caches.clear();
        self.state.mode = mode;
    }

    /// Makes any in-flight refresh stale without starting a new one.
    fn abandon_in_flight(&mut self) {
        self.state.generation += 1;
        self.state.loading = false;
    }

    fn rederive(&mut self) {
        let window = self
            .state
            .window
            .unwrap_or_else(|| self.state.range.window_ending((self.clock)()));
        let ctx = FilterContext::for_window(&window);
        self.state.view = derive_view(&self.state.businesses, &self.state.filters, &ctx);
    }
}

#[cfg(test)]
#[path = "../controller_test.rs"]
mod tests;
