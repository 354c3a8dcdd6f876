use std::collections::HashMap;
use std::fmt;

use lfdash_core::{
    Business, BusinessId, DateRange, PageSummary, RangeOption, RepConfig, Visit, VisitId,
    VisitStats,
};

use crate::filter::FilterState;
use crate::view::DerivedView;

/// Who the dashboard is showing data for.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Unauthenticated,
    /// Signed in as one rep; data is limited to businesses assigned to them.
    RepScoped {
        rep: RepConfig,
        /// Vendor user id, from the roster or resolved by name on first refresh.
        user_id: Option<String>,
    },
    /// Every visit in range, regardless of assignment.
    AllActivity,
}

impl Mode {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        !matches!(self, Mode::Unauthenticated)
    }

    /// Demo seed key and display label.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Mode::Unauthenticated => "",
            Mode::RepScoped { rep, .. } => &rep.code,
            Mode::AllActivity => "ALL",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Unauthenticated => f.write_str("signed out"),
            Mode::RepScoped { rep, .. } => write!(f, "{} • {}", rep.code, rep.name),
            Mode::AllActivity => f.write_str("all activity"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Ready,
    Loading,
    Live,
    Demo,
    Error(String),
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Ready => f.write_str("Ready"),
            Status::Loading => f.write_str("Loading…"),
            Status::Live => f.write_str("Live"),
            Status::Demo => f.write_str("Demo data (set LFDASH_PROXY_URL)"),
            Status::Error(message) => write!(f, "Error loading: {message}"),
        }
    }
}

/// How complete the loaded data set is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Coverage {
    pub pages_fetched: u32,
    pub total_pages: Option<u32>,
    pub capped: bool,
    pub error_count: u32,
    pub fallbacks: usize,
}

impl Coverage {
    #[must_use]
    pub fn is_partial(&self) -> bool {
        self.capped || self.error_count > 0
    }
}

/// Per-id detail lookups. All of them are scoped to the loaded range.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailCaches {
    pub pages: HashMap<BusinessId, Vec<PageSummary>>,
    pub visits: HashMap<BusinessId, Vec<Visit>>,
    pub visit_stats: HashMap<BusinessId, VisitStats>,
    pub ips: HashMap<VisitId, String>,
}

impl DetailCaches {
    pub fn clear(&mut self) {
        self.pages.clear();
        self.visits.clear();
        self.visit_stats.clear();
        self.ips.clear();
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
            && self.visits.is_empty()
            && self.visit_stats.is_empty()
            && self.ips.is_empty()
    }
}

/// The single source of truth behind every rendered panel.
#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    pub mode: Mode,
    pub range: RangeOption,
    /// Window of the data currently loaded.
    pub window: Option<DateRange>,
    pub filters: FilterState,
    pub businesses: Vec<Business>,
    pub recent: Vec<Visit>,
    pub coverage: Coverage,
    pub status: Status,
    pub loading: bool,
    /// Set once the proxy has answered 429 this session.
    pub rate_limited: bool,
    pub ips_unlocked: bool,
    pub caches: DetailCaches,
    pub view: DerivedView,
    pub(crate) generation: u64,
}

impl DashboardState {
    /// Generation of the most recently started refresh.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn clear_data(&mut self) {
        self.businesses.clear();
        self.recent.clear();
        self.window = None;
        self.coverage = Coverage::default();
        self.caches.clear();
    }
}
