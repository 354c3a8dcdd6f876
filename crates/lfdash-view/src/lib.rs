//! Derived views and view-state control for the visitor dashboard.
//!
//! [`filter`], [`sort`], [`report`], and [`view`] are pure functions over
//! the business collection. [`controller::Dashboard`] owns the mutable state
//! and re-derives the view after every action.

pub mod access;
pub mod controller;
pub mod demo;
pub mod error;
pub mod filter;
pub mod report;
pub mod sort;
pub mod view;

pub use access::AccessGate;
pub use controller::{
    Coverage, Dashboard, DashboardSettings, DashboardState, Mode, RefreshApplied, RefreshPlan,
    SettingsView, Source, Status,
};
pub use error::{DashboardError, ParseOptionError, SignInError};
pub use filter::{FilterContext, FilterState, SortMode, Tile};
pub use report::{time_ago, GroupCount, GroupKey, RecencyBucket};
pub use view::{derive_view, DerivedView, TileCounts};
