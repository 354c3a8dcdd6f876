//! Domain model and configuration shared by the lfdash crates.
//!
//! Nothing here performs I/O beyond reading the environment and the rep
//! roster file; all network access lives in `lfdash-client`.

pub mod app_config;
pub mod config;
pub mod error;
pub mod model;
pub mod range;
pub mod reps;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use error::{ConfigError, CoreError};
pub use model::{
    Business, BusinessId, Location, PageSummary, PageVisit, RepUser, Visit, VisitId, VisitStats,
};
pub use range::{DateRange, RangeOption};
pub use reps::{load_reps, normalize_code, parse_reps, RepConfig, RepRoster};
