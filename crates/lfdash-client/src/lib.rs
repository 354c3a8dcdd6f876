//! Client-side data layer for the visitor-intelligence proxy.
//!
//! - [`client`]: the rate-limited, serialized request pipeline.
//! - [`normalize`], [`dates`], [`geo`], [`heuristic`]: mapping loosely-typed
//!   vendor JSON onto the `lfdash-core` model.
//! - [`aggregate`], [`enrich`], [`pages`]: paginated visit aggregation,
//!   business hydration, and page-visit roll-ups built on the pipeline.

pub mod aggregate;
pub mod client;
pub mod dates;
pub mod enrich;
pub mod error;
pub mod geo;
pub mod heuristic;
pub mod normalize;
pub mod pages;
pub mod rate_limit;

mod retry;

pub use aggregate::{aggregate_visits, AggregateSettings, VisitAggregation};
pub use client::{ClientSettings, Lane, PageQuery, Payload, ProxyClient, ProxyRequest};
pub use enrich::{enrich_businesses, hydrate_assigned, Enrichment};
pub use error::ProxyError;
pub use normalize::{ListPage, ListShape};
pub use rate_limit::{RateLedger, RateRule};
