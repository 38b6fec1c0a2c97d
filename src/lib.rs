//! Water-quality depth profiles for pond sampling surveys.
//!
//! Raw sonde exports go through three stages:
//!
//! - `ingest`   — CSV rows become `Reading`s; bad rows are dropped and counted.
//! - `analysis` — readings are clustered into sites by GPS proximity, and a
//!   site's readings are reduced into depth-bucketed profiles.
//! - `query`    — `ProfileService`, the cached façade the map and chart
//!   layers call.

pub mod analysis;
pub mod config;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod query;

pub use config::{Config, Reducer};
pub use model::{DepthBucket, DepthProfile, Parameter, ProfileError, Reading, SiteId, SiteSummary};
pub use query::ProfileService;
