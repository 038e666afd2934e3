//! Symbion Telemetry - runtime entity/metric model for monitoring agents
//!
//! Each monitored entity accumulates samples for a fixed set of named
//! metrics and exposes raw and rated history to presentation, plotting and
//! alerting consumers:
//! - Connections (publisher -> subscriber on a topic) with a rated subset
//! - Hosts with per-interface / per-disk accumulators and a cycle reset
//! - Rated channels (actual, expected, state) fed by a rating policy
//! - A seuid-keyed registry with one reader-writer lock per entity
//!
//! Every mutation is a direct synchronous call; nothing runs in the
//! background.

pub mod action;
pub mod config;
pub mod connection;
pub mod entity;
pub mod error;
pub mod host;
pub mod logger;
pub mod registry;
pub mod schema;
pub mod series;
pub mod source;
pub mod state;
pub mod units;

pub use action::{ActionRequest, Actionable, RemoteAction};
pub use config::{HostConfig, TelemetryConfig};
pub use connection::{Connection, ConnectionSummary, CONNECTION_SCHEMA};
pub use entity::{DetailedReport, Entity, EntityCore, EntityKind, RatingSnapshot, ReportLine, Snapshot};
pub use error::{Result, TelemetryError};
pub use host::{Host, ResourceCategory, ResourceSnapshot, HOST_SCHEMA};
pub use logger::{EventLogger, LogLevel, SharedLogger, TracingLogger};
pub use registry::{AnyEntity, EntityRegistry, SharedEntity};
pub use schema::{MetricSchema, RatedChannel};
pub use series::{MetricSeries, RatingState, Reading, Sample};
pub use source::{BatchReport, HostSampleBatch, HostSampleSource};
pub use state::{new_shared, Shared};
pub use units::{UnitEntry, UnitLookup, UnitTable};

#[cfg(feature = "system-source")]
pub use source::SystemSampleSource;
