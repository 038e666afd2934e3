//! Error taxonomy for the telemetry model
//!
//! Registration errors are structural: the metric set of an entity kind is
//! fixed, so a failure there means the kind's declaration is broken.
//! Ingestion errors are protocol mismatches with the sample source and are
//! handed back to the caller so one bad sample never stalls the others.
//! Reads never fail for missing data, they return `Reading::NoData`.

/// Errors raised by entity registration, ingestion and the registry
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("Unknown metric '{metric}' on entity {entity}")]
    UnknownMetric { entity: String, metric: String },
    #[error("Unknown resource category: {0}")]
    UnknownResourceCategory(String),
    #[error("Metric '{metric}' already registered on entity {entity}")]
    DuplicateMetric { entity: String, metric: String },
    #[error("Unknown entity: {0}")]
    UnknownEntity(String),
    #[error("Entity already registered: {0}")]
    DuplicateEntity(String),
    #[error("Entity {0} is not a host")]
    NotAHost(String),
    #[error("Entity {0} does not accept actions")]
    NotActionable(String),
    #[error("Expected {expected} per-core samples, got {actual}")]
    CoreCountMismatch { expected: usize, actual: usize },
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, TelemetryError>;
