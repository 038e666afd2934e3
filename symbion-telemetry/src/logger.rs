//! Event logger collaborator
//!
//! Entities report lifecycle and diagnostic events through an injected
//! `EventLogger`. Emission is fire-and-forget: a missing logger is simply
//! skipped and never changes the outcome of an operation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

/// Receiver of `(level, timestamp, seuid, message)` events
pub trait EventLogger: Send + Sync {
    fn log(&self, level: LogLevel, timestamp: DateTime<Utc>, seuid: &str, message: &str);
}

pub type SharedLogger = Arc<dyn EventLogger>;

/// Forwards events into `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl EventLogger for TracingLogger {
    fn log(&self, level: LogLevel, timestamp: DateTime<Utc>, seuid: &str, message: &str) {
        match level {
            LogLevel::Debug => debug!(seuid, timestamp = %timestamp, "{}", message),
            LogLevel::Info => info!(seuid, timestamp = %timestamp, "{}", message),
            LogLevel::Warning => warn!(seuid, timestamp = %timestamp, "{}", message),
            LogLevel::Error => error!(seuid, timestamp = %timestamp, "{}", message),
        }
    }
}

/// Sends an event if a logger is attached
pub(crate) fn emit(logger: Option<&SharedLogger>, level: LogLevel, seuid: &str, message: &str) {
    if let Some(logger) = logger {
        logger.log(level, Utc::now(), seuid, message);
    }
}
