/*!
Recording logger for development without a logging backend

Keeps every event an entity emits so tests can assert on lifecycle and
diagnostic messages.
*/

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use symbion_telemetry::{EventLogger, LogLevel};

#[derive(Debug, Clone, PartialEq)]
pub struct LoggedEvent {
    pub level: LogLevel,
    pub timestamp: DateTime<Utc>,
    pub seuid: String,
    pub message: String,
}

/// Logger that stores events in memory; clones share the same store
#[derive(Clone, Default)]
pub struct RecordingLogger {
    events: Arc<Mutex<Vec<LoggedEvent>>>,
}

impl RecordingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded events (for test assertions)
    pub fn events(&self) -> Vec<LoggedEvent> {
        self.events.lock().clone()
    }

    pub fn events_for(&self, seuid: &str) -> Vec<LoggedEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.seuid == seuid)
            .cloned()
            .collect()
    }

    /// Events of `seuid` whose message contains `fragment`
    pub fn find(&self, seuid: &str, fragment: &str) -> Vec<LoggedEvent> {
        self.events_for(seuid)
            .into_iter()
            .filter(|e| e.message.contains(fragment))
            .collect()
    }

    pub fn count(&self) -> usize {
        self.events.lock().len()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventLogger for RecordingLogger {
    fn log(&self, level: LogLevel, timestamp: DateTime<Utc>, seuid: &str, message: &str) {
        log::debug!("📝 [STUB] {:?} {}: {}", level, seuid, message);
        self.events.lock().push(LoggedEvent {
            level,
            timestamp,
            seuid: seuid.to_string(),
            message: message.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_events() {
        let logger = RecordingLogger::new();
        let clone = logger.clone();
        clone.log(LogLevel::Info, Utc::now(), "c1", "Created a new connection");
        clone.log(LogLevel::Warning, Utc::now(), "h1", "Rejected sample");
        assert_eq!(logger.count(), 2);
        assert_eq!(logger.find("c1", "Created").len(), 1);
        assert!(logger.find("h1", "Created").is_empty());
        logger.clear();
        assert_eq!(clone.count(), 0);
    }
}
