/*!
Test harness for the telemetry model

Wires a registry to a recording logger and offers assertions on snapshots
and logged events:
- Entity setup with deterministic host core count
- Feeding sample batches
- Assertions on latest readings and logger output
*/

use crate::logger_stub::RecordingLogger;
use crate::sample_feed::{FeedReport, SampleFeed};
use anyhow::{bail, Result};
use std::sync::Arc;
use symbion_telemetry::{EntityRegistry, Reading, SharedEntity, TelemetryConfig};

/// Cores given to hosts created by the harness
pub const HARNESS_CORE_COUNT: usize = 4;

pub struct TelemetryHarness {
    pub registry: EntityRegistry,
    pub logger: RecordingLogger,
}

impl TelemetryHarness {
    pub fn new() -> Self {
        let mut config = TelemetryConfig::default();
        config.history_limit = 100;
        config.host.cpu_core_count = Some(HARNESS_CORE_COUNT);
        Self::with_config(config)
    }

    pub fn with_config(config: TelemetryConfig) -> Self {
        env_logger::try_init().ok(); // logging for tests

        let logger = RecordingLogger::new();
        let registry = EntityRegistry::new(config).with_logger(Arc::new(logger.clone()));
        Self { registry, logger }
    }

    pub fn connection(&self, seuid: &str) -> Result<SharedEntity> {
        Ok(self.registry.create_connection(seuid, None)?)
    }

    pub fn host(&self, seuid: &str) -> Result<SharedEntity> {
        Ok(self.registry.create_host(seuid, None)?)
    }

    pub fn feed(&self, feed: &SampleFeed) -> FeedReport {
        let report = feed.apply(&self.registry);
        log::info!(
            "📨 Applied feed: {} ok, {} rejected",
            report.applied,
            report.rejected.len()
        );
        report
    }

    /// Asserts the latest reading of a plain metric or rated channel
    pub fn assert_latest(&self, seuid: &str, key: &str, expected: Reading) -> Result<()> {
        let snapshot = self.registry.latest_snapshot(seuid)?;
        match snapshot.get(key) {
            Some(actual) if actual == expected => Ok(()),
            Some(actual) => bail!("'{}' on {}: expected {:?}, got {:?}", key, seuid, expected, actual),
            None => bail!("'{}' is not registered on {}", key, seuid),
        }
    }

    /// Asserts that `seuid` logged a message containing `fragment`
    pub fn assert_logged(&self, seuid: &str, fragment: &str) -> Result<()> {
        if self.logger.find(seuid, fragment).is_empty() {
            bail!("No event containing '{}' logged for {}", fragment, seuid);
        }
        Ok(())
    }

    pub fn stats(&self) -> HarnessStats {
        HarnessStats {
            entities: self.registry.len(),
            logged_events: self.logger.count(),
        }
    }

    /// Clears recorded events, keeps entities
    pub fn reset(&mut self) {
        self.logger.clear();
        log::info!("🧹 Test harness reset");
    }
}

impl Default for TelemetryHarness {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct HarnessStats {
    pub entities: usize,
    pub logged_events: usize,
}

impl HarnessStats {
    pub fn print(&self) {
        println!("📊 Harness statistics:");
        println!("  Entities: {}", self.entities);
        println!("  Logged events: {}", self.logged_events);
    }
}

/// Declares a test running `body` against a fresh harness
#[macro_export]
macro_rules! telemetry_test {
    ($name:ident, $body:expr) => {
        #[test]
        fn $name() {
            use $crate::test_utils::TelemetryHarness;

            let mut harness = TelemetryHarness::new();
            let test_fn: fn(&mut TelemetryHarness) -> $crate::anyhow::Result<()> = $body;

            if let Err(e) = test_fn(&mut harness) {
                harness.stats().print();
                panic!("Test '{}' failed: {}", stringify!($name), e);
            }
        }
    };
}
