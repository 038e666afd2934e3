/*!
Sample feeds for driving the telemetry model

A feed is an ordered list of calls as they would arrive from the sample
source, the rating policy or the cycle timer. Feeds are built in code or
loaded from JSON fixtures, then applied to an `EntityRegistry`. A rejected
call is recorded and the feed carries on with the next one.
*/

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use symbion_telemetry::{EntityRegistry, RatingState};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedEvent {
    Metric {
        seuid: String,
        metric: String,
        value: f64,
    },
    Rating {
        seuid: String,
        metric: String,
        actual: f64,
        expected: f64,
        state: RatingState,
    },
    Resource {
        seuid: String,
        category: String,
        key: String,
        value: f64,
    },
    DriveSpace {
        seuid: String,
        disk: String,
        free_bytes: f64,
    },
    ResetCycle,
}

/// Outcome of applying a feed
#[derive(Debug, Default)]
pub struct FeedReport {
    pub applied: usize,
    /// (position in the feed, error message)
    pub rejected: Vec<(usize, String)>,
}

impl FeedReport {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SampleFeed {
    events: Vec<FeedEvent>,
}

impl SampleFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a feed from a JSON array of events
    pub fn from_json(value: Value) -> Result<Self> {
        let events: Vec<FeedEvent> =
            serde_json::from_value(value).context("Invalid sample feed fixture")?;
        Ok(Self { events })
    }

    pub fn metric(mut self, seuid: &str, metric: &str, value: f64) -> Self {
        self.events.push(FeedEvent::Metric {
            seuid: seuid.to_string(),
            metric: metric.to_string(),
            value,
        });
        self
    }

    pub fn rating(
        mut self,
        seuid: &str,
        metric: &str,
        actual: f64,
        expected: f64,
        state: RatingState,
    ) -> Self {
        self.events.push(FeedEvent::Rating {
            seuid: seuid.to_string(),
            metric: metric.to_string(),
            actual,
            expected,
            state,
        });
        self
    }

    pub fn resource(mut self, seuid: &str, category: &str, key: &str, value: f64) -> Self {
        self.events.push(FeedEvent::Resource {
            seuid: seuid.to_string(),
            category: category.to_string(),
            key: key.to_string(),
            value,
        });
        self
    }

    pub fn drive_space(mut self, seuid: &str, disk: &str, free_bytes: f64) -> Self {
        self.events.push(FeedEvent::DriveSpace {
            seuid: seuid.to_string(),
            disk: disk.to_string(),
            free_bytes,
        });
        self
    }

    pub fn reset_cycle(mut self) -> Self {
        self.events.push(FeedEvent::ResetCycle);
        self
    }

    pub fn events(&self) -> &[FeedEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Applies every event in order, collecting rejections
    pub fn apply(&self, registry: &EntityRegistry) -> FeedReport {
        let mut report = FeedReport::default();
        for (position, event) in self.events.iter().enumerate() {
            let outcome = match event {
                FeedEvent::Metric { seuid, metric, value } => registry.ingest(seuid, metric, *value),
                FeedEvent::Rating { seuid, metric, actual, expected, state } => {
                    registry.ingest_rating(seuid, metric, *actual, *expected, *state)
                }
                FeedEvent::Resource { seuid, category, key, value } => {
                    registry.add_host_sample(seuid, category, key, *value)
                }
                FeedEvent::DriveSpace { seuid, disk, free_bytes } => {
                    registry.set_drive_space(seuid, disk, *free_bytes)
                }
                FeedEvent::ResetCycle => {
                    registry.reset_host_cycles();
                    Ok(())
                }
            };
            match outcome {
                Ok(()) => report.applied += 1,
                Err(e) => {
                    log::warn!("⚠️ Feed event {} rejected: {}", position, e);
                    report.rejected.push((position, e.to_string()));
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_fixture_matches_builder() {
        let fixture = json!([
            {"type": "metric", "seuid": "c1", "metric": "traffic", "value": 12.0},
            {"type": "rating", "seuid": "c1", "metric": "dropped_msgs",
             "actual": 5.0, "expected": 0.0, "state": "warning"},
            {"type": "resource", "seuid": "h1", "category": "bandwidth", "key": "eth0", "value": 1.0},
            {"type": "drive_space", "seuid": "h1", "disk": "sda", "free_bytes": 9.0},
            {"type": "reset_cycle"}
        ]);
        let loaded = SampleFeed::from_json(fixture).unwrap();
        let built = SampleFeed::new()
            .metric("c1", "traffic", 12.0)
            .rating("c1", "dropped_msgs", 5.0, 0.0, RatingState::Warning)
            .resource("h1", "bandwidth", "eth0", 1.0)
            .drive_space("h1", "sda", 9.0)
            .reset_cycle();
        assert_eq!(loaded.events(), built.events());
    }

    #[test]
    fn test_invalid_fixture_is_an_error() {
        assert!(SampleFeed::from_json(json!([{"type": "teleport"}])).is_err());
    }

    #[test]
    fn test_rejections_do_not_stop_feed() {
        let registry = EntityRegistry::default();
        registry.create_connection("c1", None).unwrap();
        let report = SampleFeed::new()
            .metric("c1", "bogus", 1.0)
            .metric("ghost", "traffic", 1.0)
            .metric("c1", "traffic", 2.0)
            .apply(&registry);
        assert_eq!(report.applied, 1);
        assert_eq!(report.rejected.len(), 2);
        assert_eq!(report.rejected[0].0, 0);
        assert!(!report.is_clean());
    }
}
