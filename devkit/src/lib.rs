/*!
# Symbion Telemetry DevKit - Stubs and utilities for development

Helps exercising the telemetry model without its external collaborators:
- Recording event logger (stands in for the logging collaborator)
- Sample feeds built in code or loaded from JSON fixtures
- Test harness with registry, logger and assertions
*/

pub mod logger_stub;
pub mod sample_feed;
pub mod test_utils;

pub use anyhow;
pub use logger_stub::{LoggedEvent, RecordingLogger};
pub use sample_feed::{FeedEvent, FeedReport, SampleFeed};
pub use test_utils::TelemetryHarness;
