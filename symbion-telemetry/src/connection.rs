//! Connection between a publisher and a subscriber on a topic
//!
//! Connections record message statistics. Only the drop counter and the
//! period statistics are rated; traffic and stamp age are recorded but carry
//! no rating. Connections do not accept remote actions.

use crate::entity::{Entity, EntityCore, EntityKind};
use crate::error::Result;
use crate::logger::{LogLevel, SharedLogger};
use crate::schema::MetricSchema;
use crate::series::{RatingState, Reading};
use serde::Serialize;

pub const CONNECTION_SCHEMA: MetricSchema = MetricSchema::new(
    &[
        "dropped_msgs",
        "traffic",
        "period_mean",
        "period_stddev",
        "period_max",
        "stamp_age_mean",
        "stamp_age_stddev",
        "stamp_age_max",
    ],
    &["dropped_msgs", "period_mean", "period_stddev", "period_max"],
);

/// One-line projection for non-nominal connections
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConnectionSummary {
    pub traffic: Reading,
    pub dropped_msgs: Reading,
    pub period_mean: Reading,
    pub stamp_age_mean: Reading,
}

pub struct Connection {
    core: EntityCore,
}

impl Connection {
    /// `parent` is the seuid of the topic this connection belongs to
    pub fn new(
        seuid: impl Into<String>,
        parent: Option<String>,
        history_limit: usize,
        logger: Option<SharedLogger>,
    ) -> Result<Self> {
        let core = EntityCore::from_schema(
            seuid,
            EntityKind::Connection,
            parent,
            &CONNECTION_SCHEMA,
            history_limit,
            logger,
        )?;
        core.emit(LogLevel::Info, "Created a new connection");
        Ok(Self { core })
    }

    /// `None` while the connection is rated ok
    pub fn summary_line(&self) -> Option<ConnectionSummary> {
        if self.overall_state().is_some_and(|s| s.is_nominal()) {
            return None;
        }
        let latest = |name: &str| self.core.latest(name).unwrap_or(Reading::NoData);
        Some(ConnectionSummary {
            traffic: latest("traffic"),
            dropped_msgs: latest("dropped_msgs"),
            period_mean: latest("period_mean"),
            stamp_age_mean: latest("stamp_age_mean"),
        })
    }
}

impl Entity for Connection {
    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn ingest(&mut self, name: &str, value: f64) -> Result<()> {
        self.core.ingest(name, value)
    }

    fn ingest_rating(&mut self, name: &str, actual: f64, expected: f64, state: RatingState) -> Result<()> {
        self.core.ingest_rating(name, actual, expected, state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TelemetryError;
    use crate::schema::RatedChannel;
    use crate::units::UnitTable;

    fn connection() -> Connection {
        Connection::new("/talker--/chatter-->/listener", Some("/chatter".into()), 100, None).unwrap()
    }

    #[test]
    fn test_fresh_connection_reads_no_data() {
        let conn = connection();
        let snapshot = conn.latest_snapshot();
        for metric in CONNECTION_SCHEMA.plain {
            assert_eq!(snapshot.get(metric), Some(Reading::NoData));
        }
        assert_eq!(conn.parent(), Some("/chatter"));
        assert_eq!(conn.kind(), EntityKind::Connection);
    }

    #[test]
    fn test_rated_subset_is_exact() {
        let conn = connection();
        let rated: Vec<_> = conn.core().rated_metric_names().collect();
        assert_eq!(rated, vec!["dropped_msgs", "period_mean", "period_stddev", "period_max"]);
    }

    #[test]
    fn test_unrated_metrics_reject_ratings() {
        let mut conn = connection();
        for metric in ["traffic", "stamp_age_mean", "stamp_age_stddev", "stamp_age_max"] {
            let err = conn.ingest_rating(metric, 1.0, 1.0, RatingState::Ok).unwrap_err();
            assert!(matches!(err, TelemetryError::UnknownMetric { .. }));
        }
    }

    #[test]
    fn test_schema_fixed_after_construction() {
        let mut conn = connection();
        for metric in CONNECTION_SCHEMA.plain {
            conn.ingest(metric, 1.0).unwrap();
            let _ = conn.ingest_rating(metric, 1.0, 1.0, RatingState::Warning);
        }
        assert!(conn.ingest("extra", 1.0).is_err());
        assert!(conn.ingest_rating("traffic", 1.0, 1.0, RatingState::Ok).is_err());

        assert!(!conn.core().is_rated("traffic"));
        assert!(conn.core().rated_series("traffic", RatedChannel::State).is_none());
        let rated: Vec<_> = conn.core().rated_metric_names().collect();
        assert_eq!(rated, CONNECTION_SCHEMA.ratable.to_vec());
        assert_eq!(conn.plottable_metrics(), CONNECTION_SCHEMA.plain.to_vec());
        assert_eq!(
            conn.latest_snapshot().len(),
            CONNECTION_SCHEMA.plain.len() + 3 * CONNECTION_SCHEMA.ratable.len()
        );
    }

    #[test]
    fn test_plottable_metrics_in_declaration_order() {
        let mut conn = connection();
        conn.ingest_rating("period_max", 1.0, 0.5, RatingState::Error).unwrap();
        assert_eq!(conn.plottable_metrics(), CONNECTION_SCHEMA.plain.to_vec());
    }

    #[test]
    fn test_summary_only_when_not_ok() {
        let mut conn = connection();
        conn.ingest("traffic", 2048.0).unwrap();
        assert!(conn.summary_line().is_some());

        conn.ingest_rating("dropped_msgs", 0.0, 0.0, RatingState::Ok).unwrap();
        assert!(conn.summary_line().is_none());

        conn.ingest_rating("period_mean", 0.4, 0.1, RatingState::Warning).unwrap();
        let summary = conn.summary_line().unwrap();
        assert_eq!(summary.traffic, Reading::Value(2048.0));
        assert_eq!(summary.stamp_age_mean, Reading::NoData);
    }

    #[test]
    fn test_detailed_report_carries_units() {
        let mut conn = connection();
        conn.ingest("traffic", 10.0).unwrap();
        let report = conn.detailed_report(&UnitTable::default());
        assert_eq!(report.lines.len(), 8);
        let traffic = report.line("traffic").unwrap();
        assert_eq!(traffic.unit.as_deref(), Some("Byte"));
        assert_eq!(traffic.value, Reading::Value(10.0));
        assert!(traffic.rating.is_none());
        assert!(report.line("period_stddev").unwrap().rating.is_some());
    }
}
