//! Entity base: identity, fixed metric table, rated channels
//!
//! Every monitored entity (connection, host) embeds an `EntityCore` that owns
//! its metric series in declaration order. Concrete kinds implement the
//! `Entity` trait by exposing that core; the shared read/write behaviour lives
//! in the trait's provided methods.

use crate::error::{Result, TelemetryError};
use crate::logger::{emit, LogLevel, SharedLogger};
use crate::schema::{MetricSchema, RatedChannel};
use crate::series::{MetricSeries, RatingState, Reading};
use crate::units::UnitLookup;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::ops::Index;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Connection,
    Host,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Connection => "connection",
            EntityKind::Host => "host",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity and metric storage shared by all entity kinds
pub struct EntityCore {
    id: String,
    kind: EntityKind,
    parent: Option<String>,
    history_limit: usize,
    metrics: Vec<MetricSeries>,
    metric_index: HashMap<String, usize>,
    rated_metrics: Vec<String>,
    channels: Vec<MetricSeries>,
    channel_index: HashMap<String, usize>,
    logger: Option<SharedLogger>,
}

impl EntityCore {
    pub(crate) fn new(
        id: impl Into<String>,
        kind: EntityKind,
        parent: Option<String>,
        history_limit: usize,
        logger: Option<SharedLogger>,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            parent,
            history_limit,
            metrics: Vec::new(),
            metric_index: HashMap::new(),
            rated_metrics: Vec::new(),
            channels: Vec::new(),
            channel_index: HashMap::new(),
            logger,
        }
    }

    /// Registers every plain metric, then every rated channel, of `schema`
    pub(crate) fn from_schema(
        id: impl Into<String>,
        kind: EntityKind,
        parent: Option<String>,
        schema: &MetricSchema,
        history_limit: usize,
        logger: Option<SharedLogger>,
    ) -> Result<Self> {
        let mut core = Self::new(id, kind, parent, history_limit, logger);
        for name in schema.plain {
            core.register_metric(name)?;
        }
        for name in schema.ratable {
            core.register_rated_metric(name)?;
        }
        Ok(core)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn history_limit(&self) -> usize {
        self.history_limit
    }

    pub(crate) fn emit(&self, level: LogLevel, message: &str) {
        emit(self.logger.as_ref(), level, &self.id, message);
    }

    pub(crate) fn register_metric(&mut self, name: &str) -> Result<()> {
        if self.metric_index.contains_key(name) {
            return Err(self.duplicate(name));
        }
        self.metric_index.insert(name.to_string(), self.metrics.len());
        self.metrics.push(MetricSeries::new(name, self.history_limit));
        Ok(())
    }

    /// Adds the actual/expected/state channels of an already registered metric
    pub(crate) fn register_rated_metric(&mut self, name: &str) -> Result<()> {
        if !self.metric_index.contains_key(name) {
            return Err(self.unknown(name));
        }
        if self.rated_metrics.iter().any(|m| m == name) {
            return Err(self.duplicate(name));
        }
        for channel in RatedChannel::ALL {
            let key = channel.key(name);
            self.channel_index.insert(key.clone(), self.channels.len());
            self.channels.push(MetricSeries::new(key, self.history_limit));
        }
        self.rated_metrics.push(name.to_string());
        Ok(())
    }

    /// Appends to a plain metric. The only write path for plain series.
    pub(crate) fn ingest(&mut self, name: &str, value: f64) -> Result<()> {
        match self.metric_index.get(name) {
            Some(&idx) => {
                self.metrics[idx].push(value);
                Ok(())
            }
            None => {
                debug!(seuid = %self.id, metric = name, "rejected sample for unknown metric");
                self.emit(LogLevel::Warning, &format!("Rejected sample for unknown metric {name}"));
                Err(self.unknown(name))
            }
        }
    }

    /// Appends one sample to each rated channel of `name`
    pub(crate) fn ingest_rating(
        &mut self,
        name: &str,
        actual: f64,
        expected: f64,
        state: RatingState,
    ) -> Result<()> {
        let Some(actual_idx) = self.channel_index.get(&RatedChannel::ActualValue.key(name)).copied() else {
            self.emit(LogLevel::Warning, &format!("Rejected rating for unrated metric {name}"));
            return Err(self.unknown(name));
        };
        // channels of one metric are registered contiguously
        self.channels[actual_idx].push(actual);
        self.channels[actual_idx + 1].push(expected);
        self.channels[actual_idx + 2].push(state);
        Ok(())
    }

    pub fn series(&self, name: &str) -> Option<&MetricSeries> {
        self.metric_index.get(name).map(|&idx| &self.metrics[idx])
    }

    pub fn rated_series(&self, name: &str, channel: RatedChannel) -> Option<&MetricSeries> {
        self.channel_index
            .get(&channel.key(name))
            .map(|&idx| &self.channels[idx])
    }

    /// Plain metric names in declaration order
    pub fn metric_names(&self) -> impl Iterator<Item = &str> {
        self.metrics.iter().map(|s| s.name())
    }

    /// Names of the metrics that carry rated channels
    pub fn rated_metric_names(&self) -> impl Iterator<Item = &str> {
        self.rated_metrics.iter().map(String::as_str)
    }

    pub fn is_rated(&self, name: &str) -> bool {
        self.rated_metrics.iter().any(|m| m == name)
    }

    /// Latest reading of a plain metric or rated channel key, `None` if unregistered
    pub fn latest(&self, key: &str) -> Option<Reading> {
        if let Some(&idx) = self.metric_index.get(key) {
            return Some(self.metrics[idx].latest());
        }
        self.channel_index.get(key).map(|&idx| self.channels[idx].latest())
    }

    pub fn latest_snapshot(&self) -> Snapshot {
        let entries = self
            .metrics
            .iter()
            .chain(self.channels.iter())
            .map(|s| (s.name().to_string(), s.latest()))
            .collect();
        Snapshot { entries }
    }

    pub fn rating(&self, name: &str) -> Option<RatingSnapshot> {
        let idx = *self.channel_index.get(&RatedChannel::ActualValue.key(name))?;
        Some(RatingSnapshot {
            actual: self.channels[idx].latest(),
            expected: self.channels[idx + 1].latest(),
            state: self.channels[idx + 2].latest(),
        })
    }

    /// Most severe latest state over all rated channels
    pub fn overall_state(&self) -> Option<RatingState> {
        self.rated_metrics
            .iter()
            .filter_map(|m| self.rating(m))
            .filter_map(|r| r.state.as_state())
            .max()
    }

    pub fn detailed_report(&self, units: &dyn UnitLookup) -> DetailedReport {
        let lines = self
            .metrics
            .iter()
            .map(|s| ReportLine {
                metric: s.name().to_string(),
                label: units.label(s.name()).map(str::to_string),
                value: s.latest(),
                unit: units.unit(s.name()).map(str::to_string),
                rating: self.rating(s.name()),
            })
            .collect();
        DetailedReport {
            seuid: self.id.clone(),
            kind: self.kind,
            state: self.overall_state(),
            lines,
        }
    }

    fn unknown(&self, metric: &str) -> TelemetryError {
        TelemetryError::UnknownMetric {
            entity: self.id.clone(),
            metric: metric.to_string(),
        }
    }

    fn duplicate(&self, metric: &str) -> TelemetryError {
        TelemetryError::DuplicateMetric {
            entity: self.id.clone(),
            metric: metric.to_string(),
        }
    }
}

/// Behaviour shared by every entity kind.
///
/// The core is only handed out for reading. Its metric set is fixed once
/// the kind is constructed, and samples reach it through `ingest` and
/// `ingest_rating` alone.
///
/// ```compile_fail
/// use symbion_telemetry::{Connection, Entity};
///
/// let mut conn = Connection::new("/a--/t-->/b", None, 10, None).unwrap();
/// conn.core_mut().register_rated_metric("traffic").unwrap();
/// ```
pub trait Entity {
    fn core(&self) -> &EntityCore;

    fn ingest(&mut self, name: &str, value: f64) -> Result<()>;

    fn ingest_rating(&mut self, name: &str, actual: f64, expected: f64, state: RatingState) -> Result<()>;

    fn id(&self) -> &str {
        self.core().id()
    }

    fn kind(&self) -> EntityKind {
        self.core().kind()
    }

    fn parent(&self) -> Option<&str> {
        self.core().parent()
    }

    fn latest_snapshot(&self) -> Snapshot {
        self.core().latest_snapshot()
    }

    fn detailed_report(&self, units: &dyn UnitLookup) -> DetailedReport {
        self.core().detailed_report(units)
    }

    /// Every plain metric, in declaration order
    fn plottable_metrics(&self) -> Vec<&str> {
        self.core().metric_names().collect()
    }

    fn overall_state(&self) -> Option<RatingState> {
        self.core().overall_state()
    }
}

/// Latest reading of every plain metric and rated channel, in declaration order
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    entries: Vec<(String, Reading)>,
}

impl Snapshot {
    pub fn get(&self, key: &str) -> Option<Reading> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, r)| *r)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Reading)> {
        self.entries.iter().map(|(k, r)| (k.as_str(), *r))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Index<&str> for Snapshot {
    type Output = Reading;

    fn index(&self, key: &str) -> &Reading {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, r)| r)
            .unwrap_or_else(|| panic!("no metric named {key} in snapshot"))
    }
}

impl Serialize for Snapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, reading) in &self.entries {
            map.serialize_entry(key, reading)?;
        }
        map.end()
    }
}

/// Latest (actual, expected, state) of one rated metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RatingSnapshot {
    pub actual: Reading,
    pub expected: Reading,
    pub state: Reading,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportLine {
    pub metric: String,
    pub label: Option<String>,
    pub value: Reading,
    pub unit: Option<String>,
    pub rating: Option<RatingSnapshot>,
}

/// Structured detail view consumed by the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailedReport {
    pub seuid: String,
    pub kind: EntityKind,
    pub state: Option<RatingState>,
    pub lines: Vec<ReportLine>,
}

impl DetailedReport {
    pub fn line(&self, metric: &str) -> Option<&ReportLine> {
        self.lines.iter().find(|l| l.metric == metric)
    }
}
