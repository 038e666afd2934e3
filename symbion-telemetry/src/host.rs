//! Host entity: machine-level load plus per-resource accumulators
//!
//! Besides the fixed load metrics a host keeps open-ended maps keyed by
//! network interface or disk name. Keys are discovered at runtime and their
//! series are created on first sample. Bandwidth, message frequency and
//! drive I/O are measured per sampling window and are dropped by
//! `reset_cycle`; free drive space is current state and survives it.

use crate::action::{ActionRequest, Actionable, RemoteAction};
use crate::entity::{Entity, EntityCore, EntityKind};
use crate::error::{Result, TelemetryError};
use crate::logger::{LogLevel, SharedLogger};
use crate::schema::MetricSchema;
use crate::series::{MetricSeries, RatingState, Reading};
use crate::source::{BatchReport, HostSampleBatch};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

pub const HOST_SCHEMA: MetricSchema = MetricSchema::new(
    &[
        "cpu_usage_mean",
        "cpu_usage_stddev",
        "cpu_usage_max",
        "cpu_temp_mean",
        "cpu_temp_stddev",
        "cpu_temp_max",
        "ram_usage_mean",
        "ram_usage_stddev",
        "ram_usage_max",
        "gpu_usage_mean",
        "gpu_usage_stddev",
        "gpu_usage_max",
    ],
    &[
        "cpu_usage_mean",
        "cpu_usage_stddev",
        "cpu_usage_max",
        "cpu_temp_mean",
        "cpu_temp_stddev",
        "cpu_temp_max",
        "ram_usage_mean",
        "ram_usage_stddev",
        "ram_usage_max",
        "gpu_usage_mean",
        "gpu_usage_stddev",
        "gpu_usage_max",
    ],
);

/// Per-resource map of a host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceCategory {
    /// bytes/s per interface over the sampling window
    Bandwidth,
    /// message rate per interface, in Hz
    MsgFrequency,
    /// bytes/s written per disk
    DriveWrite,
    /// bytes/s read per disk
    DriveRead,
    /// free bytes per disk, latest value only
    DriveSpace,
}

impl ResourceCategory {
    pub const ALL: [ResourceCategory; 5] = [
        ResourceCategory::Bandwidth,
        ResourceCategory::MsgFrequency,
        ResourceCategory::DriveWrite,
        ResourceCategory::DriveRead,
        ResourceCategory::DriveSpace,
    ];

    /// Categories cleared by a cycle reset unless excluded
    pub const PER_CYCLE: [ResourceCategory; 4] = [
        ResourceCategory::Bandwidth,
        ResourceCategory::MsgFrequency,
        ResourceCategory::DriveWrite,
        ResourceCategory::DriveRead,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceCategory::Bandwidth => "bandwidth",
            ResourceCategory::MsgFrequency => "msg_frequency",
            ResourceCategory::DriveWrite => "drive_write",
            ResourceCategory::DriveRead => "drive_read",
            ResourceCategory::DriveSpace => "drive_space",
        }
    }
}

impl fmt::Display for ResourceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceCategory {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self> {
        ResourceCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| TelemetryError::UnknownResourceCategory(s.to_string()))
    }
}

/// Latest values of every host-specific channel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceSnapshot {
    pub cpu_temp: Reading,
    pub cpu_temp_core: Vec<Reading>,
    pub gpu_temp: Reading,
    pub bandwidth: BTreeMap<String, Reading>,
    pub msg_frequency: BTreeMap<String, Reading>,
    pub drive_write: BTreeMap<String, Reading>,
    pub drive_read: BTreeMap<String, Reading>,
    pub drive_space: BTreeMap<String, f64>,
}

type ResourceMap = BTreeMap<String, MetricSeries>;

pub struct Host {
    core: EntityCore,
    cpu_temp: MetricSeries,
    cpu_temp_core: Vec<MetricSeries>,
    gpu_temp: MetricSeries,
    bandwidth: ResourceMap,
    msg_frequency: ResourceMap,
    drive_write: ResourceMap,
    drive_read: ResourceMap,
    drive_space: BTreeMap<String, f64>,
    reset_exclusions: Vec<ResourceCategory>,
    pending_actions: Vec<ActionRequest>,
}

impl Host {
    /// `cpu_core_count` fixes the number of per-core temperature series
    pub fn new(
        seuid: impl Into<String>,
        parent: Option<String>,
        cpu_core_count: usize,
        history_limit: usize,
        logger: Option<SharedLogger>,
    ) -> Result<Self> {
        let core = EntityCore::from_schema(
            seuid,
            EntityKind::Host,
            parent,
            &HOST_SCHEMA,
            history_limit,
            logger,
        )?;
        let cpu_temp_core = (0..cpu_core_count)
            .map(|i| MetricSeries::new(format!("cpu_temp_core.{i}"), history_limit))
            .collect();
        core.emit(LogLevel::Info, "Created a new host");
        Ok(Self {
            core,
            cpu_temp: MetricSeries::new("cpu_temp", history_limit),
            cpu_temp_core,
            gpu_temp: MetricSeries::new("gpu_temp", history_limit),
            bandwidth: ResourceMap::new(),
            msg_frequency: ResourceMap::new(),
            drive_write: ResourceMap::new(),
            drive_read: ResourceMap::new(),
            drive_space: BTreeMap::new(),
            reset_exclusions: Vec::new(),
            pending_actions: Vec::new(),
        })
    }

    /// Per-cycle categories that `reset_cycle` must leave untouched
    pub fn with_reset_exclusions(mut self, exclusions: Vec<ResourceCategory>) -> Self {
        self.reset_exclusions = exclusions;
        self
    }

    pub fn cpu_core_count(&self) -> usize {
        self.cpu_temp_core.len()
    }

    /// Appends `value` to `key` in the map named `category`.
    ///
    /// Unknown keys are created on the fly; an unknown category is an error.
    /// `drive_space` keeps overwrite semantics.
    pub fn add_sample(&mut self, category: &str, key: &str, value: f64) -> Result<()> {
        let category = match category.parse::<ResourceCategory>() {
            Ok(category) => category,
            Err(e) => {
                self.core
                    .emit(LogLevel::Warning, &format!("Rejected sample for unknown resource category {category}"));
                return Err(e);
            }
        };
        self.add_resource_sample(category, key, value);
        Ok(())
    }

    pub fn add_resource_sample(&mut self, category: ResourceCategory, key: &str, value: f64) {
        let history_limit = self.core.history_limit();
        match self.map_mut(category) {
            Some(map) => map
                .entry(key.to_string())
                .or_insert_with(|| MetricSeries::new(format!("{category}.{key}"), history_limit))
                .push(value),
            None => self.set_drive_space(key, value),
        }
    }

    /// Replaces the free space recorded for `disk`
    pub fn set_drive_space(&mut self, disk: &str, free_bytes: f64) {
        self.drive_space.insert(disk.to_string(), free_bytes);
    }

    pub fn drive_space(&self, disk: &str) -> Option<f64> {
        self.drive_space.get(disk).copied()
    }

    pub fn add_cpu_temp(&mut self, celsius: f64) {
        self.cpu_temp.push(celsius);
    }

    /// One temperature per core, in core order
    pub fn add_cpu_temp_core(&mut self, temps: &[f64]) -> Result<()> {
        if temps.len() != self.cpu_temp_core.len() {
            return Err(TelemetryError::CoreCountMismatch {
                expected: self.cpu_temp_core.len(),
                actual: temps.len(),
            });
        }
        for (series, temp) in self.cpu_temp_core.iter_mut().zip(temps) {
            series.push(*temp);
        }
        Ok(())
    }

    /// GPU temperatures are not sourced yet; samples are accepted and dropped.
    pub fn add_gpu_temp(&mut self, temps: &[f64]) {
        debug!(seuid = %self.core.id(), count = temps.len(), "gpu temperature samples ignored");
    }

    pub fn cpu_temp(&self) -> &MetricSeries {
        &self.cpu_temp
    }

    pub fn cpu_temp_core(&self) -> &[MetricSeries] {
        &self.cpu_temp_core
    }

    pub fn gpu_temp(&self) -> &MetricSeries {
        &self.gpu_temp
    }

    pub fn resource_series(&self, category: ResourceCategory, key: &str) -> Option<&MetricSeries> {
        self.map(category).and_then(|m| m.get(key))
    }

    /// Keys seen so far in `category`, sorted
    pub fn resource_keys(&self, category: ResourceCategory) -> Vec<&str> {
        match self.map(category) {
            Some(map) => map.keys().map(String::as_str).collect(),
            None => self.drive_space.keys().map(String::as_str).collect(),
        }
    }

    /// Clears per-cycle accumulators.
    ///
    /// Temperature series are emptied but kept (core count is fixed), the
    /// per-cycle maps lose their keys, drive space and excluded categories
    /// stay as they are.
    pub fn reset_cycle(&mut self) {
        self.cpu_temp.clear();
        for series in &mut self.cpu_temp_core {
            series.clear();
        }
        self.gpu_temp.clear();
        for category in ResourceCategory::PER_CYCLE {
            if self.reset_exclusions.contains(&category) {
                continue;
            }
            if let Some(map) = self.map_mut(category) {
                map.clear();
            }
        }
        self.core.emit(LogLevel::Debug, "Reset per-cycle accumulators");
    }

    pub fn resource_snapshot(&self) -> ResourceSnapshot {
        let latest = |map: &ResourceMap| -> BTreeMap<String, Reading> {
            map.iter().map(|(k, s)| (k.clone(), s.latest())).collect()
        };
        ResourceSnapshot {
            cpu_temp: self.cpu_temp.latest(),
            cpu_temp_core: self.cpu_temp_core.iter().map(MetricSeries::latest).collect(),
            gpu_temp: self.gpu_temp.latest(),
            bandwidth: latest(&self.bandwidth),
            msg_frequency: latest(&self.msg_frequency),
            drive_write: latest(&self.drive_write),
            drive_read: latest(&self.drive_read),
            drive_space: self.drive_space.clone(),
        }
    }

    /// Records one sampling window delivered by a `HostSampleSource`.
    ///
    /// A rejected entry (unknown load metric, incomplete per-core set) does
    /// not stop the others; it is logged and returned in the report.
    pub fn apply_batch(&mut self, batch: &HostSampleBatch) -> BatchReport {
        let mut report = BatchReport::default();
        for (metric, value) in &batch.load {
            report.record(self.ingest(metric, *value));
        }
        if let Some(temp) = batch.cpu_temp {
            self.add_cpu_temp(temp);
            report.record(Ok(()));
        }
        if !batch.cpu_temp_core.is_empty() {
            let outcome = self.add_cpu_temp_core(&batch.cpu_temp_core);
            if let Err(e) = &outcome {
                self.core.emit(LogLevel::Warning, &format!("Rejected per-core temperatures: {e}"));
            }
            report.record(outcome);
        }
        if !batch.gpu_temp.is_empty() {
            self.add_gpu_temp(&batch.gpu_temp);
        }
        for (category, key, value) in batch.resources() {
            self.add_resource_sample(category, key, value);
            report.record(Ok(()));
        }
        if !report.is_clean() {
            debug!(
                seuid = %self.core.id(),
                applied = report.applied,
                rejected = report.rejected.len(),
                "batch applied with rejections"
            );
        }
        report
    }

    fn map(&self, category: ResourceCategory) -> Option<&ResourceMap> {
        match category {
            ResourceCategory::Bandwidth => Some(&self.bandwidth),
            ResourceCategory::MsgFrequency => Some(&self.msg_frequency),
            ResourceCategory::DriveWrite => Some(&self.drive_write),
            ResourceCategory::DriveRead => Some(&self.drive_read),
            ResourceCategory::DriveSpace => None,
        }
    }

    fn map_mut(&mut self, category: ResourceCategory) -> Option<&mut ResourceMap> {
        match category {
            ResourceCategory::Bandwidth => Some(&mut self.bandwidth),
            ResourceCategory::MsgFrequency => Some(&mut self.msg_frequency),
            ResourceCategory::DriveWrite => Some(&mut self.drive_write),
            ResourceCategory::DriveRead => Some(&mut self.drive_read),
            ResourceCategory::DriveSpace => None,
        }
    }
}

impl Entity for Host {
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

impl Actionable for Host {
    fn execute_action(&mut self, action: RemoteAction) -> ActionRequest {
        let request = ActionRequest::new(self.core.id(), action);
        self.core.emit(
            LogLevel::Info,
            &format!("Queued action {} ({})", action, request.command_id),
        );
        self.pending_actions.push(request.clone());
        request
    }

    fn pending_actions(&self) -> &[ActionRequest] {
        &self.pending_actions
    }

    fn drain_actions(&mut self) -> Vec<ActionRequest> {
        std::mem::take(&mut self.pending_actions)
    }
}
