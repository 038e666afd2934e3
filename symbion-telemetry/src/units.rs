//! Metric labels and units for the presentation layer
//!
//! The model never formats text itself. Reports carry whatever the lookup
//! returns for a metric name; the default table mirrors the English catalogue
//! and can be overridden from configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Metric name -> human label and unit
pub trait UnitLookup {
    fn label(&self, metric: &str) -> Option<&str>;
    fn unit(&self, metric: &str) -> Option<&str>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitEntry {
    pub label: String,
    pub unit: String,
}

/// (metric, label, unit)
const DEFAULT_UNITS: &[(&str, &str, &str)] = &[
    ("dropped_msgs", "Dropped Messages", ""),
    ("traffic", "Traffic", "Byte"),
    ("period_mean", "Average Messages Interval", "s"),
    ("period_stddev", "Messages Interval Standard Deviation", "s"),
    ("period_max", "Longest Messages Interval", "s"),
    ("stamp_age_mean", "Average Message Age", "s"),
    ("stamp_age_stddev", "Message Age Standard Deviation", "s"),
    ("stamp_age_max", "Maximal Message Age", "s"),
    ("cpu_usage_mean", "Average CPU Usage", "%"),
    ("cpu_usage_stddev", "CPU Usage Standard Deviation", "%"),
    ("cpu_usage_max", "Maximal CPU Usage", "%"),
    ("cpu_temp_mean", "Average CPU Temperature", "°C"),
    ("cpu_temp_stddev", "CPU Temperature Standard Deviation", "°C"),
    ("cpu_temp_max", "Maximal CPU Temperature", "°C"),
    ("ram_usage_mean", "Average RAM Usage", "%"),
    ("ram_usage_stddev", "RAM Usage Standard Deviation", "%"),
    ("ram_usage_max", "Maximal RAM Usage", "%"),
    ("gpu_usage_mean", "Average GPU Usage", "%"),
    ("gpu_usage_stddev", "GPU Usage Standard Deviation", "%"),
    ("gpu_usage_max", "Maximal GPU Usage", "%"),
    ("cpu_temp", "CPU Temperature", "°C"),
    ("cpu_temp_core", "CPU Core Temperature", "°C"),
    ("gpu_temp", "GPU Temperature", "°C"),
    ("bandwidth", "Bandwidth", "Byte/s"),
    ("msg_frequency", "Message Frequency", "Hz"),
    ("drive_space", "Free Drive Space", "Byte"),
    ("drive_read", "Drive Read", "Byte/s"),
    ("drive_write", "Drive Write", "Byte/s"),
];

#[derive(Debug, Clone)]
pub struct UnitTable {
    entries: HashMap<String, UnitEntry>,
}

impl UnitTable {
    /// Empty table, every lookup misses
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Default table with `overrides` applied on top
    pub fn with_overrides(overrides: &HashMap<String, UnitEntry>) -> Self {
        let mut table = Self::default();
        for (metric, entry) in overrides {
            table.insert(metric.clone(), entry.clone());
        }
        table
    }

    pub fn insert(&mut self, metric: impl Into<String>, entry: UnitEntry) {
        self.entries.insert(metric.into(), entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for UnitTable {
    fn default() -> Self {
        let entries = DEFAULT_UNITS
            .iter()
            .map(|(metric, label, unit)| {
                (
                    metric.to_string(),
                    UnitEntry {
                        label: label.to_string(),
                        unit: unit.to_string(),
                    },
                )
            })
            .collect();
        Self { entries }
    }
}

impl UnitLookup for UnitTable {
    fn label(&self, metric: &str) -> Option<&str> {
        self.entries.get(metric).map(|e| e.label.as_str())
    }

    fn unit(&self, metric: &str) -> Option<&str> {
        self.entries.get(metric).map(|e| e.unit.as_str())
    }
}
