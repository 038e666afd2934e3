//! Bounded sample history for a single named metric
//!
//! A `MetricSeries` only grows through `push`. Once it holds `capacity`
//! samples the oldest one is evicted, so arrival order is preserved and
//! memory stays bounded no matter how long an entity lives.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

/// Classification state delivered by the rating policy.
///
/// Variants are declared in increasing severity, so `Ord` ranks them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RatingState {
    Ok,
    Stale,
    Warning,
    Error,
}

impl RatingState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RatingState::Ok => "ok",
            RatingState::Stale => "stale",
            RatingState::Warning => "warning",
            RatingState::Error => "error",
        }
    }

    pub fn is_nominal(&self) -> bool {
        matches!(self, RatingState::Ok)
    }
}

impl fmt::Display for RatingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RatingState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ok" => Ok(RatingState::Ok),
            "stale" => Ok(RatingState::Stale),
            "warning" => Ok(RatingState::Warning),
            "error" => Ok(RatingState::Error),
            other => Err(format!("unknown rating state: {other}")),
        }
    }
}

/// One stored sample: a number or a rating state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Sample {
    Value(f64),
    State(RatingState),
}

impl From<f64> for Sample {
    fn from(value: f64) -> Self {
        Sample::Value(value)
    }
}

impl From<RatingState> for Sample {
    fn from(state: RatingState) -> Self {
        Sample::State(state)
    }
}

/// Result of reading the latest sample of a series.
///
/// `NoData` is the explicit sentinel for an empty series (serialized as `null`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Reading {
    NoData,
    Value(f64),
    State(RatingState),
}

impl Reading {
    pub fn is_no_data(&self) -> bool {
        matches!(self, Reading::NoData)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Reading::Value(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_state(&self) -> Option<RatingState> {
        match self {
            Reading::State(s) => Some(*s),
            _ => None,
        }
    }
}

impl From<Option<&Sample>> for Reading {
    fn from(sample: Option<&Sample>) -> Self {
        match sample {
            None => Reading::NoData,
            Some(Sample::Value(v)) => Reading::Value(*v),
            Some(Sample::State(s)) => Reading::State(*s),
        }
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reading::NoData => f.write_str("no data"),
            Reading::Value(v) => write!(f, "{v}"),
            Reading::State(s) => write!(f, "{s}"),
        }
    }
}

/// Append-only, bounded history of one metric
#[derive(Debug, Clone, Serialize)]
pub struct MetricSeries {
    name: String,
    samples: VecDeque<Sample>,
    #[serde(skip)]
    capacity: usize,
}

impl MetricSeries {
    /// Creates an empty series. A zero capacity is raised to one.
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        Self {
            name: name.into(),
            samples: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Appends a sample, evicting the oldest one when the series is full
    pub fn push(&mut self, sample: impl Into<Sample>) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample.into());
    }

    pub fn latest(&self) -> Reading {
        Reading::from(self.samples.back())
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples in arrival order
    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    /// Numeric samples in arrival order (state samples are skipped)
    pub fn values(&self) -> Vec<f64> {
        self.samples
            .iter()
            .filter_map(|s| match s {
                Sample::Value(v) => Some(*v),
                Sample::State(_) => None,
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_series_reads_no_data() {
        let series = MetricSeries::new("traffic", 10);
        assert!(series.is_empty());
        assert_eq!(series.latest(), Reading::NoData);
    }

    #[test]
    fn test_push_keeps_arrival_order() {
        let mut series = MetricSeries::new("traffic", 10);
        series.push(1.0);
        series.push(2.0);
        series.push(3.0);
        assert_eq!(series.values(), vec![1.0, 2.0, 3.0]);
        assert_eq!(series.latest(), Reading::Value(3.0));
    }

    #[test]
    fn test_full_series_evicts_oldest() {
        let mut series = MetricSeries::new("period_mean", 2);
        series.push(1.0);
        series.push(2.0);
        series.push(3.0);
        assert_eq!(series.len(), 2);
        assert_eq!(series.values(), vec![2.0, 3.0]);
    }

    #[test]
    fn test_zero_capacity_is_raised() {
        let mut series = MetricSeries::new("x", 0);
        series.push(4.0);
        assert_eq!(series.capacity(), 1);
        assert_eq!(series.latest(), Reading::Value(4.0));
    }

    #[test]
    fn test_rating_state_parse_and_order() {
        assert_eq!("Warning".parse::<RatingState>().unwrap(), RatingState::Warning);
        assert!("bogus".parse::<RatingState>().is_err());
        assert!(RatingState::Error > RatingState::Warning);
        assert!(RatingState::Warning > RatingState::Stale);
        assert!(RatingState::Stale > RatingState::Ok);
    }

    #[test]
    fn test_no_data_serializes_as_null() {
        let json = serde_json::to_value(Reading::NoData).unwrap();
        assert!(json.is_null());
        let json = serde_json::to_value(Reading::State(RatingState::Ok)).unwrap();
        assert_eq!(json, serde_json::json!("ok"));
    }
}
