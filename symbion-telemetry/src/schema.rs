//! Metric declarations per entity kind
//!
//! Each kind declares two explicit sets: `plain` (every metric it records)
//! and `ratable` (the subset that also carries actual/expected/state
//! channels). Both are `const` and checked at compile time, so a kind can
//! never declare a rated metric it does not record.

use serde::{Deserialize, Serialize};

/// The three rated sub-channels of a metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatedChannel {
    ActualValue,
    ExpectedValue,
    State,
}

impl RatedChannel {
    pub const ALL: [RatedChannel; 3] = [
        RatedChannel::ActualValue,
        RatedChannel::ExpectedValue,
        RatedChannel::State,
    ];

    pub fn suffix(&self) -> &'static str {
        match self {
            RatedChannel::ActualValue => ".actual_value",
            RatedChannel::ExpectedValue => ".expected_value",
            RatedChannel::State => ".state",
        }
    }

    /// Full channel key, e.g. `dropped_msgs.state`
    pub fn key(&self, metric: &str) -> String {
        format!("{metric}{}", self.suffix())
    }
}

/// Fixed metric declaration of an entity kind
#[derive(Debug, Clone, Copy)]
pub struct MetricSchema {
    pub plain: &'static [&'static str],
    pub ratable: &'static [&'static str],
}

impl MetricSchema {
    /// Builds a schema, rejecting duplicates and ratable names missing from
    /// `plain`. Evaluated in a `const` context this is a compile error.
    pub const fn new(plain: &'static [&'static str], ratable: &'static [&'static str]) -> Self {
        assert!(!has_duplicates(plain), "duplicate plain metric");
        assert!(!has_duplicates(ratable), "duplicate ratable metric");
        let mut i = 0;
        while i < ratable.len() {
            assert!(contains(plain, ratable[i]), "ratable metric is not a plain metric");
            i += 1;
        }
        Self { plain, ratable }
    }

    pub fn is_plain(&self, name: &str) -> bool {
        self.plain.contains(&name)
    }

    pub fn is_ratable(&self, name: &str) -> bool {
        self.ratable.contains(&name)
    }
}

const fn str_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    let mut i = 0;
    while i < a.len() {
        if a[i] != b[i] {
            return false;
        }
        i += 1;
    }
    true
}

const fn contains(set: &[&str], name: &str) -> bool {
    let mut i = 0;
    while i < set.len() {
        if str_eq(set[i], name) {
            return true;
        }
        i += 1;
    }
    false
}

const fn has_duplicates(set: &[&str]) -> bool {
    let mut i = 0;
    while i < set.len() {
        let mut j = i + 1;
        while j < set.len() {
            if str_eq(set[i], set[j]) {
                return true;
            }
            j += 1;
        }
        i += 1;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: MetricSchema = MetricSchema::new(&["a", "b", "c"], &["a", "c"]);

    #[test]
    fn test_channel_keys() {
        assert_eq!(RatedChannel::ActualValue.key("period_max"), "period_max.actual_value");
        assert_eq!(RatedChannel::ExpectedValue.key("period_max"), "period_max.expected_value");
        assert_eq!(RatedChannel::State.key("period_max"), "period_max.state");
    }

    #[test]
    fn test_schema_membership() {
        assert!(SAMPLE.is_plain("b"));
        assert!(!SAMPLE.is_ratable("b"));
        assert!(SAMPLE.is_ratable("c"));
        assert!(!SAMPLE.is_plain("d"));
    }

    #[test]
    #[should_panic(expected = "ratable metric is not a plain metric")]
    fn test_schema_rejects_foreign_ratable() {
        let plain: &'static [&'static str] = &["a"];
        let ratable: &'static [&'static str] = &["z"];
        MetricSchema::new(plain, ratable);
    }

    #[test]
    #[should_panic(expected = "duplicate plain metric")]
    fn test_schema_rejects_duplicates() {
        let plain: &'static [&'static str] = &["a", "a"];
        MetricSchema::new(plain, &[]);
    }
}
