//! Host sample source boundary
//!
//! A source measures one sampling window and hands it over as a
//! `HostSampleBatch`; `Host::apply_batch` records it. With the
//! `system-source` feature, `SystemSampleSource` measures the local machine
//! through sysinfo:
//! - CPU usage statistics across cores
//! - RAM usage
//! - CPU temperatures (package and per core, when sensors expose them)
//! - Per-interface bandwidth (bytes/s) over the previous window
//! - Free space per disk

use crate::error::{Result, TelemetryError};
use crate::host::ResourceCategory;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One sampling window for a host
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostSampleBatch {
    /// (load metric name, value), e.g. ("cpu_usage_mean", 12.5)
    #[serde(default)]
    pub load: Vec<(String, f64)>,
    #[serde(default)]
    pub cpu_temp: Option<f64>,
    #[serde(default)]
    pub cpu_temp_core: Vec<f64>,
    #[serde(default)]
    pub gpu_temp: Vec<f64>,
    #[serde(default)]
    pub bandwidth: Vec<(String, f64)>,
    #[serde(default)]
    pub msg_frequency: Vec<(String, f64)>,
    #[serde(default)]
    pub drive_write: Vec<(String, f64)>,
    #[serde(default)]
    pub drive_read: Vec<(String, f64)>,
    #[serde(default)]
    pub drive_space: Vec<(String, f64)>,
}

impl HostSampleBatch {
    /// Every keyed resource sample of the batch
    pub fn resources(&self) -> impl Iterator<Item = (ResourceCategory, &str, f64)> {
        [
            (ResourceCategory::Bandwidth, &self.bandwidth),
            (ResourceCategory::MsgFrequency, &self.msg_frequency),
            (ResourceCategory::DriveWrite, &self.drive_write),
            (ResourceCategory::DriveRead, &self.drive_read),
            (ResourceCategory::DriveSpace, &self.drive_space),
        ]
        .into_iter()
        .flat_map(|(category, samples)| {
            samples.iter().map(move |(key, value)| (category, key.as_str(), *value))
        })
    }
}

/// Outcome of recording one batch. Every entry is attempted; rejected ones
/// are collected in batch order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub applied: usize,
    pub rejected: Vec<TelemetryError>,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }

    pub(crate) fn record(&mut self, outcome: Result<()>) {
        match outcome {
            Ok(()) => self.applied += 1,
            Err(e) => self.rejected.push(e),
        }
    }
}

/// Producer of host sampling windows (the OS measurement side)
pub trait HostSampleSource {
    fn sample(&mut self) -> Result<HostSampleBatch>;

    /// Number of per-core temperatures each batch carries, when known.
    /// Hosts fed by this source should be sized with it.
    fn core_count(&self) -> Option<usize> {
        None
    }
}

/// (mean, population stddev, max) of `values`, `None` when empty
pub fn summarize(values: &[f64]) -> Option<(f64, f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let max = values.iter().copied().fold(f64::MIN, f64::max);
    Some((mean, variance.sqrt(), max))
}

/// Splits sensor readings into the package temperature and the per-core
/// temperatures (one per physical core sensor, in sensor order)
pub fn classify_temperatures<'a>(
    readings: impl IntoIterator<Item = (&'a str, f64)>,
) -> (Option<f64>, Vec<f64>) {
    let mut package = None;
    let mut cores = Vec::new();
    for (label, temp) in readings {
        let label = label.to_ascii_lowercase();
        if label.contains("package") || label.contains("tctl") {
            package = Some(temp);
        } else if label.contains("core") {
            cores.push(temp);
        }
    }
    (package, cores)
}

/// Byte counter delta turned into bytes/s; 0 for an empty window
pub fn per_second(bytes: u64, window: Duration) -> f64 {
    let secs = window.as_secs_f64();
    if secs > 0.0 {
        bytes as f64 / secs
    } else {
        0.0
    }
}

#[cfg(feature = "system-source")]
pub use system::SystemSampleSource;

#[cfg(feature = "system-source")]
mod system {
    use super::{classify_temperatures, per_second, summarize, HostSampleBatch, HostSampleSource};
    use crate::error::Result;
    use std::time::Instant;
    use sysinfo::{Components, Disks, Networks, System};
    use tracing::debug;

    /// Samples the local machine
    pub struct SystemSampleSource {
        sys: System,
        networks: Networks,
        disks: Disks,
        components: Components,
        core_count: usize,
        last_refresh: Instant,
    }

    impl SystemSampleSource {
        pub fn new() -> Self {
            let mut sys = System::new_all();
            sys.refresh_all();
            let components = Components::new_with_refreshed_list();
            let (_, core_temps) =
                classify_temperatures(components.list().iter().map(|c| (c.label(), c.temperature() as f64)));
            // sensors report physical cores; without any, fall back to logical CPUs
            let core_count = if core_temps.is_empty() {
                sys.cpus().len().max(1)
            } else {
                core_temps.len()
            };
            Self {
                sys,
                networks: Networks::new_with_refreshed_list(),
                disks: Disks::new_with_refreshed_list(),
                components,
                core_count,
                last_refresh: Instant::now(),
            }
        }
    }

    impl Default for SystemSampleSource {
        fn default() -> Self {
            Self::new()
        }
    }

    impl HostSampleSource for SystemSampleSource {
        fn sample(&mut self) -> Result<HostSampleBatch> {
            debug!("Collecting host sample window...");

            self.sys.refresh_cpu();
            self.sys.refresh_memory();
            self.networks.refresh();
            self.disks.refresh();
            self.components.refresh();
            let window = self.last_refresh.elapsed();
            self.last_refresh = Instant::now();

            let mut batch = HostSampleBatch::default();

            let usage: Vec<f64> = self.sys.cpus().iter().map(|c| c.cpu_usage() as f64).collect();
            if let Some((mean, stddev, max)) = summarize(&usage) {
                batch.load.push(("cpu_usage_mean".into(), mean));
                batch.load.push(("cpu_usage_stddev".into(), stddev));
                batch.load.push(("cpu_usage_max".into(), max));
            }

            let total = self.sys.total_memory();
            if total > 0 {
                let percent = self.sys.used_memory() as f64 / total as f64 * 100.0;
                batch.load.push(("ram_usage_mean".into(), percent));
                batch.load.push(("ram_usage_stddev".into(), 0.0));
                batch.load.push(("ram_usage_max".into(), percent));
            }

            let (package, core_temps) = classify_temperatures(
                self.components.list().iter().map(|c| (c.label(), c.temperature() as f64)),
            );
            batch.cpu_temp = package;
            if let Some((mean, stddev, max)) = summarize(&core_temps) {
                batch.load.push(("cpu_temp_mean".into(), mean));
                batch.load.push(("cpu_temp_stddev".into(), stddev));
                batch.load.push(("cpu_temp_max".into(), max));
            }
            if core_temps.len() == self.core_count {
                batch.cpu_temp_core = core_temps;
            } else if !core_temps.is_empty() {
                debug!(expected = self.core_count, actual = core_temps.len(), "core sensor set changed, skipping per-core temperatures");
            }

            for (name, data) in self.networks.iter() {
                let bytes = data.received() + data.transmitted();
                batch.bandwidth.push((name.clone(), per_second(bytes, window)));
            }

            for disk in self.disks.list() {
                let name = disk.name().to_string_lossy().to_string();
                batch.drive_space.push((name, disk.available_space() as f64));
            }

            Ok(batch)
        }

        /// Per-core temperature channels, fixed when the source is created
        fn core_count(&self) -> Option<usize> {
            Some(self.core_count)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summarize() {
        assert_eq!(summarize(&[]), None);
        let (mean, stddev, max) = summarize(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert_eq!(mean, 5.0);
        assert_eq!(stddev, 2.0);
        assert_eq!(max, 9.0);
    }

    #[test]
    fn test_batch_resources_flatten() {
        let batch = HostSampleBatch {
            bandwidth: vec![("eth0".into(), 10.0)],
            drive_space: vec![("sda".into(), 5.0)],
            ..Default::default()
        };
        let resources: Vec<_> = batch.resources().collect();
        assert_eq!(
            resources,
            vec![
                (ResourceCategory::Bandwidth, "eth0", 10.0),
                (ResourceCategory::DriveSpace, "sda", 5.0),
            ]
        );
    }

    #[test]
    fn test_batch_from_json_defaults_missing_fields() {
        let batch: HostSampleBatch =
            serde_json::from_value(serde_json::json!({"cpu_temp": 51.0})).unwrap();
        assert_eq!(batch.cpu_temp, Some(51.0));
        assert!(batch.bandwidth.is_empty());
    }

    #[test]
    fn test_classify_temperatures() {
        let readings = [
            ("Package id 0", 55.0),
            ("Core 0", 50.0),
            ("Core 1", 52.0),
            ("acpitz temp1", 30.0),
        ];
        let (package, cores) = classify_temperatures(readings);
        assert_eq!(package, Some(55.0));
        assert_eq!(cores, vec![50.0, 52.0]);
        assert_eq!(classify_temperatures([("nvme Composite", 40.0)]), (None, vec![]));
    }

    #[test]
    fn test_per_second() {
        assert_eq!(per_second(4096, Duration::from_secs(2)), 2048.0);
        assert_eq!(per_second(4096, Duration::ZERO), 0.0);
    }

    #[test]
    fn test_default_source_core_count_is_unknown() {
        struct Fixed;
        impl HostSampleSource for Fixed {
            fn sample(&mut self) -> Result<HostSampleBatch> {
                Ok(HostSampleBatch::default())
            }
        }
        assert_eq!(Fixed.core_count(), None);
    }

    #[cfg(feature = "system-source")]
    #[test]
    fn test_system_source_samples() {
        let mut source = SystemSampleSource::new();
        let cores = source.core_count().unwrap();
        assert!(cores > 0);
        let batch = source.sample().unwrap();
        assert!(batch.load.iter().any(|(m, _)| m == "cpu_usage_mean"));
        assert!(batch.cpu_temp_core.is_empty() || batch.cpu_temp_core.len() == cores);
        assert!(batch.bandwidth.iter().all(|(_, rate)| *rate >= 0.0));
    }

    #[cfg(feature = "system-source")]
    #[test]
    fn test_host_sized_from_system_source_accepts_batches() {
        use crate::host::Host;

        let mut source = SystemSampleSource::new();
        let mut host = Host::new("local", None, source.core_count().unwrap(), 10, None).unwrap();
        for _ in 0..2 {
            let report = host.apply_batch(&source.sample().unwrap());
            assert!(report.is_clean(), "{:?}", report.rejected);
        }
    }
}
