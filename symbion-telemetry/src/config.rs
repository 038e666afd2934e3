//! Telemetry model configuration
//!
//! Handles:
//! - History bound of every metric series
//! - Host defaults (core count, reset exclusions)
//! - Unit/label overrides for the presentation layer

use crate::error::{Result, TelemetryError};
use crate::host::ResourceCategory;
use crate::units::{UnitEntry, UnitTable};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

pub const CONFIG_ENV: &str = "SYMBION_TELEMETRY_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "telemetry.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub history_limit: usize,
    pub host: HostConfig,
    pub units: HashMap<String, UnitEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub cpu_core_count: Option<usize>,
    pub reset_exclusions: Vec<ResourceCategory>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            history_limit: 1000,
            host: HostConfig::default(),
            units: HashMap::new(),
        }
    }
}

impl TelemetryConfig {
    /// Loads from `$SYMBION_TELEMETRY_CONFIG` (or `telemetry.toml`).
    ///
    /// A missing file gives the defaults; an unreadable or invalid one is
    /// logged and also gives the defaults.
    pub fn load() -> Self {
        let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
        if !Path::new(&path).exists() {
            info!("No telemetry config at {}, using defaults", path);
            return Self::default();
        }
        Self::load_from(&path).unwrap_or_else(|e| {
            warn!("Invalid telemetry config {}: {}", path, e);
            Self::default()
        })
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.history_limit == 0 {
            return Err(TelemetryError::Config("history_limit must be at least 1".into()));
        }
        if self.host.cpu_core_count == Some(0) {
            return Err(TelemetryError::Config("host.cpu_core_count must be at least 1".into()));
        }
        if self.host.reset_exclusions.contains(&ResourceCategory::DriveSpace) {
            warn!("drive_space is never reset, exclusion is redundant");
        }
        Ok(())
    }

    /// Configured core count, else the machine's parallelism, else 1
    pub fn cpu_core_count(&self) -> usize {
        self.host.cpu_core_count.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }

    pub fn unit_table(&self) -> UnitTable {
        UnitTable::with_overrides(&self.units)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::UnitLookup;

    #[test]
    fn test_default_config() {
        let config = TelemetryConfig::default();
        assert_eq!(config.history_limit, 1000);
        assert!(config.host.reset_exclusions.is_empty());
        assert!(config.cpu_core_count() >= 1);
    }

    #[test]
    fn test_parse_toml() {
        let config = TelemetryConfig::from_toml_str(
            r#"
            history_limit = 50

            [host]
            cpu_core_count = 8
            reset_exclusions = ["msg_frequency"]

            [units.traffic]
            label = "Volume"
            unit = "KiB"
            "#,
        )
        .unwrap();
        assert_eq!(config.history_limit, 50);
        assert_eq!(config.cpu_core_count(), 8);
        assert_eq!(config.host.reset_exclusions, vec![ResourceCategory::MsgFrequency]);
        assert_eq!(config.unit_table().unit("traffic"), Some("KiB"));
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(TelemetryConfig::from_toml_str("  ").unwrap(), TelemetryConfig::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            TelemetryConfig::from_toml_str("history_limit = 0"),
            Err(TelemetryError::Config(_))
        ));
        assert!(matches!(
            TelemetryConfig::from_toml_str("history_limit = \"many\""),
            Err(TelemetryError::Toml(_))
        ));
        assert!(matches!(
            TelemetryConfig::from_toml_str("[host]\nreset_exclusions = [\"bogus\"]"),
            Err(TelemetryError::Toml(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("telemetry.toml");
        std::fs::write(&path, "history_limit = 7").unwrap();
        assert_eq!(TelemetryConfig::load_from(&path).unwrap().history_limit, 7);
        assert!(matches!(
            TelemetryConfig::load_from(dir.path().join("missing.toml")),
            Err(TelemetryError::Io(_))
        ));
    }
}
