//! Device and vessel configuration.
//!
//! Loaded from TOML, replaced wholesale through [`crate::scheduler::Scheduler::apply_config`]
//! on a remote reconfiguration. Every field has a default matching the
//! original deployment values, so a minimal config (or none at all, for the
//! simulator) still runs.
//!
//! ## Loading Order
//!
//! 1. `TANKALARM_CONFIG` environment variable (path to TOML file)
//! 2. `tankalarm.toml` in the current working directory
//! 3. Built-in defaults (one simulated current-loop vessel)

pub mod defaults;
mod validation;

pub use validation::{validate, ValidationReport, ValidationWarning};

use crate::types::SensorClass;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(String),
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// Device Config
// ============================================================================

/// Root configuration for one field unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Device identity (reported in every payload)
    #[serde(default)]
    pub device: DeviceInfo,

    /// Sampling interval in seconds. The original firmware default is
    /// 30 minutes; battery deployments push this higher.
    #[serde(default = "default_sample_interval")]
    pub sample_interval_secs: u64,

    /// Daily report time of day (local)
    #[serde(default = "default_report_hour")]
    pub report_hour: u8,
    #[serde(default = "default_report_minute")]
    pub report_minute: u8,

    /// Monitored vessels
    #[serde(default)]
    pub vessels: Vec<VesselConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    #[serde(default = "default_device_id")]
    pub id: String,
    #[serde(default = "default_site")]
    pub site: String,
}

impl Default for DeviceInfo {
    fn default() -> Self {
        Self {
            id: default_device_id(),
            site: default_site(),
        }
    }
}

fn default_device_id() -> String {
    "tankalarm-01".to_string()
}

fn default_site() -> String {
    "Unnamed Site".to_string()
}

fn default_sample_interval() -> u64 {
    defaults::DEFAULT_SAMPLE_INTERVAL_SECS
}

fn default_report_hour() -> u8 {
    defaults::DEFAULT_REPORT_HOUR
}

fn default_report_minute() -> u8 {
    defaults::DEFAULT_REPORT_MINUTE
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            device: DeviceInfo::default(),
            sample_interval_secs: default_sample_interval(),
            report_hour: default_report_hour(),
            report_minute: default_report_minute(),
            vessels: vec![VesselConfig::default()],
        }
    }
}

impl DeviceConfig {
    /// Load configuration using the standard search order:
    /// 1. `$TANKALARM_CONFIG` environment variable
    /// 2. `./tankalarm.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var("TANKALARM_CONFIG") {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded config from TANKALARM_CONFIG");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from TANKALARM_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "TANKALARM_CONFIG points to non-existent file, falling back");
            }
        }

        let local = PathBuf::from("tankalarm.toml");
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded config from ./tankalarm.toml");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./tankalarm.toml, using defaults");
                }
            }
        }

        info!("No tankalarm.toml found; using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        toml::from_str(&raw).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Find a vessel config by id.
    pub fn vessel(&self, id: &str) -> Option<&VesselConfig> {
        self.vessels.iter().find(|v| v.id == id)
    }
}

// ============================================================================
// Vessel Config
// ============================================================================

/// Per-vessel configuration. Immutable between reconfiguration cycles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VesselConfig {
    /// Short identifying code, unique within the device (e.g. "A", "T1").
    pub id: String,

    /// Sensor class wired to this vessel.
    #[serde(default = "default_sensor_class")]
    pub sensor: SensorClass,

    /// Physical input: GPIO pin for digital, ADC pin or I2C channel otherwise.
    #[serde(default)]
    pub channel: u16,

    /// Total measurable span in level units (tank height in inches).
    /// Must be positive for the analog classes.
    #[serde(default = "default_height")]
    pub height_units: f64,

    /// Electrical range the sensor maps onto `[0, height_units]`.
    /// Defaults cover a 4-20 mA loop; voltage sensors override these
    /// (e.g. 0.5-4.5 V ratiometric).
    #[serde(default = "default_raw_min")]
    pub raw_min: f64,
    #[serde(default = "default_raw_max")]
    pub raw_max: f64,

    /// Electrical state of a digital float that means "triggered".
    #[serde(default = "default_true")]
    pub digital_active_high: bool,

    /// Alarm thresholds, in level units.
    #[serde(default = "default_high_alarm")]
    pub high_alarm: f64,
    #[serde(default = "default_low_alarm")]
    pub low_alarm: f64,

    /// Margin between trigger and clear thresholds. Must leave the two
    /// clear bands non-overlapping: `high - hysteresis > low + hysteresis`.
    #[serde(default = "default_hysteresis")]
    pub hysteresis: f64,

    /// Minimum level change (units) before a periodic telemetry sample is
    /// worth sending. 0 = send every sample.
    #[serde(default)]
    pub level_change_threshold: f64,

    /// Feature gates
    #[serde(default = "default_true")]
    pub daily_report: bool,
    #[serde(default = "default_true")]
    pub alarm_escalation: bool,
    #[serde(default = "default_true")]
    pub server_upload: bool,
}

fn default_sensor_class() -> SensorClass {
    SensorClass::CurrentLoop
}

fn default_height() -> f64 {
    120.0
}

fn default_raw_min() -> f64 {
    4.0
}

fn default_raw_max() -> f64 {
    20.0
}

fn default_high_alarm() -> f64 {
    100.0
}

fn default_low_alarm() -> f64 {
    12.0
}

fn default_hysteresis() -> f64 {
    2.0
}

fn default_true() -> bool {
    true
}

impl Default for VesselConfig {
    fn default() -> Self {
        Self {
            id: "A".to_string(),
            sensor: default_sensor_class(),
            channel: 0,
            height_units: default_height(),
            raw_min: default_raw_min(),
            raw_max: default_raw_max(),
            digital_active_high: true,
            high_alarm: default_high_alarm(),
            low_alarm: default_low_alarm(),
            hysteresis: default_hysteresis(),
            level_change_threshold: 0.0,
            daily_report: true,
            alarm_escalation: true,
            server_upload: true,
        }
    }
}

impl VesselConfig {
    /// High-side clear threshold (trigger minus hysteresis).
    pub fn high_clear(&self) -> f64 {
        self.high_alarm - self.hysteresis
    }

    /// Low-side clear threshold (trigger plus hysteresis).
    pub fn low_clear(&self) -> f64 {
        self.low_alarm + self.hysteresis
    }

    /// Whether a config change touches fields that invalidate runtime
    /// fault/debounce state (rewired hardware means old counters are
    /// meaningless).
    pub fn hardware_changed(&self, other: &Self) -> bool {
        self.sensor != other.sensor
            || self.channel != other.channel
            || (self.height_units - other.height_units).abs() > f64::EPSILON
            || (self.raw_min - other.raw_min).abs() > f64::EPSILON
            || (self.raw_max - other.raw_max).abs() > f64::EPSILON
            || self.digital_active_high != other.digital_active_high
    }
}
