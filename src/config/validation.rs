//! Config validation: fatal range errors vs. non-fatal warnings.
//!
//! Errors reject the whole config at the `apply_config` boundary; the
//! previous valid configuration stays live rather than running with
//! overlapping alarm bands or a zero-height tank. Warnings are logged and
//! the config is accepted.

use super::defaults::DEFAULT_SAMPLE_INTERVAL_SECS;
use super::{DeviceConfig, VesselConfig};
use crate::types::SensorClass;
use std::collections::HashSet;

/// A non-fatal config warning (suspicious but workable value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Outcome of a validation pass.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validate a full device config.
pub fn validate(config: &DeviceConfig) -> ValidationReport {
    let mut report = ValidationReport::default();

    if config.report_hour > 23 {
        report.errors.push(format!(
            "report_hour = {} is not a valid hour (0-23)",
            config.report_hour
        ));
    }
    if config.report_minute > 59 {
        report.errors.push(format!(
            "report_minute = {} is not a valid minute (0-59)",
            config.report_minute
        ));
    }

    if config.sample_interval_secs == 0 {
        report
            .errors
            .push("sample_interval_secs = 0 would busy-loop the radio".to_string());
    } else if config.sample_interval_secs < 60 {
        report.warnings.push(ValidationWarning {
            field: "sample_interval_secs".to_string(),
            message: format!(
                "{} s is unusually short for a battery deployment (default {} s)",
                config.sample_interval_secs, DEFAULT_SAMPLE_INTERVAL_SECS
            ),
        });
    }

    if config.vessels.is_empty() {
        report.warnings.push(ValidationWarning {
            field: "vessels".to_string(),
            message: "no vessels configured; nothing will be monitored".to_string(),
        });
    }

    let mut seen_ids: HashSet<&str> = HashSet::new();
    for vessel in &config.vessels {
        if !seen_ids.insert(vessel.id.as_str()) {
            report
                .errors
                .push(format!("duplicate vessel id '{}'", vessel.id));
        }
        validate_vessel(vessel, &mut report);
    }

    report
}

fn validate_vessel(vessel: &VesselConfig, report: &mut ValidationReport) {
    let id = &vessel.id;

    if vessel.id.is_empty() {
        report.errors.push("vessel id must not be empty".to_string());
    }

    // Analog classes divide by height; digital only uses it as the "full" level.
    if vessel.sensor.expects_variation() && vessel.height_units <= 0.0 {
        report.errors.push(format!(
            "vessel '{id}': height_units = {} must be > 0 for {:?} sensors",
            vessel.height_units, vessel.sensor
        ));
    }

    if vessel.sensor != SensorClass::Digital && vessel.raw_min >= vessel.raw_max {
        report.errors.push(format!(
            "vessel '{id}': electrical range [{}, {}] is empty or inverted",
            vessel.raw_min, vessel.raw_max
        ));
    }

    if vessel.hysteresis < 0.0 {
        report.errors.push(format!(
            "vessel '{id}': hysteresis = {} cannot be negative",
            vessel.hysteresis
        ));
    }

    // Overlapping bands would let one level sit in both the high-clear and
    // low-clear regions at once; reject rather than clamp.
    if vessel.high_clear() <= vessel.low_clear() {
        report.errors.push(format!(
            "vessel '{id}': alarm bands overlap; high_alarm - hysteresis ({}) must exceed low_alarm + hysteresis ({})",
            vessel.high_clear(),
            vessel.low_clear()
        ));
    }

    if vessel.level_change_threshold < 0.0 {
        report.errors.push(format!(
            "vessel '{id}': level_change_threshold = {} cannot be negative",
            vessel.level_change_threshold
        ));
    }

    if vessel.high_alarm > vessel.height_units {
        report.warnings.push(ValidationWarning {
            field: format!("vessels.{id}.high_alarm"),
            message: format!(
                "{} is above the tank height ({}); the alarm can never trip",
                vessel.high_alarm, vessel.height_units
            ),
        });
    }
    if vessel.low_alarm < 0.0 {
        report.warnings.push(ValidationWarning {
            field: format!("vessels.{id}.low_alarm"),
            message: format!("{} is below empty; the alarm can never trip", vessel.low_alarm),
        });
    }
}
