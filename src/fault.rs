//! Sensor fault detection: out-of-range/read-failure streaks and stuck
//! sensors.
//!
//! Runs before alarm evaluation for every vessel, every sample. While a
//! sensor is failed the vessel's `current_level` is held at its last valid
//! value and the alarm state machine is not consulted at all; an alarm is
//! never raised or cleared on data already known to be bad.

use crate::acquisition::ReadError;
use crate::config::defaults::{
    SENSOR_FAILURE_THRESHOLD, STUCK_DELTA_UNITS, STUCK_READING_THRESHOLD,
    VALID_RANGE_HIGH_FRACTION, VALID_RANGE_LOW_FRACTION,
};
use crate::config::VesselConfig;
use crate::conversion;
use crate::types::{EventCategory, VesselRuntime};
use tracing::{debug, warn};

/// Outcome of feeding one sample through the fault detector.
#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    /// Validated, clamped level; `None` when the sample was rejected or
    /// the sensor is (still) failed.
    pub level: Option<f64>,
    /// Fault or recovery event to notify, if a state transition happened.
    pub event: Option<EventCategory>,
}

impl Assessment {
    fn rejected(event: Option<EventCategory>) -> Self {
        Self { level: None, event }
    }
}

/// Feed one raw sample (or read failure) through the per-vessel fault logic.
pub fn assess(
    vessel: &VesselConfig,
    rt: &mut VesselRuntime,
    sample: Result<f64, ReadError>,
) -> Assessment {
    let raw = match sample {
        Ok(raw) => raw,
        Err(e) => {
            debug!(vessel = %vessel.id, error = %e, "Sensor read failed");
            return bad_sample(vessel, rt);
        }
    };

    let unclamped = conversion::to_level_unclamped(vessel, raw);
    if !in_valid_range(vessel, unclamped) {
        debug!(
            vessel = %vessel.id,
            raw,
            level = unclamped,
            "Reading outside plausible band"
        );
        return bad_sample(vessel, rt);
    }

    // Valid sample: the failure streak is over, but the reading may still
    // be part of a stuck streak.
    rt.consecutive_failures = 0;

    if vessel.sensor.expects_variation() {
        match rt.last_valid_reading {
            Some(last) if (unclamped - last).abs() < STUCK_DELTA_UNITS => {
                rt.stuck_readings += 1;
            }
            _ => rt.stuck_readings = 0,
        }
    }
    rt.last_valid_reading = Some(unclamped);

    if rt.stuck_readings >= STUCK_READING_THRESHOLD {
        if !rt.sensor_failed {
            rt.sensor_failed = true;
            warn!(
                vessel = %vessel.id,
                level = unclamped,
                streak = rt.stuck_readings,
                "Sensor stuck; suspending alarm evaluation"
            );
            return Assessment::rejected(Some(EventCategory::SensorStuck));
        }
        return Assessment::rejected(None);
    }

    // Valid, non-stuck reading: accept it, recovering the sensor if needed.
    let event = if rt.sensor_failed {
        rt.sensor_failed = false;
        debug!(vessel = %vessel.id, level = unclamped, "Sensor recovered");
        Some(EventCategory::SensorRecovered)
    } else {
        None
    };

    let level = conversion::to_level(vessel, raw);
    rt.current_level = level;

    Assessment {
        level: Some(level),
        event,
    }
}

fn bad_sample(vessel: &VesselConfig, rt: &mut VesselRuntime) -> Assessment {
    rt.consecutive_failures += 1;
    // A failed read interrupts any stuck streak; the two faults are tracked
    // separately.
    rt.stuck_readings = 0;

    if rt.consecutive_failures >= SENSOR_FAILURE_THRESHOLD && !rt.sensor_failed {
        rt.sensor_failed = true;
        warn!(
            vessel = %vessel.id,
            streak = rt.consecutive_failures,
            "Sensor failed; suspending alarm evaluation"
        );
        return Assessment::rejected(Some(EventCategory::SensorFault));
    }
    Assessment::rejected(None)
}

fn in_valid_range(vessel: &VesselConfig, level: f64) -> bool {
    let low = VALID_RANGE_LOW_FRACTION * vessel.height_units;
    let high = VALID_RANGE_HIGH_FRACTION * vessel.height_units;
    level >= low && level <= high
}
