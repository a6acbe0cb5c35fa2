//! Shared types for the tank monitoring pipeline.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

// ============================================================================
// Sensor Classes
// ============================================================================

/// The three supported tank-level sensor classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorClass {
    /// Float switch on a digital input. Reports empty (0) or full (height).
    Digital,
    /// Ratiometric voltage sensor (e.g. Dwyer 626, 0.5-4.5 V).
    AnalogVoltage,
    /// 4-20 mA current loop sensor behind an I2C ADC module.
    CurrentLoop,
}

impl SensorClass {
    /// Whether readings from this class are expected to vary over time.
    /// A digital float switch legitimately sits at one value for days, so
    /// stuck-sensor detection only applies to the analog classes.
    pub fn expects_variation(self) -> bool {
        !matches!(self, Self::Digital)
    }
}

// ============================================================================
// Event Categories
// ============================================================================

/// Category of an outbound alarm-class event.
///
/// Each category has its own rate-limit cooldown lane; the recovery-flavored
/// categories are exempt from the hourly quota (an operator must always learn
/// that things are fine again).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventCategory {
    High,
    Low,
    Clear,
    SensorFault,
    SensorStuck,
    SensorRecovered,
}

impl EventCategory {
    /// Reason code used in outbound payloads.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Low => "low",
            Self::Clear => "clear",
            Self::SensorFault => "sensor-fault",
            Self::SensorStuck => "sensor-stuck",
            Self::SensorRecovered => "sensor-recovered",
        }
    }

    /// Recovery-flavored events bypass the hourly quota (but not the
    /// per-category cooldown).
    pub fn is_recovery(self) -> bool {
        matches!(self, Self::Clear | Self::SensorRecovered)
    }
}

impl std::fmt::Display for EventCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Sensor Health
// ============================================================================

/// Fault detector state for a vessel's sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SensorHealth {
    Healthy,
    Failed,
}

// ============================================================================
// Vessel Runtime State
// ============================================================================

/// Mutable per-vessel state, owned by the scheduler for the process lifetime.
///
/// Reset wholesale when a config change touches the vessel's hardware-relevant
/// fields (sensor class, channel, electrical range, height).
#[derive(Debug, Clone)]
pub struct VesselRuntime {
    /// Last accepted valid reading, in level units. Held (stale) while the
    /// sensor is failed.
    pub current_level: f64,
    /// Level at the last telemetry send, for change-threshold suppression.
    /// `None` until the first send (or after a threshold policy change).
    pub last_reported_level: Option<f64>,

    // Alarm latches and debounce counters
    pub high_latched: bool,
    pub low_latched: bool,
    pub high_debounce: u32,
    pub low_debounce: u32,
    pub clear_debounce: u32,

    // Fault tracking
    pub last_valid_reading: Option<f64>,
    pub consecutive_failures: u32,
    pub stuck_readings: u32,
    pub sensor_failed: bool,

    /// Whether the local indicator (relay/LED) is currently driven active.
    pub indicator_active: bool,
}

impl VesselRuntime {
    pub fn new() -> Self {
        Self {
            current_level: 0.0,
            last_reported_level: None,
            high_latched: false,
            low_latched: false,
            high_debounce: 0,
            low_debounce: 0,
            clear_debounce: 0,
            last_valid_reading: None,
            consecutive_failures: 0,
            stuck_readings: 0,
            sensor_failed: false,
            indicator_active: false,
        }
    }

    pub fn health(&self) -> SensorHealth {
        if self.sensor_failed {
            SensorHealth::Failed
        } else {
            SensorHealth::Healthy
        }
    }

    /// Whether the local indicator should be active right now: any latched
    /// alarm or a failed sensor. Independent of transport availability.
    pub fn wants_indicator(&self) -> bool {
        self.high_latched || self.low_latched || self.sensor_failed
    }
}

impl Default for VesselRuntime {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Rolling Timestamp Window
// ============================================================================

/// Bounded list of recent send timestamps, for the hourly alarm quota.
#[derive(Debug, Clone, Default)]
pub struct SendWindow {
    times: VecDeque<u64>,
}

impl SendWindow {
    /// Drop timestamps older than `window_secs` relative to `now`.
    pub fn prune(&mut self, now: u64, window_secs: u64) {
        while let Some(&t) = self.times.front() {
            if now.saturating_sub(t) >= window_secs {
                self.times.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn record(&mut self, now: u64) {
        self.times.push_back(now);
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digital_sensors_exempt_from_variation_check() {
        assert!(!SensorClass::Digital.expects_variation());
        assert!(SensorClass::AnalogVoltage.expects_variation());
        assert!(SensorClass::CurrentLoop.expects_variation());
    }

    #[test]
    fn recovery_categories() {
        assert!(EventCategory::Clear.is_recovery());
        assert!(EventCategory::SensorRecovered.is_recovery());
        assert!(!EventCategory::High.is_recovery());
        assert!(!EventCategory::SensorFault.is_recovery());
    }

    #[test]
    fn send_window_prunes_old_entries() {
        let mut w = SendWindow::default();
        w.record(100);
        w.record(1000);
        w.record(3500);
        w.prune(3700, 3600);
        assert_eq!(w.len(), 2); // 100 aged out
        w.prune(10_000, 3600);
        assert!(w.is_empty());
    }
}
