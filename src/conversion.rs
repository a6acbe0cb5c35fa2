//! Raw sensor sample → calibrated level conversion.
//!
//! Pure functions, no I/O. Analog classes map the sensor's electrical range
//! linearly onto `[0, height_units]` and clamp: an out-of-range electrical
//! reading never produces an out-of-range physical level here. Range
//! plausibility (wiring faults) is the fault detector's job, which looks at
//! the raw sample before clamping.

use crate::config::defaults::RANGE_EPSILON;
use crate::config::VesselConfig;
use crate::types::SensorClass;

/// Convert a raw sample to a level in the vessel's units.
///
/// - Digital: the configured triggering state reads as full height, the
///   other state as empty. `raw` is the electrical line level (0/1).
/// - AnalogVoltage / CurrentLoop: linear map of `[raw_min, raw_max]` onto
///   `[0, height_units]`, clamped to that closed interval.
pub fn to_level(vessel: &VesselConfig, raw: f64) -> f64 {
    match vessel.sensor {
        SensorClass::Digital => {
            let active = raw >= 0.5;
            if active == vessel.digital_active_high {
                vessel.height_units
            } else {
                0.0
            }
        }
        SensorClass::AnalogVoltage | SensorClass::CurrentLoop => {
            linear_map(raw, vessel.raw_min, vessel.raw_max, vessel.height_units)
        }
    }
}

/// Same mapping without the output clamp. The fault detector uses this to
/// see how far outside the plausible band a wiring fault lands (a
/// disconnected 4-20 mA loop reads 0 mA, which maps well below empty).
pub fn to_level_unclamped(vessel: &VesselConfig, raw: f64) -> f64 {
    match vessel.sensor {
        SensorClass::Digital => to_level(vessel, raw),
        SensorClass::AnalogVoltage | SensorClass::CurrentLoop => {
            let span = vessel.raw_max - vessel.raw_min;
            if span < RANGE_EPSILON {
                return 0.0;
            }
            (raw - vessel.raw_min) / span * vessel.height_units
        }
    }
}

/// Percent-full for reporting, clamped to [0, 100].
pub fn percent_full(level: f64, height_units: f64) -> f64 {
    if height_units <= RANGE_EPSILON {
        return 0.0;
    }
    (level / height_units * 100.0).clamp(0.0, 100.0)
}

fn linear_map(raw: f64, raw_min: f64, raw_max: f64, height_units: f64) -> f64 {
    let span = raw_max - raw_min;
    if span < RANGE_EPSILON {
        // Degenerate calibration; return the low bound instead of dividing
        // by (near-)zero.
        return 0.0;
    }
    ((raw - raw_min) / span * height_units).clamp(0.0, height_units)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VesselConfig;
    use crate::types::SensorClass;

    fn current_loop_vessel() -> VesselConfig {
        VesselConfig {
            sensor: SensorClass::CurrentLoop,
            raw_min: 4.0,
            raw_max: 20.0,
            height_units: 120.0,
            ..VesselConfig::default()
        }
    }

    fn voltage_vessel() -> VesselConfig {
        VesselConfig {
            sensor: SensorClass::AnalogVoltage,
            raw_min: 0.5,
            raw_max: 4.5,
            height_units: 120.0,
            ..VesselConfig::default()
        }
    }

    #[test]
    fn current_loop_midpoint() {
        // (12-4)/(20-4) * 120 = 60.0 exactly
        let v = current_loop_vessel();
        assert_eq!(to_level(&v, 12.0), 60.0);
    }

    #[test]
    fn current_loop_endpoints() {
        let v = current_loop_vessel();
        assert_eq!(to_level(&v, 4.0), 0.0);
        assert_eq!(to_level(&v, 20.0), 120.0);
    }

    #[test]
    fn clamps_below_range() {
        // 3 mA on a 4-20 loop reads as empty, not negative
        let v = current_loop_vessel();
        assert_eq!(to_level(&v, 3.0), 0.0);
    }

    #[test]
    fn clamps_above_range() {
        let v = current_loop_vessel();
        assert_eq!(to_level(&v, 22.0), 120.0);
    }

    #[test]
    fn monotonic_within_range() {
        let v = voltage_vessel();
        let mut prev = f64::NEG_INFINITY;
        let mut raw = v.raw_min;
        while raw <= v.raw_max {
            let level = to_level(&v, raw);
            assert!(level >= prev, "not monotonic at raw={raw}");
            prev = level;
            raw += 0.01;
        }
    }

    #[test]
    fn voltage_table() {
        let v = voltage_vessel();
        let cases = [
            (0.5, 0.0),
            (2.5, 60.0),
            (4.5, 120.0),
            (0.0, 0.0),  // clamped
            (5.0, 120.0), // clamped
        ];
        for (raw, expected) in cases {
            let got = to_level(&v, raw);
            assert!(
                (got - expected).abs() < 1e-9,
                "raw={raw}: expected {expected}, got {got}"
            );
        }
    }

    #[test]
    fn degenerate_span_returns_low_bound() {
        let mut v = current_loop_vessel();
        v.raw_max = v.raw_min + 1e-9;
        assert_eq!(to_level(&v, 12.0), 0.0);
    }

    #[test]
    fn digital_active_high() {
        let v = VesselConfig {
            sensor: SensorClass::Digital,
            digital_active_high: true,
            height_units: 120.0,
            ..VesselConfig::default()
        };
        assert_eq!(to_level(&v, 1.0), 120.0);
        assert_eq!(to_level(&v, 0.0), 0.0);
    }

    #[test]
    fn digital_active_low() {
        let v = VesselConfig {
            sensor: SensorClass::Digital,
            digital_active_high: false,
            height_units: 120.0,
            ..VesselConfig::default()
        };
        assert_eq!(to_level(&v, 0.0), 120.0);
        assert_eq!(to_level(&v, 1.0), 0.0);
    }

    #[test]
    fn unclamped_exposes_wiring_faults() {
        let v = current_loop_vessel();
        // 0 mA (disconnected loop) maps to -30 inches unclamped
        assert_eq!(to_level_unclamped(&v, 0.0), -30.0);
        assert_eq!(to_level(&v, 0.0), 0.0);
    }

    #[test]
    fn percent_full_clamps() {
        assert_eq!(percent_full(60.0, 120.0), 50.0);
        assert_eq!(percent_full(-5.0, 120.0), 0.0);
        assert_eq!(percent_full(150.0, 120.0), 100.0);
        assert_eq!(percent_full(10.0, 0.0), 0.0);
    }
}
