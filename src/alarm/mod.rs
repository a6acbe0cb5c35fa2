//! Alarm evaluation: debounced, hysteretic high/low latching.
//!
//! A bare threshold compare on noisy analog data chatters; rapid
//! alarm/clear/alarm floods SMS and masks real events. Debounce filters
//! transient spikes; hysteresis keeps a level parked exactly on a threshold
//! from oscillating. Counters reset on any disqualifying sample, so slow
//! oscillation near a threshold never accumulates partial credit.

mod rate_limiter;

pub use rate_limiter::RateLimiter;

use crate::config::defaults::ALARM_DEBOUNCE_COUNT;
use crate::config::VesselConfig;
use crate::types::{EventCategory, VesselRuntime};
use tracing::info;

/// Evaluate one validated level reading against the vessel's alarm bands.
///
/// Must only be called while the vessel's sensor is healthy; the caller
/// (scheduler) gates this on the fault detector. Returns the alarm event to
/// notify, if a latch state changed.
pub fn evaluate(
    vessel: &VesselConfig,
    rt: &mut VesselRuntime,
    level: f64,
) -> Option<EventCategory> {
    debug_assert!(!rt.sensor_failed, "alarm evaluation on a failed sensor");

    let high_trigger = vessel.high_alarm;
    let low_trigger = vessel.low_alarm;
    let high_clear = vessel.high_clear();
    let low_clear = vessel.low_clear();

    if !rt.high_latched && level >= high_trigger {
        rt.high_debounce += 1;
        rt.low_debounce = 0;
        rt.clear_debounce = 0;
        if rt.high_debounce >= ALARM_DEBOUNCE_COUNT {
            rt.high_debounce = 0;
            rt.high_latched = true;
            // A new high alarm supersedes a stale low latch (a step change
            // can jump the dead band without ever clearing through it).
            rt.low_latched = false;
            info!(vessel = %vessel.id, level, "HIGH alarm latched");
            return Some(EventCategory::High);
        }
        return None;
    }

    if !rt.low_latched && level <= low_trigger {
        rt.low_debounce += 1;
        rt.high_debounce = 0;
        rt.clear_debounce = 0;
        if rt.low_debounce >= ALARM_DEBOUNCE_COUNT {
            rt.low_debounce = 0;
            rt.low_latched = true;
            rt.high_latched = false;
            info!(vessel = %vessel.id, level, "LOW alarm latched");
            return Some(EventCategory::Low);
        }
        return None;
    }

    // Hysteresis dead band: strictly inside both clear thresholds.
    if (rt.high_latched || rt.low_latched) && level < high_clear && level > low_clear {
        rt.clear_debounce += 1;
        rt.high_debounce = 0;
        rt.low_debounce = 0;
        if rt.clear_debounce >= ALARM_DEBOUNCE_COUNT {
            rt.clear_debounce = 0;
            rt.high_latched = false;
            rt.low_latched = false;
            info!(vessel = %vessel.id, level, "Alarm cleared");
            return Some(EventCategory::Clear);
        }
        return None;
    }

    // Neither triggering nor clearing: no partial credit carries over.
    rt.high_debounce = 0;
    rt.low_debounce = 0;
    rt.clear_debounce = 0;
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    /// heightUnits=120, high=100, low=12, hysteresis=2:
    /// highClear=98, lowClear=14.
    fn vessel() -> VesselConfig {
        VesselConfig {
            height_units: 120.0,
            high_alarm: 100.0,
            low_alarm: 12.0,
            hysteresis: 2.0,
            ..VesselConfig::default()
        }
    }

    fn feed(rt: &mut VesselRuntime, levels: &[f64]) -> Vec<EventCategory> {
        let v = vessel();
        levels.iter().filter_map(|&l| evaluate(&v, rt, l)).collect()
    }

    #[test]
    fn latches_high_on_third_consecutive_sample() {
        let mut rt = VesselRuntime::new();
        // 99 does not count; 101, 101, 101 latches on the third
        let events = feed(&mut rt, &[99.0, 101.0, 101.0]);
        assert!(events.is_empty());
        let events = feed(&mut rt, &[101.0]);
        assert_eq!(events, vec![EventCategory::High]);
        assert!(rt.high_latched);
    }

    #[test]
    fn clears_on_third_sample_in_dead_band() {
        let mut rt = VesselRuntime::new();
        feed(&mut rt, &[101.0, 101.0, 101.0]);
        assert!(rt.high_latched);

        let events = feed(&mut rt, &[85.0, 85.0]);
        assert!(events.is_empty());
        assert!(rt.high_latched);
        let events = feed(&mut rt, &[85.0]);
        assert_eq!(events, vec![EventCategory::Clear]);
        assert!(!rt.high_latched);
    }

    #[test]
    fn debounce_counter_resets_on_interruption() {
        let mut rt = VesselRuntime::new();
        // 2 qualifying, 1 disqualifying, 2 more qualifying: never latches
        let events = feed(&mut rt, &[101.0, 101.0, 95.0, 101.0, 101.0]);
        assert!(events.is_empty());
        assert!(!rt.high_latched);
        assert_eq!(rt.high_debounce, 2);
    }

    #[test]
    fn oscillation_between_clear_and_trigger_never_chatters() {
        let mut rt = VesselRuntime::new();
        // Bounces between highClear (98) and just under trigger: no alarm
        let seq = [99.0, 98.5, 99.5, 98.2, 99.9, 98.0, 99.0, 99.9, 98.1];
        let events = feed(&mut rt, &seq);
        assert!(events.is_empty());
        assert!(!rt.high_latched);
    }

    #[test]
    fn low_alarm_latches_and_clears() {
        let mut rt = VesselRuntime::new();
        let events = feed(&mut rt, &[10.0, 11.0, 12.0]);
        assert_eq!(events, vec![EventCategory::Low]);
        assert!(rt.low_latched);

        // 13.0 is not in the dead band (lowClear = 14), no clear progress
        let events = feed(&mut rt, &[13.0, 13.0, 13.0]);
        assert!(events.is_empty());
        assert!(rt.low_latched);

        let events = feed(&mut rt, &[20.0, 20.0, 20.0]);
        assert_eq!(events, vec![EventCategory::Clear]);
        assert!(!rt.low_latched);
    }

    #[test]
    fn level_at_clear_threshold_does_not_clear() {
        let mut rt = VesselRuntime::new();
        feed(&mut rt, &[101.0, 101.0, 101.0]);
        // Exactly highClear (98) is outside the strict dead band
        let events = feed(&mut rt, &[98.0, 98.0, 98.0, 98.0]);
        assert!(events.is_empty());
        assert!(rt.high_latched);
    }

    #[test]
    fn latched_side_does_not_re_trigger() {
        let mut rt = VesselRuntime::new();
        feed(&mut rt, &[101.0, 101.0, 101.0]);
        // Still above trigger: no second High event while latched
        let events = feed(&mut rt, &[105.0, 110.0, 115.0, 110.0]);
        assert!(events.is_empty());
    }

    #[test]
    fn step_change_from_low_latch_to_high_supersedes() {
        let mut rt = VesselRuntime::new();
        feed(&mut rt, &[5.0, 5.0, 5.0]);
        assert!(rt.low_latched);
        let events = feed(&mut rt, &[110.0, 110.0, 110.0]);
        assert_eq!(events, vec![EventCategory::High]);
        assert!(rt.high_latched);
        assert!(!rt.low_latched);
    }
}
