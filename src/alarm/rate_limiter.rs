//! Per-vessel notification rate limiting.
//!
//! Two gates in front of every outbound alarm-class send:
//! - a per-category cooldown (two `high` events 30 s apart are chatter), and
//! - a rolling hourly cap across all categories for the vessel.
//!
//! Recovery-flavored events (`clear`, `sensor-recovered`) are exempt from
//! the hourly cap so a flapping sensor that burns the quota can still
//! deliver its final "things are fine now" signal; they remain subject to
//! the cooldown so the flapping itself cannot chatter.

use crate::config::defaults::{ALARM_COOLDOWN_SECS, ALARM_WINDOW_SECS, MAX_ALARMS_PER_HOUR};
use crate::types::{EventCategory, SendWindow};
use std::collections::HashMap;
use tracing::debug;

/// Rate limiter for one vessel's outbound events.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    cooldown_secs: u64,
    hourly_cap: usize,
    /// Last allowed send per category.
    last_sent: HashMap<EventCategory, u64>,
    /// Rolling window of cap-counted sends (recovery events excluded).
    window: SendWindow,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::with_limits(ALARM_COOLDOWN_SECS, MAX_ALARMS_PER_HOUR)
    }

    pub fn with_limits(cooldown_secs: u64, hourly_cap: usize) -> Self {
        Self {
            cooldown_secs,
            hourly_cap,
            last_sent: HashMap::new(),
            window: SendWindow::default(),
        }
    }

    /// Check whether an event of this category may be sent at `now`
    /// (seconds, monotonic). On `true` the attempt is recorded.
    pub fn allow(&mut self, category: EventCategory, now: u64) -> bool {
        if let Some(&last) = self.last_sent.get(&category) {
            if now.saturating_sub(last) < self.cooldown_secs {
                debug!(%category, since = now.saturating_sub(last), "Suppressed by cooldown");
                return false;
            }
        }

        self.window.prune(now, ALARM_WINDOW_SECS);
        if !category.is_recovery() && self.window.len() >= self.hourly_cap {
            debug!(%category, cap = self.hourly_cap, "Suppressed by hourly cap");
            return false;
        }

        self.last_sent.insert(category, now);
        if !category.is_recovery() {
            self.window.record(now);
        }
        true
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_first_event() {
        let mut limiter = RateLimiter::new();
        assert!(limiter.allow(EventCategory::High, 1000));
    }

    #[test]
    fn same_category_suppressed_within_cooldown() {
        let mut limiter = RateLimiter::new();
        assert!(limiter.allow(EventCategory::High, 1000));
        assert!(!limiter.allow(EventCategory::High, 1000 + ALARM_COOLDOWN_SECS - 1));
        assert!(limiter.allow(EventCategory::High, 1000 + ALARM_COOLDOWN_SECS));
    }

    #[test]
    fn different_category_unaffected_by_cooldown() {
        let mut limiter = RateLimiter::new();
        assert!(limiter.allow(EventCategory::High, 1000));
        assert!(limiter.allow(EventCategory::Low, 1001));
    }

    #[test]
    fn hourly_cap_suppresses_then_ages_out() {
        let mut limiter = RateLimiter::with_limits(0, MAX_ALARMS_PER_HOUR);
        let mut sent = 0;
        for i in 0..20u64 {
            if limiter.allow(EventCategory::High, 1000 + i) {
                sent += 1;
            }
        }
        assert_eq!(sent, MAX_ALARMS_PER_HOUR);

        // Still capped shortly after
        assert!(!limiter.allow(EventCategory::High, 2000));

        // Oldest timestamp (1000) ages out of the 3600 s window
        assert!(limiter.allow(EventCategory::High, 1000 + ALARM_WINDOW_SECS));
    }

    #[test]
    fn recovery_events_bypass_hourly_cap() {
        let mut limiter = RateLimiter::with_limits(0, MAX_ALARMS_PER_HOUR);
        for i in 0..MAX_ALARMS_PER_HOUR as u64 {
            assert!(limiter.allow(EventCategory::High, 1000 + i));
        }
        assert!(!limiter.allow(EventCategory::High, 1100));
        // The final "all clear" still gets through
        assert!(limiter.allow(EventCategory::Clear, 1100));
        assert!(limiter.allow(EventCategory::SensorRecovered, 1101));
    }

    #[test]
    fn recovery_events_still_respect_cooldown() {
        let mut limiter = RateLimiter::new();
        assert!(limiter.allow(EventCategory::Clear, 1000));
        assert!(!limiter.allow(EventCategory::Clear, 1010));
        assert!(limiter.allow(EventCategory::Clear, 1000 + ALARM_COOLDOWN_SECS));
    }

    #[test]
    fn recovery_events_do_not_consume_quota() {
        let mut limiter = RateLimiter::with_limits(0, 2);
        assert!(limiter.allow(EventCategory::Clear, 1000));
        assert!(limiter.allow(EventCategory::High, 1001));
        assert!(limiter.allow(EventCategory::Low, 1002));
        // Quota of 2 consumed by High + Low only
        assert!(!limiter.allow(EventCategory::SensorFault, 1003));
    }
}
