//! Named pipeline constants with their rationale.
//!
//! These were magic numbers scattered through earlier firmware revisions.
//! They are compile-time constants rather than config fields: field tuning
//! happens through `DeviceConfig`, these set the anti-chatter and memory
//! behavior of the pipeline itself.

/// Consecutive qualifying samples required to latch or clear an alarm.
/// Filters single-sample spikes from electrical noise without adding more
/// than two sample intervals of alarm latency.
pub const ALARM_DEBOUNCE_COUNT: u32 = 3;

/// Consecutive bad samples (read failure or out-of-range) before the sensor
/// is declared failed.
pub const SENSOR_FAILURE_THRESHOLD: u32 = 5;

/// Consecutive near-identical analog samples before the sensor is declared
/// stuck. Liquid levels always wander a little; a flat line this long means
/// a frozen ADC or a disconnected diaphragm.
pub const STUCK_READING_THRESHOLD: u32 = 10;

/// Two analog samples closer than this (in level units) count as identical
/// for stuck detection.
pub const STUCK_DELTA_UNITS: f64 = 0.05;

/// Valid-reading band as fractions of `height_units`. Deliberately generous
/// so calibration drift does not fault a working sensor, while a
/// disconnected 4-20 mA loop (reads 0 mA, maps far negative) still trips.
pub const VALID_RANGE_LOW_FRACTION: f64 = -0.10;
pub const VALID_RANGE_HIGH_FRACTION: f64 = 1.10;

/// Minimum interval between two sends of the same event category.
pub const ALARM_COOLDOWN_SECS: u64 = 300;

/// Rolling hourly cap on alarm-class sends per vessel, all categories
/// combined. Caps the SMS bill when a sensor goes haywire.
pub const MAX_ALARMS_PER_HOUR: usize = 10;

/// Window for the hourly cap.
pub const ALARM_WINDOW_SECS: u64 = 3600;

/// Consecutive transport failures before the link is declared unavailable.
pub const TRANSPORT_FAILURE_THRESHOLD: u32 = 5;

/// Reconnect probe interval while the transport is unavailable.
pub const TRANSPORT_RETRY_SECS: u64 = 60;

/// Outbox byte budget and the headroom left free after a prune, so pruning
/// does not run on every enqueue once the budget is reached.
pub const OUTBOX_MAX_BYTES: u64 = 16 * 1024;
pub const OUTBOX_PRUNE_HEADROOM: u64 = 2 * 1024;

/// Samples averaged per analog read to knock down quantization noise.
pub const ANALOG_SAMPLE_COUNT: u32 = 8;

/// Inbound config poll interval. Fixed short so remote reconfiguration
/// stays responsive; the poll itself is cheap.
pub const CONFIG_CHECK_SECS: u64 = 15;

/// Wall-clock re-sync interval (matches the 6 h cadence of the original
/// firmware's time sync).
pub const TIME_SYNC_SECS: u64 = 6 * 3600;

/// Default sampling interval when the config does not set one (30 minutes).
pub const DEFAULT_SAMPLE_INTERVAL_SECS: u64 = 1800;

/// Default daily report time, local: 05:00.
pub const DEFAULT_REPORT_HOUR: u8 = 5;
pub const DEFAULT_REPORT_MINUTE: u8 = 0;

/// Electrical span too small to map onto the tank height; the converter
/// returns the low bound instead of dividing by (near-)zero.
pub const RANGE_EPSILON: f64 = 1e-6;
