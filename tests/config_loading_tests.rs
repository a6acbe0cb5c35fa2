//! Config Loading Tests
//!
//! Exercises the TOML config layer end to end: file loading, defaults for
//! omitted fields, parse/IO errors, and the validation gate at scheduler
//! construction.

use std::io::Write;

use tankalarm::config::{validate, ConfigError, DeviceConfig, VesselConfig};
use tankalarm::outbox::Outbox;
use tankalarm::scheduler::Scheduler;
use tankalarm::transport::{LogIndicator, LogTransport, SystemTimeSource};
use tankalarm::types::SensorClass;
use tankalarm::SimulatedBus;

fn write_config(dir: &tempfile::TempDir, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join("tankalarm.toml");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    path
}

// ============================================================================
// File Loading
// ============================================================================

#[test]
fn full_config_loads_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        &dir,
        r#"
sample_interval_secs = 900
report_hour = 6
report_minute = 30

[device]
id = "tankalarm-07"
site = "North Yard"

[[vessels]]
id = "T1"
sensor = "current_loop"
channel = 0
height_units = 96.0
high_alarm = 80.0
low_alarm = 10.0
hysteresis = 3.0

[[vessels]]
id = "T2"
sensor = "digital"
channel = 5
digital_active_high = false
daily_report = false
"#,
    );

    let config = DeviceConfig::load_from_file(&path).unwrap();
    assert_eq!(config.device.id, "tankalarm-07");
    assert_eq!(config.sample_interval_secs, 900);
    assert_eq!(config.report_hour, 6);
    assert_eq!(config.report_minute, 30);
    assert_eq!(config.vessels.len(), 2);

    let t1 = config.vessel("T1").unwrap();
    assert_eq!(t1.sensor, SensorClass::CurrentLoop);
    assert_eq!(t1.height_units, 96.0);
    assert_eq!(t1.high_clear(), 77.0);

    let t2 = config.vessel("T2").unwrap();
    assert_eq!(t2.sensor, SensorClass::Digital);
    assert!(!t2.digital_active_high);
    assert!(!t2.daily_report);
    // Omitted fields fall back to the firmware defaults
    assert_eq!(t2.high_alarm, 100.0);
    assert_eq!(t2.low_alarm, 12.0);

    assert!(validate(&config).is_valid());
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = DeviceConfig::load_from_file(&dir.path().join("nope.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

#[test]
fn malformed_toml_is_a_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "sample_interval_secs = \"not a number\"");
    let err = DeviceConfig::load_from_file(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn unknown_sensor_class_is_a_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        &dir,
        r#"
[[vessels]]
id = "T1"
sensor = "ultrasonic"
"#,
    );
    let err = DeviceConfig::load_from_file(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

// ============================================================================
// Validation Gate
// ============================================================================

#[test]
fn scheduler_refuses_invalid_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = DeviceConfig {
        vessels: vec![VesselConfig {
            // Bands overlap once hysteresis is applied
            high_alarm: 20.0,
            low_alarm: 18.0,
            ..VesselConfig::default()
        }],
        ..DeviceConfig::default()
    };
    assert!(!validate(&config).is_valid());

    let outbox = Outbox::open(dir.path().join("outbox.dat")).unwrap();
    let result = Scheduler::new(
        config,
        outbox,
        SimulatedBus::new(1),
        LogTransport::new(),
        LogIndicator,
        SystemTimeSource,
    );
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

#[test]
fn duplicate_vessel_ids_rejected_at_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        &dir,
        r#"
[[vessels]]
id = "T1"

[[vessels]]
id = "T1"
"#,
    );
    let config = DeviceConfig::load_from_file(&path).unwrap();
    let report = validate(&config);
    assert!(!report.is_valid());
    assert!(report.errors.iter().any(|e| e.contains("duplicate")));
}
