//! Outbound message composition.
//!
//! Builds the telemetry / alarm / daily-summary payloads the base station
//! consumes. Routing targets are opaque notefile tags resolved by the
//! transport module; the names match the deployed server's inbound queues.

use crate::config::{DeviceConfig, VesselConfig};
use crate::conversion::percent_full;
use crate::types::{EventCategory, VesselRuntime};
use serde::{Deserialize, Serialize};

/// Notefile targets (inbound queues on the base station).
pub const TELEMETRY_FILE: &str = "telemetry.qi";
pub const ALARM_FILE: &str = "alarm.qi";
pub const DAILY_FILE: &str = "daily.qi";

// ============================================================================
// Composed Message
// ============================================================================

/// A routed, serialized outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedMessage {
    /// Routing tag for the transport module.
    pub target: &'static str,
    /// Compact JSON payload (single line; the outbox is line-oriented).
    pub payload: String,
    /// Whether immediate transport sync was requested at composition time.
    /// Alarms want the radio now; periodic telemetry can ride the next
    /// scheduled sync.
    pub sync: bool,
}

// ============================================================================
// Payload Shapes
// ============================================================================

/// One vessel's current state, embedded in every payload kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VesselSnapshot {
    pub vessel: String,
    pub level: f64,
    pub percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryPayload {
    pub device: String,
    pub site: String,
    #[serde(flatten)]
    pub snapshot: VesselSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epoch: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlarmPayload {
    pub device: String,
    pub site: String,
    #[serde(flatten)]
    pub snapshot: VesselSnapshot,
    /// Reason code: high / low / clear / sensor-fault / sensor-stuck /
    /// sensor-recovered.
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epoch: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyPayload {
    pub device: String,
    pub site: String,
    pub vessels: Vec<VesselSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epoch: Option<u64>,
}

// ============================================================================
// Composer
// ============================================================================

/// Builds outbound messages from current vessel state.
#[derive(Debug, Clone)]
pub struct Composer {
    device_id: String,
    site: String,
}

impl Composer {
    pub fn new(config: &DeviceConfig) -> Self {
        Self {
            device_id: config.device.id.clone(),
            site: config.device.site.clone(),
        }
    }

    fn snapshot(vessel: &VesselConfig, rt: &VesselRuntime) -> VesselSnapshot {
        VesselSnapshot {
            vessel: vessel.id.clone(),
            level: round2(rt.current_level),
            percent: round2(percent_full(rt.current_level, vessel.height_units)),
        }
    }

    /// Periodic telemetry sample. Not sync-flagged; it rides the next
    /// scheduled radio session.
    pub fn telemetry(
        &self,
        vessel: &VesselConfig,
        rt: &VesselRuntime,
        epoch: Option<u64>,
    ) -> ComposedMessage {
        let payload = TelemetryPayload {
            device: self.device_id.clone(),
            site: self.site.clone(),
            snapshot: Self::snapshot(vessel, rt),
            epoch,
        };
        ComposedMessage {
            target: TELEMETRY_FILE,
            payload: to_line(&payload),
            sync: false,
        }
    }

    /// Alarm-class event. Sync-flagged: the operator should hear about it
    /// before the next scheduled session.
    pub fn alarm(
        &self,
        vessel: &VesselConfig,
        rt: &VesselRuntime,
        category: EventCategory,
        epoch: Option<u64>,
    ) -> ComposedMessage {
        let payload = AlarmPayload {
            device: self.device_id.clone(),
            site: self.site.clone(),
            snapshot: Self::snapshot(vessel, rt),
            reason: category.as_str().to_string(),
            epoch,
        };
        ComposedMessage {
            target: ALARM_FILE,
            payload: to_line(&payload),
            sync: true,
        }
    }

    /// Daily summary across the vessels that have daily reporting enabled.
    pub fn daily(
        &self,
        vessels: &[(&VesselConfig, &VesselRuntime)],
        epoch: Option<u64>,
    ) -> ComposedMessage {
        let payload = DailyPayload {
            device: self.device_id.clone(),
            site: self.site.clone(),
            vessels: vessels
                .iter()
                .map(|(cfg, rt)| Self::snapshot(cfg, rt))
                .collect(),
            epoch,
        };
        ComposedMessage {
            target: DAILY_FILE,
            payload: to_line(&payload),
            sync: false,
        }
    }
}

/// Serialize compactly. Payload structs contain no values that can fail to
/// serialize, so fall back to an empty object rather than propagating.
fn to_line<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
}

fn round2(val: f64) -> f64 {
    (val * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeviceConfig;

    fn setup() -> (DeviceConfig, VesselRuntime) {
        let config = DeviceConfig::default();
        let mut rt = VesselRuntime::new();
        rt.current_level = 60.0;
        (config, rt)
    }

    #[test]
    fn telemetry_payload_fields() {
        let (config, rt) = setup();
        let composer = Composer::new(&config);
        let msg = composer.telemetry(&config.vessels[0], &rt, Some(1_700_000_000));
        assert_eq!(msg.target, TELEMETRY_FILE);
        assert!(!msg.sync);

        let parsed: TelemetryPayload = serde_json::from_str(&msg.payload).unwrap();
        assert_eq!(parsed.snapshot.vessel, "A");
        assert_eq!(parsed.snapshot.level, 60.0);
        assert_eq!(parsed.snapshot.percent, 50.0);
        assert_eq!(parsed.epoch, Some(1_700_000_000));
    }

    #[test]
    fn alarm_payload_is_sync_flagged() {
        let (config, rt) = setup();
        let composer = Composer::new(&config);
        let msg = composer.alarm(&config.vessels[0], &rt, EventCategory::High, None);
        assert_eq!(msg.target, ALARM_FILE);
        assert!(msg.sync);

        let parsed: AlarmPayload = serde_json::from_str(&msg.payload).unwrap();
        assert_eq!(parsed.reason, "high");
        // Unknown epoch is omitted entirely, not sent as null
        assert!(!msg.payload.contains("epoch"));
    }

    #[test]
    fn daily_payload_covers_multiple_vessels() {
        let (config, rt) = setup();
        let composer = Composer::new(&config);
        let rt2 = VesselRuntime::new();
        let vessel2 = VesselConfig {
            id: "B".to_string(),
            ..config.vessels[0].clone()
        };
        let msg = composer.daily(
            &[(&config.vessels[0], &rt), (&vessel2, &rt2)],
            Some(1_700_000_000),
        );
        assert_eq!(msg.target, DAILY_FILE);
        let parsed: DailyPayload = serde_json::from_str(&msg.payload).unwrap();
        assert_eq!(parsed.vessels.len(), 2);
        assert_eq!(parsed.vessels[1].vessel, "B");
    }

    #[test]
    fn payload_is_single_line() {
        let (config, rt) = setup();
        let composer = Composer::new(&config);
        let msg = composer.telemetry(&config.vessels[0], &rt, None);
        assert!(!msg.payload.contains('\n'));
    }
}
