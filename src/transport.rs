//! Transport boundary and link health tracking.
//!
//! The cellular radio lives behind the [`Transport`] trait: an opaque
//! routed send plus a cheap liveness probe. This core never sees the wire
//! envelope. The health monitor turns consecutive send failures into an
//! available/unavailable flag and paces reconnect probes; queue replay on
//! recovery is wired up in the scheduler.

use crate::config::defaults::{TRANSPORT_FAILURE_THRESHOLD, TRANSPORT_RETRY_SECS};
use tracing::{info, warn};

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("send failed: {0}")]
    SendFailed(String),
    #[error("transport timeout")]
    Timeout,
    #[error("radio not ready: {0}")]
    NotReady(String),
}

// ============================================================================
// Collaborator Traits
// ============================================================================

/// Outbound radio boundary. A timeout inside the transport module surfaces
/// as an `Err` here and is treated like any other failure.
pub trait Transport {
    /// Send one routed payload. `sync` requests an immediate radio session
    /// rather than waiting for the next scheduled one.
    fn send(&mut self, target: &str, payload: &str, sync: bool) -> Result<(), TransportError>;

    /// Cheap link liveness check, used while the transport is unavailable.
    fn probe(&mut self) -> bool;
}

/// Local alarm indicator (relay / LED). Must keep working, or degrade
/// silently, regardless of transport availability.
pub trait Indicator {
    fn set_indicator(&mut self, vessel_id: &str, active: bool);
}

/// Wall-clock source. Returns `None` until the first successful time sync;
/// daily-report scheduling is undefined until then.
pub trait TimeSource {
    fn now_epoch(&mut self) -> Option<u64>;

    /// Request a wall-clock re-synchronization. Default no-op for sources
    /// that are always synced (host OS clock).
    fn resync(&mut self) {}
}

// ============================================================================
// Health Monitor
// ============================================================================

/// Availability transition produced by a send/probe outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthTransition {
    BecameAvailable,
    BecameUnavailable,
}

/// Tracks consecutive transport failures and paces reconnect probes.
#[derive(Debug, Clone)]
pub struct TransportHealth {
    available: bool,
    consecutive_failures: u32,
    failure_threshold: u32,
    retry_secs: u64,
    last_probe: Option<u64>,
}

impl TransportHealth {
    pub fn new() -> Self {
        Self {
            available: true,
            consecutive_failures: 0,
            failure_threshold: TRANSPORT_FAILURE_THRESHOLD,
            retry_secs: TRANSPORT_RETRY_SECS,
            last_probe: None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    /// Record a successful send or probe.
    pub fn record_success(&mut self) -> Option<HealthTransition> {
        self.consecutive_failures = 0;
        if !self.available {
            self.available = true;
            info!("Transport recovered");
            return Some(HealthTransition::BecameAvailable);
        }
        None
    }

    /// Record a failed send or probe.
    pub fn record_failure(&mut self) -> Option<HealthTransition> {
        self.consecutive_failures += 1;
        if self.available && self.consecutive_failures >= self.failure_threshold {
            self.available = false;
            warn!(
                failures = self.consecutive_failures,
                "Transport unavailable; buffering outbound messages"
            );
            return Some(HealthTransition::BecameUnavailable);
        }
        None
    }

    /// Whether a reconnect probe is due at `now` (seconds, monotonic).
    /// Fixed retry interval, not busy-polled.
    pub fn probe_due(&self, now: u64) -> bool {
        if self.available {
            return false;
        }
        match self.last_probe {
            None => true,
            Some(last) => now.saturating_sub(last) >= self.retry_secs,
        }
    }

    pub fn mark_probed(&mut self, now: u64) {
        self.last_probe = Some(now);
    }
}

impl Default for TransportHealth {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Simple Implementations (binary / simulation)
// ============================================================================

/// Transport that logs sends instead of touching a radio. Always succeeds
/// unless told to fail; used by `--simulate` and tests.
pub struct LogTransport {
    pub fail: bool,
}

impl LogTransport {
    pub fn new() -> Self {
        Self { fail: false }
    }
}

impl Default for LogTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for LogTransport {
    fn send(&mut self, target: &str, payload: &str, sync: bool) -> Result<(), TransportError> {
        if self.fail {
            return Err(TransportError::SendFailed("simulated outage".to_string()));
        }
        info!(target, sync, %payload, "Transport send");
        Ok(())
    }

    fn probe(&mut self) -> bool {
        !self.fail
    }
}

/// Indicator that logs relay transitions.
pub struct LogIndicator;

impl Indicator for LogIndicator {
    fn set_indicator(&mut self, vessel_id: &str, active: bool) {
        info!(vessel = vessel_id, active, "Local indicator");
    }
}

/// Wall clock backed by the OS; always synced, for host deployments.
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now_epoch(&mut self) -> Option<u64> {
        u64::try_from(chrono::Utc::now().timestamp()).ok()
    }
}
