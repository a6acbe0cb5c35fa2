//! Sensor acquisition: the bus boundary and the per-vessel reader.
//!
//! The hardware abstraction is a blocking [`SensorBus`] returning one raw
//! numeric sample per call, bounded to tens of milliseconds by contract;
//! the scheduler is cooperative and a hung read would stall every other
//! vessel. Everything above the bus (averaging, conversion, fault logic)
//! is hardware-independent and unit-testable.

mod sim;

pub use sim::SimulatedBus;

use crate::config::defaults::ANALOG_SAMPLE_COUNT;
use crate::config::VesselConfig;
use thiserror::Error;

// ============================================================================
// Errors
// ============================================================================

/// A failed raw sample acquisition. The fault detector treats any of these
/// identically to an out-of-range value; no fabricated zero is ever returned.
#[derive(Debug, Clone, Error)]
pub enum ReadError {
    #[error("bus error on channel {channel}: {detail}")]
    Bus { channel: u16, detail: String },

    #[error("no sensor present on channel {0}")]
    MissingChannel(u16),

    #[error("read timed out on channel {0}")]
    Timeout(u16),
}

// ============================================================================
// Sensor Bus
// ============================================================================

/// Blocking hardware sample source (GPIO / ADC / I2C behind one seam).
///
/// Implementations must return within a small fixed bound per call.
pub trait SensorBus {
    /// Acquire one raw sample from a physical input. Units are whatever the
    /// sensor class natively produces (volts, milliamps, or 0/1).
    fn read_channel(&mut self, channel: u16) -> Result<f64, ReadError>;
}

// ============================================================================
// Sensor Reader
// ============================================================================

/// Per-vessel raw sample acquisition with noise averaging.
#[derive(Debug, Clone)]
pub struct SensorReader {
    /// Samples averaged per analog read. Tunable constant, not config.
    sample_count: u32,
}

impl SensorReader {
    pub fn new() -> Self {
        Self {
            sample_count: ANALOG_SAMPLE_COUNT,
        }
    }

    #[cfg(test)]
    pub fn with_sample_count(sample_count: u32) -> Self {
        Self { sample_count }
    }

    /// Read one raw sample for a vessel.
    ///
    /// Digital inputs are read once (the line is already debounced at the
    /// electrical level); analog classes are read `sample_count` times and
    /// averaged to knock down quantization and electrical noise. A bus
    /// error on any sub-sample fails the whole read.
    pub fn read(&self, bus: &mut dyn SensorBus, vessel: &VesselConfig) -> Result<f64, ReadError> {
        if !vessel.sensor.expects_variation() {
            return bus.read_channel(vessel.channel);
        }

        let mut sum = 0.0;
        for _ in 0..self.sample_count {
            sum += bus.read_channel(vessel.channel)?;
        }
        Ok(sum / f64::from(self.sample_count))
    }
}

impl Default for SensorReader {
    fn default() -> Self {
        Self::new()
    }
}
