//! Simulated sensor bus for the `--simulate` mode and tests.
//!
//! Models a slowly draining/filling tank per channel with gaussian-ish
//! electrical noise, plus injectable fault modes (bus errors, stuck output,
//! out-of-range wiring faults) so the full fault pipeline can be exercised
//! without hardware.

use super::{ReadError, SensorBus};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

/// Behavior override for a simulated channel.
#[derive(Debug, Clone, Copy, PartialEq)]
enum ChannelMode {
    /// Normal drift + noise.
    Normal,
    /// Every read fails at the bus level.
    BusError,
    /// Output frozen at the current value (failed diaphragm).
    Stuck,
    /// Reads a fixed raw value (e.g. 0.0 for a cut 4-20 mA loop).
    Fixed(f64),
}

struct Channel {
    /// Current raw output in electrical units.
    value: f64,
    /// Raw units drifted per read.
    drift_per_read: f64,
    /// Peak noise amplitude in raw units.
    noise: f64,
    mode: ChannelMode,
    min: f64,
    max: f64,
}

/// Deterministic (seeded) simulated bus.
pub struct SimulatedBus {
    channels: HashMap<u16, Channel>,
    rng: StdRng,
}

impl SimulatedBus {
    pub fn new(seed: u64) -> Self {
        Self {
            channels: HashMap::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Add a channel starting at `value` raw units, wandering by
    /// `drift_per_read` with `noise` amplitude, clamped to `[min, max]`.
    pub fn add_channel(&mut self, channel: u16, value: f64, drift_per_read: f64, noise: f64, min: f64, max: f64) {
        self.channels.insert(
            channel,
            Channel {
                value,
                drift_per_read,
                noise,
                mode: ChannelMode::Normal,
                min,
                max,
            },
        );
    }

    /// Convenience: a 4-20 mA channel starting at `percent` full.
    pub fn add_current_loop(&mut self, channel: u16, percent: f64, drift_per_read: f64) {
        let value = 4.0 + percent.clamp(0.0, 100.0) / 100.0 * 16.0;
        self.add_channel(channel, value, drift_per_read, 0.03, 4.0, 20.0);
    }

    pub fn set_value(&mut self, channel: u16, value: f64) {
        if let Some(ch) = self.channels.get_mut(&channel) {
            ch.value = value;
        }
    }

    pub fn fail_channel(&mut self, channel: u16) {
        self.set_mode(channel, ChannelMode::BusError);
    }

    pub fn stick_channel(&mut self, channel: u16) {
        self.set_mode(channel, ChannelMode::Stuck);
    }

    /// Simulate a wiring fault that pins the raw output (0.0 = cut loop).
    pub fn pin_channel(&mut self, channel: u16, raw: f64) {
        self.set_mode(channel, ChannelMode::Fixed(raw));
    }

    pub fn restore_channel(&mut self, channel: u16) {
        self.set_mode(channel, ChannelMode::Normal);
    }

    fn set_mode(&mut self, channel: u16, mode: ChannelMode) {
        if let Some(ch) = self.channels.get_mut(&channel) {
            ch.mode = mode;
        }
    }
}

impl SensorBus for SimulatedBus {
    fn read_channel(&mut self, channel: u16) -> Result<f64, ReadError> {
        let ch = self
            .channels
            .get_mut(&channel)
            .ok_or(ReadError::MissingChannel(channel))?;

        match ch.mode {
            ChannelMode::BusError => Err(ReadError::Bus {
                channel,
                detail: "simulated I2C NACK".to_string(),
            }),
            ChannelMode::Stuck => Ok(ch.value),
            ChannelMode::Fixed(raw) => Ok(raw),
            ChannelMode::Normal => {
                ch.value = (ch.value + ch.drift_per_read).clamp(ch.min, ch.max);
                let jitter = self.rng.gen_range(-ch.noise..=ch.noise);
                Ok((ch.value + jitter).clamp(ch.min, ch.max))
            }
        }
    }
}
