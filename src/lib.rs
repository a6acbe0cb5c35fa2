//! TankAlarm client core: field-unit sensing, alarming, and telemetry.
//!
//! Battery/solar-powered field units sample liquid-level sensors, detect
//! alarm conditions, and relay telemetry over a cellular radio to a base
//! station. This crate is the client-side pipeline:
//!
//! - **Acquisition**: raw samples from digital float, analog voltage, and
//!   4-20 mA current-loop sensors, averaged and converted to levels
//! - **Fault detection**: out-of-range streaks and stuck sensors suspend
//!   alarm evaluation instead of guessing
//! - **Alarming**: debounced, hysteretic high/low latching with per-vessel
//!   rate limiting on outbound notifications
//! - **Store-and-forward**: a durable bounded outbox that buffers messages
//!   through radio outages and replays them in order on recovery
//! - **Scheduling**: one cooperative loop, no RTOS and no threads

pub mod acquisition;
pub mod alarm;
pub mod config;
pub mod conversion;
pub mod fault;
pub mod outbox;
pub mod scheduler;
pub mod telemetry;
pub mod transport;
pub mod types;

// Re-export configuration
pub use config::{DeviceConfig, VesselConfig};

// Re-export commonly used types
pub use types::{EventCategory, SensorClass, SensorHealth, VesselRuntime};

// Re-export the pipeline surface
pub use acquisition::{ReadError, SensorBus, SensorReader, SimulatedBus};
pub use alarm::RateLimiter;
pub use outbox::{Outbox, OutboxError, QueuedMessage};
pub use scheduler::{ConfigSource, NoConfigSource, Scheduler, SchedulerStats};
pub use telemetry::{ComposedMessage, Composer};
pub use transport::{
    Indicator, TimeSource, Transport, TransportError, TransportHealth,
};
