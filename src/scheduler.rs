//! Cooperative single-threaded scheduler.
//!
//! One physical thread of control, no preemption: every `tick()` compares
//! the current time against per-task due times and dispatches whatever is
//! due. The only operations with non-trivial wall-clock cost are sensor bus
//! transactions (bounded by the bus contract) and transport sends (bounded
//! by the transport's own timeout), so every iteration is bounded.
//!
//! Per-vessel ordering inside a sampling pass is fixed: read → fault
//! detection → alarm evaluation → rate limiting → composition → dispatch.
//! Fault detection always precedes alarm evaluation, so an alarm is never
//! raised or cleared on data from a failed sensor.

use crate::acquisition::{SensorBus, SensorReader};
use crate::alarm::{self, RateLimiter};
use crate::config::defaults::{CONFIG_CHECK_SECS, TIME_SYNC_SECS};
use crate::config::{validate, ConfigError, DeviceConfig};
use crate::fault;
use crate::outbox::{Outbox, OutboxError, QueuedMessage};
use crate::telemetry::{ComposedMessage, Composer};
use crate::transport::{
    HealthTransition, Indicator, TimeSource, Transport, TransportHealth,
};
use crate::types::VesselRuntime;
use tracing::{debug, info, warn};

// ============================================================================
// Per-Vessel Slot
// ============================================================================

/// Runtime state paired with each configured vessel, index-aligned with
/// `DeviceConfig::vessels`.
#[derive(Debug, Clone)]
struct VesselSlot {
    rt: VesselRuntime,
    limiter: RateLimiter,
}

impl VesselSlot {
    fn new() -> Self {
        Self {
            rt: VesselRuntime::new(),
            limiter: RateLimiter::new(),
        }
    }
}

// ============================================================================
// Config Source
// ============================================================================

/// Inbound remote-reconfiguration channel. An external poller parses the
/// wire format; this core only sees complete `DeviceConfig` values.
pub trait ConfigSource {
    /// Return a newly delivered config, if one arrived since the last poll.
    fn poll(&mut self) -> Option<DeviceConfig>;
}

/// No remote reconfiguration (static config deployments, simulation).
pub struct NoConfigSource;

impl ConfigSource for NoConfigSource {
    fn poll(&mut self) -> Option<DeviceConfig> {
        None
    }
}

// ============================================================================
// Stats
// ============================================================================

/// Counters for logging and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchedulerStats {
    pub sampling_passes: u64,
    pub events_sent: u64,
    pub events_suppressed: u64,
    pub telemetry_sent: u64,
    pub telemetry_skipped: u64,
    pub messages_queued: u64,
    pub daily_reports: u64,
    pub configs_applied: u64,
    pub configs_rejected: u64,
}

// ============================================================================
// Scheduler
// ============================================================================

/// Owns the whole client pipeline and all per-vessel state.
pub struct Scheduler<B, T, I, C>
where
    B: SensorBus,
    T: Transport,
    I: Indicator,
    C: TimeSource,
{
    config: DeviceConfig,
    slots: Vec<VesselSlot>,
    reader: SensorReader,
    composer: Composer,
    outbox: Outbox,
    health: TransportHealth,

    bus: B,
    transport: T,
    indicator: I,
    time: C,
    config_source: Box<dyn ConfigSource>,

    // Due-time bookkeeping (seconds, monotonic)
    last_sample: Option<u64>,
    last_config_check: Option<u64>,
    last_time_sync: Option<u64>,
    /// Next daily report, wall-clock epoch. `None` until time is synced;
    /// there is no tick-counter fallback.
    next_daily_epoch: Option<u64>,

    stats: SchedulerStats,
}

impl<B, T, I, C> Scheduler<B, T, I, C>
where
    B: SensorBus,
    T: Transport,
    I: Indicator,
    C: TimeSource,
{
    pub fn new(
        config: DeviceConfig,
        outbox: Outbox,
        bus: B,
        transport: T,
        indicator: I,
        time: C,
    ) -> Result<Self, ConfigError> {
        let report = validate(&config);
        for w in &report.warnings {
            warn!("Config warning: {w}");
        }
        if !report.is_valid() {
            return Err(ConfigError::Invalid(report.errors.join("; ")));
        }

        let slots = config.vessels.iter().map(|_| VesselSlot::new()).collect();
        let composer = Composer::new(&config);
        Ok(Self {
            config,
            slots,
            reader: SensorReader::new(),
            composer,
            outbox,
            health: TransportHealth::new(),
            bus,
            transport,
            indicator,
            time,
            config_source: Box::new(NoConfigSource),
            last_sample: None,
            last_config_check: None,
            last_time_sync: None,
            next_daily_epoch: None,
            stats: SchedulerStats::default(),
        })
    }

    /// Attach a remote reconfiguration channel.
    pub fn with_config_source(mut self, source: Box<dyn ConfigSource>) -> Self {
        self.config_source = source;
        self
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn transport_available(&self) -> bool {
        self.health.is_available()
    }

    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    pub fn vessel_runtime(&self, id: &str) -> Option<&VesselRuntime> {
        self.config
            .vessels
            .iter()
            .position(|v| v.id == id)
            .map(|idx| &self.slots[idx].rt)
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    // ------------------------------------------------------------------------
    // Tick
    // ------------------------------------------------------------------------

    /// One cooperative loop iteration at `now` (seconds, monotonic).
    pub fn tick(&mut self, now: u64) {
        if interval_due(&mut self.last_config_check, now, CONFIG_CHECK_SECS) {
            if let Some(new_config) = self.config_source.poll() {
                match self.apply_config(new_config) {
                    Ok(()) => info!("Remote configuration applied"),
                    Err(e) => warn!(error = %e, "Remote configuration rejected; keeping previous"),
                }
            }
        }

        if interval_due(&mut self.last_time_sync, now, TIME_SYNC_SECS) {
            self.time.resync();
        }

        if self.health.probe_due(now) {
            self.health.mark_probed(now);
            if self.transport.probe() {
                if self.health.record_success() == Some(HealthTransition::BecameAvailable) {
                    self.flush_outbox();
                }
            } else {
                self.health.record_failure();
            }
        }

        if interval_due(&mut self.last_sample, now, self.config.sample_interval_secs) {
            self.sample_all(now);
        }

        self.check_daily_report();
    }

    // ------------------------------------------------------------------------
    // Sampling pass
    // ------------------------------------------------------------------------

    fn sample_all(&mut self, now: u64) {
        self.stats.sampling_passes += 1;
        let epoch = self.time.now_epoch();

        for idx in 0..self.config.vessels.len() {
            let vessel = self.config.vessels[idx].clone();
            let raw = self.reader.read(&mut self.bus, &vessel);

            let slot = &mut self.slots[idx];
            let assessment = fault::assess(&vessel, &mut slot.rt, raw);

            let mut events = Vec::new();
            if let Some(event) = assessment.event {
                events.push(event);
            }
            if let Some(level) = assessment.level {
                if let Some(event) = alarm::evaluate(&vessel, &mut slot.rt, level) {
                    events.push(event);
                }
            }

            // Local indication is driven before any transport work and
            // regardless of link state.
            let want = self.slots[idx].rt.wants_indicator();
            if want != self.slots[idx].rt.indicator_active {
                self.indicator.set_indicator(&vessel.id, want);
                self.slots[idx].rt.indicator_active = want;
            }

            for event in events {
                if !vessel.alarm_escalation {
                    debug!(vessel = %vessel.id, %event, "Alarm escalation disabled");
                    continue;
                }
                if self.slots[idx].limiter.allow(event, now) {
                    self.stats.events_sent += 1;
                    let msg = self
                        .composer
                        .alarm(&vessel, &self.slots[idx].rt, event, epoch);
                    self.dispatch(msg);
                } else {
                    self.stats.events_suppressed += 1;
                    info!(vessel = %vessel.id, %event, "Event suppressed by rate limiter");
                }
            }

            if let Some(level) = assessment.level {
                if vessel.server_upload && self.telemetry_worth_sending(idx, level, &vessel) {
                    self.stats.telemetry_sent += 1;
                    let msg = self
                        .composer
                        .telemetry(&vessel, &self.slots[idx].rt, epoch);
                    self.slots[idx].rt.last_reported_level = Some(level);
                    self.dispatch(msg);
                } else if vessel.server_upload {
                    self.stats.telemetry_skipped += 1;
                }
            }
        }
    }

    fn telemetry_worth_sending(&self, idx: usize, level: f64, vessel: &crate::config::VesselConfig) -> bool {
        match self.slots[idx].rt.last_reported_level {
            None => true,
            Some(prev) => (level - prev).abs() >= vessel.level_change_threshold,
        }
    }

    // ------------------------------------------------------------------------
    // Dispatch / flush
    // ------------------------------------------------------------------------

    /// Send live when the transport is available, otherwise buffer. A live
    /// failure both feeds the health monitor and falls back to the buffer.
    fn dispatch(&mut self, msg: ComposedMessage) {
        if !self.health.is_available() {
            self.enqueue(msg.into());
            return;
        }

        match self.transport.send(msg.target, &msg.payload, msg.sync) {
            Ok(()) => {
                self.health.record_success();
            }
            Err(e) => {
                warn!(target = msg.target, error = %e, "Live send failed; buffering");
                self.health.record_failure();
                self.enqueue(msg.into());
            }
        }
    }

    fn enqueue(&mut self, msg: QueuedMessage) {
        self.stats.messages_queued += 1;
        if let Err(e) = self.outbox.enqueue(msg) {
            // Lossy degradation: the message is gone, but the pipeline
            // must not halt over storage trouble.
            warn!(error = %e, "Failed to buffer outbound message");
        }
    }

    fn flush_outbox(&mut self) {
        let Self {
            outbox,
            transport,
            health,
            ..
        } = self;
        let result: Result<usize, OutboxError> = outbox.flush(|msg| {
            match transport.send(&msg.target, &msg.payload, msg.sync) {
                Ok(()) => {
                    health.record_success();
                    true
                }
                Err(e) => {
                    warn!(target = %msg.target, error = %e, "Replay send failed");
                    health.record_failure();
                    false
                }
            }
        });
        if let Err(e) = result {
            warn!(error = %e, "Outbox flush failed");
        }
    }

    // ------------------------------------------------------------------------
    // Daily report
    // ------------------------------------------------------------------------

    fn check_daily_report(&mut self) {
        let Some(epoch) = self.time.now_epoch() else {
            // Never synced: daily reporting stays unscheduled. No
            // tick-counter fallback.
            return;
        };

        let next = *self.next_daily_epoch.get_or_insert_with(|| {
            let next = next_aligned_epoch(epoch, self.config.report_hour, self.config.report_minute);
            info!(next, "Daily report scheduled");
            next
        });

        if epoch < next {
            return;
        }

        let reporting: Vec<_> = self
            .config
            .vessels
            .iter()
            .zip(self.slots.iter())
            .filter(|(cfg, _)| cfg.daily_report)
            .map(|(cfg, slot)| (cfg, &slot.rt))
            .collect();
        if !reporting.is_empty() {
            let msg = self.composer.daily(&reporting, Some(epoch));
            self.stats.daily_reports += 1;
            self.dispatch(msg);
        }

        self.next_daily_epoch =
            Some(next_aligned_epoch(epoch, self.config.report_hour, self.config.report_minute));
    }

    // ------------------------------------------------------------------------
    // Reconfiguration
    // ------------------------------------------------------------------------

    /// Replace the live configuration wholesale.
    ///
    /// An invalid config is rejected and the previous one stays active
    /// (fail-safe-to-last-known-good). On success, per-vessel runtime state
    /// is carried over except where it would be meaningless:
    /// - hardware-relevant field changes reset fault/debounce state;
    /// - a changed telemetry change-threshold resets the reporting baseline.
    ///
    /// The new state is built completely before anything is swapped, so an
    /// error can never leave a vessel half-applied.
    pub fn apply_config(&mut self, new_config: DeviceConfig) -> Result<(), ConfigError> {
        let report = validate(&new_config);
        for w in &report.warnings {
            warn!("Config warning: {w}");
        }
        if !report.is_valid() {
            self.stats.configs_rejected += 1;
            return Err(ConfigError::Invalid(report.errors.join("; ")));
        }

        let mut new_slots = Vec::with_capacity(new_config.vessels.len());
        for vessel in &new_config.vessels {
            let old = self
                .config
                .vessels
                .iter()
                .position(|v| v.id == vessel.id)
                .map(|idx| (&self.config.vessels[idx], &self.slots[idx]));

            let slot = match old {
                None => VesselSlot::new(),
                Some((old_cfg, old_slot)) => {
                    let mut slot = old_slot.clone();
                    if old_cfg.hardware_changed(vessel) {
                        debug!(vessel = %vessel.id, "Hardware fields changed; resetting runtime state");
                        let limiter = slot.limiter.clone();
                        slot = VesselSlot::new();
                        // Rate-limit history survives: rewiring must not
                        // grant a fresh alarm quota.
                        slot.limiter = limiter;
                    }
                    if (old_cfg.level_change_threshold - vessel.level_change_threshold).abs()
                        > f64::EPSILON
                    {
                        slot.rt.last_reported_level = None;
                    }
                    slot
                }
            };
            new_slots.push(slot);
        }

        // Complete; swap everything at once.
        self.composer = Composer::new(&new_config);
        self.next_daily_epoch = None; // report time may have changed
        self.config = new_config;
        self.slots = new_slots;
        self.stats.configs_applied += 1;
        Ok(())
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Elapsed-time due check. Fires on the first call (so the first tick
/// samples immediately) and then every `interval_secs`.
fn interval_due(last: &mut Option<u64>, now: u64, interval_secs: u64) -> bool {
    match *last {
        None => {
            *last = Some(now);
            true
        }
        Some(prev) if now.saturating_sub(prev) >= interval_secs => {
            *last = Some(now);
            true
        }
        Some(_) => false,
    }
}

/// Next occurrence of `hour:minute` strictly after `epoch`.
fn next_aligned_epoch(epoch: u64, hour: u8, minute: u8) -> u64 {
    let day_start = epoch / 86_400 * 86_400;
    let mut aligned = day_start + u64::from(hour) * 3600 + u64::from(minute) * 60;
    while aligned <= epoch {
        aligned += 86_400;
    }
    aligned
}
