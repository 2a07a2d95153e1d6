//! Application service — the hexagonal core.
//!
//! [`AppService`] owns the motor FSM, the sweep stepper, the vitals
//! supervisor, the threshold store, and the warning mailbox.  It exposes a
//! clean, hardware-agnostic API.  All I/O flows through port traits injected
//! at call sites, making the entire service testable with mock adapters.
//!
//! ```text
//!  SensorPort ──▶ ┌─────────────────────────────┐ ──▶ EventSink
//!                 │         AppService           │
//! ActuatorPort ◀──│  FSM · Sweep · Vitals · Cfg  │◀── api (HTTP-shaped)
//!  SampleRing ──▶ └─────────────────────────────┘
//! ```

use log::{info, warn};

use crate::config::SystemConfig;
use crate::control::sweep::{cycle_rpm, SweepStepper};
use crate::error::{Result, SafetyFault};
use crate::fsm::context::FsmContext;
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, StateId};
use crate::mailbox::{WarningMailbox, OUT_OF_RANGE_WARNING, WARNING_CAPACITY};
use crate::safety::VitalsSupervisor;
use crate::thresholds::{ThresholdStore, VitalThresholds};
use crate::vitals::SampleRing;

use super::events::{AppEvent, TelemetryData};
use super::ports::{ActuatorPort, EventSink, SensorPort};

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all domain logic.
pub struct AppService {
    fsm: Fsm,
    ctx: FsmContext,
    vitals: VitalsSupervisor,
    sweep: SweepStepper,
    thresholds: ThresholdStore,
    mailbox: WarningMailbox,
    /// Milliseconds per control tick (derived from config).
    tick_ms: f32,
    tick_count: u64,
    /// Cycles skipped on a failed temperature read.
    skipped_cycles: u32,
}

impl AppService {
    /// Construct the service from configuration.
    ///
    /// Does **not** start the FSM — call [`start`](Self::start) next.
    pub fn new(config: SystemConfig) -> Self {
        let tick_ms = config.control_loop_interval_ms as f32;
        let sweep = SweepStepper::new(config.sweep_max_angle);
        let ctx = FsmContext::new(config);
        let fsm = Fsm::new(build_state_table(), StateId::Disabled);

        Self {
            fsm,
            ctx,
            vitals: VitalsSupervisor::new(),
            sweep,
            thresholds: ThresholdStore::new(),
            mailbox: WarningMailbox::new(),
            tick_ms,
            tick_count: 0,
            skipped_cycles: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Start the FSM in its initial state (Disabled).
    pub fn start(&mut self, sink: &mut impl EventSink) {
        self.fsm.start(&mut self.ctx);
        sink.emit(&AppEvent::Started(self.fsm.current_state()));
        info!("AppService started in {:?}", self.fsm.current_state());
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one full control cycle:
    /// drain vitals → read temperature → FSM → sweep → actuators.
    ///
    /// `ring` is the oximeter intake (the firmware-wide ring in production,
    /// a local one in tests).  The `hw` parameter satisfies **both**
    /// [`SensorPort`] and [`ActuatorPort`] — this avoids a double mutable
    /// borrow while keeping the port boundary explicit.
    pub fn tick(
        &mut self,
        ring: &SampleRing,
        hw: &mut (impl SensorPort + ActuatorPort),
        sink: &mut impl EventSink,
    ) {
        self.tick_count += 1;
        let prev_state = self.fsm.current_state();

        // 1. Drain the oximeter ring through the vitals supervisor.
        self.ingest_vitals(ring, sink);

        // 2. Sample temperature.  A failed read skips the cycle entirely:
        //    no state change, retry next tick.
        match hw.read_temperature() {
            Ok(t) if t.is_finite() => self.ctx.sensors.temperature_c = t,
            Ok(_) | Err(_) => {
                self.skipped_cycles += 1;
                warn!(
                    "temperature read failed, skipping cycle (total skipped: {})",
                    self.skipped_cycles
                );
                sink.emit(&AppEvent::CycleSkipped);
                // The alert line still tracks the vitals supervisor.
                hw.set_alert(self.ctx.commands.alert_on);
                return;
            }
        }

        // 3. FSM tick (pure state logic).
        self.fsm.tick(&mut self.ctx);

        // 4. A safety stop leaves its warning on the blackboard.
        if let Some(msg) = self.ctx.pending_warning.take() {
            self.mailbox.post(msg);
            sink.emit(&AppEvent::SafetyStop {
                temperature_c: self.ctx.sensors.temperature_c,
            });
        }

        // 5. Servo energise state before any motion.
        if self.ctx.commands.servo_attached {
            if !hw.is_attached() {
                hw.attach();
            }
        } else if hw.is_attached() {
            hw.detach();
        }

        // 6. Advance the resumable sweep by one tick's worth of time.
        self.advance_sweep(hw);

        // 7. Alert line last — a completed sweep may have released it.
        hw.set_alert(self.ctx.commands.alert_on);

        // 8. Emit state change if the FSM moved.
        let new_state = self.fsm.current_state();
        if new_state != prev_state {
            sink.emit(&AppEvent::StateChanged {
                from: prev_state,
                to: new_state,
            });
        }
    }

    // ── Vitals intake ─────────────────────────────────────────

    /// Drain `ring` and evaluate every sample against the configured
    /// thresholds.  A rising fault edge posts the fixed operator warning
    /// and asserts the alert line; the motor state machine is untouched
    /// (independent-trigger policy).
    fn ingest_vitals(&mut self, ring: &SampleRing, sink: &mut impl EventSink) {
        let thresholds = self.thresholds.get().ok();
        let had_faults = self.vitals.has_faults();

        let supervisor = &mut self.vitals;
        let mut new_edge = false;
        ring.drain(|sample| {
            new_edge |= supervisor.evaluate(&sample, thresholds.as_ref());
        });

        if new_edge {
            self.mailbox.post(OUT_OF_RANGE_WARNING);
            self.ctx.commands.alert_on = true;
            sink.emit(&AppEvent::VitalsFault(self.vitals.faults()));
        } else if had_faults && !self.vitals.has_faults() {
            sink.emit(&AppEvent::VitalsFaultsCleared);
        }

        // Mirror the vitals bits onto the blackboard; the over-temperature
        // bit is owned by the safety-stop state handlers.
        let temp_bit = self.ctx.fault_flags & SafetyFault::OverTemperature.mask();
        self.ctx.fault_flags = self.vitals.faults() | temp_bit;
    }

    // ── Sweep ─────────────────────────────────────────────────

    /// Keep the stepper in sync with the FSM's commands and advance it.
    fn advance_sweep(&mut self, hw: &mut impl ActuatorPort) {
        let cmds = self.ctx.commands;
        if !cmds.sweep_enabled {
            if self.sweep.is_active() {
                self.sweep.cancel();
            }
            return;
        }

        if !self.sweep.is_active() {
            self.sweep.start(cmds.step_interval_ms);
        } else if (self.sweep.interval_ms() - cmds.step_interval_ms).abs() > f32::EPSILON {
            // Tier change mid-sweep: keep the position, change the pace.
            self.sweep.set_interval(cmds.step_interval_ms);
        }

        if let Some(progress) = self.sweep.advance_by(self.tick_ms) {
            hw.write_angle(progress.angle);
            if progress.completed {
                let steps = self.ctx.config.steps_per_sweep();
                let rpm = cycle_rpm(steps, cmds.step_interval_ms) / cmds.rpm_divisor;
                self.ctx.display_rpm = rpm;
                if !self.vitals.has_faults() {
                    self.ctx.commands.alert_on = false;
                }
            }
        }
    }

    // ── Network API operations ────────────────────────────────

    /// Flip the motor-enable flag.  Fails until thresholds are configured —
    /// the device must know the patient's bounds before the fan runs.
    /// Returns the new state.
    pub fn toggle_motor(&mut self) -> Result<bool> {
        if !self.thresholds.is_configured() {
            return Err(crate::error::Error::NotConfigured);
        }
        self.ctx.motor_enabled = !self.ctx.motor_enabled;
        info!(
            "motor toggled {}",
            if self.ctx.motor_enabled { "ON" } else { "OFF" }
        );
        Ok(self.ctx.motor_enabled)
    }

    /// Validate and atomically replace the vitals thresholds.
    pub fn set_thresholds(&mut self, min_o: u8, max_o: u8, min_p: u16, max_p: u16) -> Result<()> {
        self.thresholds.set(min_o, max_o, min_p, max_p)?;
        info!(
            "thresholds updated: O2 [{min_o}, {max_o}] %, pulse [{min_p}, {max_p}] bpm"
        );
        Ok(())
    }

    /// Current thresholds (fails before the first valid set).
    pub fn thresholds(&self) -> Result<VitalThresholds> {
        self.thresholds.get()
    }

    /// Post an operator-supplied warning into the mailbox.
    pub fn post_warning(&mut self, message: &str) {
        self.mailbox.post(message);
    }

    /// Read-and-clear the warning mailbox.
    pub fn take_warning(&mut self) -> heapless::String<WARNING_CAPACITY> {
        self.mailbox.take()
    }

    // ── Queries ───────────────────────────────────────────────

    /// Speed currently shown to polling clients (RPM).
    pub fn display_rpm(&self) -> f32 {
        self.ctx.display_rpm
    }

    /// Current FSM state.
    pub fn state(&self) -> StateId {
        self.fsm.current_state()
    }

    /// Whether the motor-enable flag is set.
    pub fn motor_enabled(&self) -> bool {
        self.ctx.motor_enabled
    }

    /// Current fault bitmask (0 = no faults).
    pub fn fault_flags(&self) -> u8 {
        self.ctx.fault_flags
    }

    /// Total control ticks executed since startup.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Cycles skipped on failed temperature reads.
    pub fn skipped_cycles(&self) -> u32 {
        self.skipped_cycles
    }

    /// Build a telemetry snapshot from the current context.
    /// `samples_dropped`: intake-ring drop counter (passed in because the
    /// production ring is a firmware-wide static).
    pub fn build_telemetry(&self, samples_dropped: u32) -> TelemetryData {
        TelemetryData {
            state: self.fsm.current_state(),
            temperature_c: self.ctx.sensors.temperature_c,
            display_rpm: self.ctx.display_rpm,
            motor_enabled: self.ctx.motor_enabled,
            fault_flags: self.ctx.fault_flags,
            warning_pending: self.mailbox.has_message(),
            samples_dropped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn telemetry_reflects_dropped_counter() {
        let app = AppService::new(SystemConfig::default());
        let t = app.build_telemetry(7);
        assert_eq!(t.samples_dropped, 7);
        assert_eq!(t.state, StateId::Disabled);
        assert!(!t.motor_enabled);
    }

    #[test]
    fn toggle_requires_configuration() {
        let mut app = AppService::new(SystemConfig::default());
        assert_eq!(
            app.toggle_motor(),
            Err(crate::error::Error::NotConfigured)
        );
        app.set_thresholds(90, 100, 60, 120).unwrap();
        assert_eq!(app.toggle_motor(), Ok(true));
        assert_eq!(app.toggle_motor(), Ok(false));
    }
}
