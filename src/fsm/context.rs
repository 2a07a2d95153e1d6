//! Shared mutable context threaded through every FSM handler.
//!
//! `FsmContext` is the single struct that state handlers read from and
//! write to.  It contains the latest temperature sample, actuation command
//! outputs, the motor-enable flag owned by the network API, configuration,
//! and the mirrored vitals fault mask.  Think of it as the "blackboard" in
//! a blackboard architecture.

use crate::config::SystemConfig;

// ---------------------------------------------------------------------------
// Sensor snapshot (read-only to state handlers; written by the service)
// ---------------------------------------------------------------------------

/// A point-in-time snapshot of the control loop's sensor inputs.
///
/// Only ever written from a *valid* temperature read — a failed read skips
/// the whole cycle, so handlers never see a poisoned value.
#[derive(Debug, Clone, Copy, Default)]
pub struct SensorSnapshot {
    /// Ambient temperature (°C).
    pub temperature_c: f32,
}

// ---------------------------------------------------------------------------
// Actuation commands (written by state handlers; consumed by the service)
// ---------------------------------------------------------------------------

/// Commands that state handlers write to request actuation.
/// The service applies these to the sweep stepper and ports each tick.
#[derive(Debug, Clone, Copy)]
pub struct ActuationCommands {
    /// Whether the sweep stepper should be running.
    pub sweep_enabled: bool,
    /// Per-degree step interval for the active tier (milliseconds).
    pub step_interval_ms: f32,
    /// Divisor applied to the cycle RPM before display (Fast tier scaling).
    pub rpm_divisor: f32,
    /// Whether the servo output stage should be attached.
    pub servo_attached: bool,
    /// Whether the alert line should be asserted.
    pub alert_on: bool,
}

impl Default for ActuationCommands {
    fn default() -> Self {
        Self {
            sweep_enabled: false,
            step_interval_ms: 0.0,
            rpm_divisor: 1.0,
            servo_attached: true,
            alert_on: false,
        }
    }
}

impl ActuationCommands {
    /// Sweep halted, servo attached but idle, alert silent.
    pub fn idle() -> Self {
        Self::default()
    }
}

// ---------------------------------------------------------------------------
// FsmContext
// ---------------------------------------------------------------------------

/// The shared context passed to every state handler function.
pub struct FsmContext {
    // -- Timing --
    /// Ticks elapsed since the current state was entered.
    pub ticks_in_state: u64,
    /// Monotonic total tick count.
    pub total_ticks: u64,

    // -- External enable flag --
    /// Owned by the network API (`toggle_motor`); forced false by the
    /// safety stop.  The FSM only reads and force-clears it.
    pub motor_enabled: bool,

    // -- Sensor data --
    /// Latest valid temperature sample.  Updated before each FSM tick.
    pub sensors: SensorSnapshot,

    // -- Actuation outputs --
    /// Commands to be applied after the FSM tick.
    pub commands: ActuationCommands,

    /// Speed shown to polling clients (RPM), derived on sweep completion.
    pub display_rpm: f32,

    /// Warning for the service to post into the mailbox after this tick.
    /// Set by the safety-stop entry handler; taken by the service.
    pub pending_warning: Option<&'static str>,

    // -- Configuration --
    pub config: SystemConfig,

    // -- Safety --
    /// Fault bitmask (see `SafetyFault::mask()`).  Vitals bits mirrored
    /// from the supervisor by the service; the over-temperature bit is
    /// managed by the safety-stop state itself.
    pub fault_flags: u8,
}

impl FsmContext {
    /// Create a new context with the given configuration.
    pub fn new(config: SystemConfig) -> Self {
        Self {
            ticks_in_state: 0,
            total_ticks: 0,
            motor_enabled: false,
            sensors: SensorSnapshot::default(),
            commands: ActuationCommands::idle(),
            display_rpm: 0.0,
            pending_warning: None,
            config,
            fault_flags: 0,
        }
    }

    /// Returns `true` if **any** fault bit is set.
    pub fn has_faults(&self) -> bool {
        self.fault_flags != 0
    }

    /// Check whether a specific fault flag is set.
    pub fn has_fault(&self, fault: crate::error::SafetyFault) -> bool {
        self.fault_flags & fault.mask() != 0
    }
}
