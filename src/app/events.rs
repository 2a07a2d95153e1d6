//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other side
//! decide what to do with them — log to serial, push to a dashboard, etc.

use crate::fsm::StateId;

/// Structured events emitted by the application core.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Periodic telemetry snapshot.
    Telemetry(TelemetryData),

    /// The motor state machine transitioned between states.
    StateChanged { from: StateId, to: StateId },

    /// The temperature safety stop fired (servo detached, enable forced off).
    SafetyStop { temperature_c: f32 },

    /// A vitals sample latched one or more new fault bits.
    VitalsFault(u8),

    /// All vitals faults have cleared.
    VitalsFaultsCleared,

    /// A control cycle was skipped because the temperature read failed.
    CycleSkipped,

    /// The application service has started (carries initial state).
    Started(StateId),
}

/// A point-in-time telemetry snapshot suitable for logging or transmission.
#[derive(Debug, Clone)]
pub struct TelemetryData {
    pub state: StateId,
    pub temperature_c: f32,
    pub display_rpm: f32,
    pub motor_enabled: bool,
    pub fault_flags: u8,
    /// An unread operator warning is waiting in the mailbox.
    pub warning_pending: bool,
    /// Oximeter samples dropped at the intake ring since boot.
    pub samples_dropped: u32,
}
