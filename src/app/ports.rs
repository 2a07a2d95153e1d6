//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (sensors, actuators, event sinks) implement these traits.
//! The [`AppService`](super::service::AppService) consumes them via generics,
//! so the domain core never touches hardware directly.  The raw sensor bus
//! protocols and PWM generation live entirely behind this boundary.

use crate::app::events::AppEvent;
use crate::error::SensorError;

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: the domain calls this to obtain the ambient temperature.
pub trait SensorPort {
    /// One temperature sample in °C.
    ///
    /// An `Err` means the control cycle must be skipped — the domain never
    /// acts on a failed read.
    fn read_temperature(&mut self) -> Result<f32, SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port: the domain calls this to command the fan hardware.
pub trait ActuatorPort {
    /// Move the servo to `angle` degrees (0..=180).  Ignored while detached.
    fn write_angle(&mut self, angle: u16);

    /// Re-energise the servo output stage.
    fn attach(&mut self);

    /// De-energise the servo output stage (safety stop).
    fn detach(&mut self);

    /// Whether the output stage is currently energised.
    fn is_attached(&self) -> bool;

    /// Drive the alert line (buzzer).
    fn set_alert(&mut self, on: bool);

    /// Kill all actuators (servo detached, alert silent) — safe shutdown.
    fn all_off(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`]s through this port.  Adapters
/// decide where they go (serial log, a future MQTT publisher, etc.).
pub trait EventSink {
    fn emit(&mut self, event: &AppEvent);
}
