//! Unified error types for the VitalVent firmware.
//!
//! Follows embedded best practice: a single `Error` enum that every subsystem
//! can convert into, keeping the top-level control loop's error handling
//! uniform.  All variants are `Copy` so they can be cheaply passed through the
//! vitals supervisor and FSM without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A threshold value is out of range or a min/max pair is degenerate.
    /// The `&'static str` names the offending field.
    Validation(&'static str),
    /// An operation requires vitals thresholds that have not been set yet.
    NotConfigured,
    /// A sensor could not be read or returned out-of-range data.
    Sensor(SensorError),
    /// An actuator command failed.
    Actuator(ActuatorError),
    /// Peripheral initialisation failed.
    Init(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(msg) => write!(f, "validation: {msg}"),
            Self::NotConfigured => write!(f, "vitals thresholds not configured"),
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Actuator(e) => write!(f, "actuator: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// The single-wire DHT handshake timed out mid-frame.
    BusTimeout,
    /// The 40-bit DHT frame failed its checksum.
    ChecksumMismatch,
    /// Reading is outside the physically plausible range (or NaN).
    OutOfRange,
    /// I²C transaction with the oximeter failed.
    I2cReadFailed,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BusTimeout => write!(f, "sensor bus timeout"),
            Self::ChecksumMismatch => write!(f, "frame checksum mismatch"),
            Self::OutOfRange => write!(f, "reading out of range"),
            Self::I2cReadFailed => write!(f, "I2C read failed"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    /// LEDC duty-cycle write failed.
    PwmWriteFailed,
    /// GPIO set failed.
    GpioWriteFailed,
    /// Angle command while the servo is detached.
    Detached,
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PwmWriteFailed => write!(f, "PWM write failed"),
            Self::GpioWriteFailed => write!(f, "GPIO write failed"),
            Self::Detached => write!(f, "servo detached"),
        }
    }
}

impl From<ActuatorError> for Error {
    fn from(e: ActuatorError) -> Self {
        Self::Actuator(e)
    }
}

// ---------------------------------------------------------------------------
// Safety faults
// ---------------------------------------------------------------------------

/// Vitals faults are a special category: they latch the alert line and the
/// operator warning until the offending condition clears.  They are
/// accumulated in a bitfield by the vitals supervisor so that multiple
/// simultaneous faults can be tracked and individually cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SafetyFault {
    /// SpO2 outside the configured [min, max] oxygen band.
    OxygenOutOfRange = 0b0000_0001,
    /// Heart rate outside the configured [min, max] pulse band.
    PulseOutOfRange = 0b0000_0010,
    /// Ambient temperature at or above the safety-stop boundary.
    OverTemperature = 0b0000_0100,
}

impl SafetyFault {
    /// Return the bitmask for this fault.
    pub const fn mask(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for SafetyFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OxygenOutOfRange => write!(f, "oxygen out of range"),
            Self::PulseOutOfRange => write!(f, "pulse rate out of range"),
            Self::OverTemperature => write!(f, "over temperature"),
        }
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
