//! Hobby-servo driver over the LEDC PWM peripheral.
//!
//! The servo expects a 50 Hz frame with a 500-2500 µs pulse mapping to
//! 0-180°.  "Detached" stops the pulse train entirely (duty 0), which lets
//! the horn move freely and is the fail-safe posture during a safety stop.
//!
//! Host builds keep the same state machine without touching hardware, so
//! adapter-level code paths stay exercisable in tests.

use log::debug;

use crate::error::ActuatorError;
use crate::pins;

#[cfg(target_os = "espidf")]
use crate::drivers::hw_init;

pub const MAX_ANGLE: u16 = 180;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ServoState {
    Detached,
    Attached { angle: u16 },
}

pub struct ServoDriver {
    state: ServoState,
}

impl ServoDriver {
    pub fn new() -> Self {
        Self {
            state: ServoState::Detached,
        }
    }

    /// Resume the pulse train at the last commanded angle.
    pub fn attach(&mut self) -> Result<(), ActuatorError> {
        let angle = match self.state {
            ServoState::Attached { angle } => angle,
            ServoState::Detached => 0,
        };
        self.apply_duty(angle)?;
        self.state = ServoState::Attached { angle };
        debug!("servo attached at {angle} deg");
        Ok(())
    }

    /// Stop the pulse train; the horn is no longer held.
    pub fn detach(&mut self) -> Result<(), ActuatorError> {
        self.apply_raw_duty(0)?;
        self.state = ServoState::Detached;
        debug!("servo detached");
        Ok(())
    }

    pub fn is_attached(&self) -> bool {
        matches!(self.state, ServoState::Attached { .. })
    }

    /// Command a new horn angle.  Ignored (with an error) while detached.
    pub fn write_angle(&mut self, angle: u16) -> Result<(), ActuatorError> {
        if !self.is_attached() {
            return Err(ActuatorError::Detached);
        }
        let angle = angle.min(MAX_ANGLE);
        self.apply_duty(angle)?;
        self.state = ServoState::Attached { angle };
        Ok(())
    }

    fn apply_duty(&mut self, angle: u16) -> Result<(), ActuatorError> {
        self.apply_raw_duty(duty_for_angle(angle))
    }

    #[cfg(target_os = "espidf")]
    fn apply_raw_duty(&mut self, duty: u32) -> Result<(), ActuatorError> {
        if hw_init::ledc_set_duty(duty) {
            Ok(())
        } else {
            Err(ActuatorError::PwmWriteFailed)
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn apply_raw_duty(&mut self, _duty: u32) -> Result<(), ActuatorError> {
        Ok(())
    }
}

impl Default for ServoDriver {
    fn default() -> Self {
        Self::new()
    }
}

/// Map an angle to LEDC timer counts.
///
/// pulse = 500 + (2500 − 500) · angle / 180 µs, scaled into a 20 ms frame
/// at the configured duty resolution.
fn duty_for_angle(angle: u16) -> u32 {
    let span_us = u32::from(pins::SERVO_MAX_PULSE_US - pins::SERVO_MIN_PULSE_US);
    let pulse_us =
        u32::from(pins::SERVO_MIN_PULSE_US) + span_us * u32::from(angle.min(MAX_ANGLE)) / u32::from(MAX_ANGLE);
    let frame_us = 1_000_000 / pins::SERVO_PWM_FREQ_HZ;
    let full_scale = 1u32 << pins::SERVO_PWM_RESOLUTION_BITS;
    pulse_us * full_scale / frame_us
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duty_endpoints_match_pulse_limits() {
        // 500 us of a 20 ms frame at 14 bits = 409.6 counts.
        assert_eq!(duty_for_angle(0), 409);
        // 2500 us = 2048 counts.
        assert_eq!(duty_for_angle(180), 2048);
    }

    #[test]
    fn duty_is_monotonic_in_angle() {
        let mut prev = duty_for_angle(0);
        for angle in 1..=180 {
            let d = duty_for_angle(angle);
            assert!(d >= prev);
            prev = d;
        }
    }

    #[test]
    fn write_while_detached_is_rejected() {
        let mut servo = ServoDriver::new();
        assert_eq!(servo.write_angle(90), Err(ActuatorError::Detached));
    }

    #[test]
    fn attach_write_detach_cycle_tracks_state() {
        let mut servo = ServoDriver::new();
        servo.attach().unwrap();
        assert!(servo.is_attached());
        servo.write_angle(135).unwrap();
        servo.detach().unwrap();
        assert!(!servo.is_attached());
        // Re-attach resumes at the last commanded angle.
        servo.attach().unwrap();
        assert_eq!(servo.state, ServoState::Attached { angle: 135 });
    }

    #[test]
    fn overrange_angle_is_clamped() {
        let mut servo = ServoDriver::new();
        servo.attach().unwrap();
        servo.write_angle(400).unwrap();
        assert_eq!(servo.state, ServoState::Attached { angle: 180 });
    }
}
