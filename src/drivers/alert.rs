//! Alert buzzer on a plain GPIO line.

use log::debug;

use crate::error::ActuatorError;

#[cfg(target_os = "espidf")]
use crate::drivers::hw_init;
#[cfg(target_os = "espidf")]
use crate::pins;

pub struct AlertBuzzer {
    on: bool,
}

impl AlertBuzzer {
    pub fn new() -> Self {
        Self { on: false }
    }

    /// Drive the line; idempotent writes are skipped.
    pub fn set(&mut self, on: bool) -> Result<(), ActuatorError> {
        if on == self.on {
            return Ok(());
        }
        self.write_line(on)?;
        self.on = on;
        debug!("alert buzzer {}", if on { "on" } else { "off" });
        Ok(())
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    #[cfg(target_os = "espidf")]
    fn write_line(&mut self, on: bool) -> Result<(), ActuatorError> {
        if hw_init::gpio_write(pins::BUZZER_GPIO, on) {
            Ok(())
        } else {
            Err(ActuatorError::GpioWriteFailed)
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn write_line(&mut self, _on: bool) -> Result<(), ActuatorError> {
        Ok(())
    }
}

impl Default for AlertBuzzer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggling_tracks_state() {
        let mut buzzer = AlertBuzzer::new();
        assert!(!buzzer.is_on());
        buzzer.set(true).unwrap();
        assert!(buzzer.is_on());
        buzzer.set(true).unwrap();
        buzzer.set(false).unwrap();
        assert!(!buzzer.is_on());
    }
}
