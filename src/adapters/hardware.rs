//! Adapter binding the sensor/actuator ports to the real drivers.
//!
//! The port methods are infallible by design — the domain has already
//! decided what must happen, and a failed bus write cannot be meaningfully
//! handled mid-cycle.  Failures are logged here and the drivers retry on
//! the next command.

use log::error;

use crate::app::ports::{ActuatorPort, SensorPort};
use crate::drivers::{AlertBuzzer, ServoDriver};
use crate::error::SensorError;
use crate::sensors::Dht22Sensor;

pub struct HardwareAdapter {
    dht: Dht22Sensor,
    servo: ServoDriver,
    buzzer: AlertBuzzer,
}

impl HardwareAdapter {
    /// Wrap the drivers.  Peripheral bring-up
    /// ([`hw_init::init_peripherals`](crate::drivers::hw_init::init_peripherals))
    /// must have succeeded first.
    pub fn new() -> Self {
        Self {
            dht: Dht22Sensor::new(),
            servo: ServoDriver::new(),
            buzzer: AlertBuzzer::new(),
        }
    }
}

impl Default for HardwareAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorPort for HardwareAdapter {
    fn read_temperature(&mut self) -> Result<f32, SensorError> {
        self.dht.read()
    }
}

impl ActuatorPort for HardwareAdapter {
    fn write_angle(&mut self, angle: u16) {
        if let Err(e) = self.servo.write_angle(angle) {
            error!("servo write failed: {e}");
        }
    }

    fn attach(&mut self) {
        if let Err(e) = self.servo.attach() {
            error!("servo attach failed: {e}");
        }
    }

    fn detach(&mut self) {
        if let Err(e) = self.servo.detach() {
            error!("servo detach failed: {e}");
        }
    }

    fn is_attached(&self) -> bool {
        self.servo.is_attached()
    }

    fn set_alert(&mut self, on: bool) {
        if let Err(e) = self.buzzer.set(on) {
            error!("alert line write failed: {e}");
        }
    }

    fn all_off(&mut self) {
        if let Err(e) = self.servo.detach() {
            error!("servo detach failed: {e}");
        }
        if let Err(e) = self.buzzer.set(false) {
            error!("alert line write failed: {e}");
        }
    }
}

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;

    #[test]
    fn adapter_round_trips_injected_temperature() {
        let mut hw = HardwareAdapter::new();
        hw.dht.sim_set_temperature_c(31.5);
        let t = hw.read_temperature().unwrap();
        assert!((t - 31.5).abs() < 0.01);
    }

    #[test]
    fn all_off_detaches_and_silences() {
        let mut hw = HardwareAdapter::new();
        hw.attach();
        hw.set_alert(true);
        hw.all_off();
        assert!(!hw.is_attached());
        assert!(!hw.buzzer.is_on());
    }
}
