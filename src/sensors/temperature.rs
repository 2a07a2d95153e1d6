//! DHT22 ambient temperature sensor (single-wire, 0.5 Hz max poll rate).
//!
//! The DHT22 answers a host start pulse with a 40-bit frame: 16 bits
//! humidity, 16 bits temperature (sign + magnitude, tenths of a degree),
//! 8 bits checksum.  The part needs ≥ 2 s between conversions, so reads are
//! cached and the control loop sees the last good sample between refreshes.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: bit-bangs the data line via `hw_init` GPIO helpers.
//! On host/test: reads per-instance injected values.

use crate::error::SensorError;

#[cfg(target_os = "espidf")]
use crate::drivers::hw_init;
#[cfg(target_os = "espidf")]
use crate::pins;

/// Minimum spacing between bus conversions (microseconds).
#[cfg(target_os = "espidf")]
const MIN_READ_INTERVAL_US: i64 = 2_000_000;

/// Plausible ambient range for this sensor (°C).
const TEMP_MIN_C: f32 = -40.0;
const TEMP_MAX_C: f32 = 80.0;

pub struct Dht22Sensor {
    #[cfg(target_os = "espidf")]
    last_read_us: i64,
    #[cfg(target_os = "espidf")]
    last_celsius: Option<f32>,
    #[cfg(not(target_os = "espidf"))]
    sim_temp_c: f32,
    #[cfg(not(target_os = "espidf"))]
    sim_fails: bool,
}

impl Dht22Sensor {
    pub fn new() -> Self {
        Self {
            #[cfg(target_os = "espidf")]
            last_read_us: i64::MIN / 2,
            #[cfg(target_os = "espidf")]
            last_celsius: None,
            #[cfg(not(target_os = "espidf"))]
            sim_temp_c: 25.0,
            #[cfg(not(target_os = "espidf"))]
            sim_fails: false,
        }
    }

    /// Inject the temperature host-side reads return.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_set_temperature_c(&mut self, celsius: f32) {
        self.sim_temp_c = celsius;
    }

    /// Force host-side reads to fail (bus timeout) until cleared.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_set_read_failure(&mut self, fails: bool) {
        self.sim_fails = fails;
    }

    /// Latest temperature in °C.
    ///
    /// On ESP-IDF this re-runs the bus conversion at most every 2 s and
    /// returns the cached sample in between.
    pub fn read(&mut self) -> Result<f32, SensorError> {
        let celsius = self.read_raw()?;
        if !celsius.is_finite() || !(TEMP_MIN_C..=TEMP_MAX_C).contains(&celsius) {
            return Err(SensorError::OutOfRange);
        }
        Ok(celsius)
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_raw(&mut self) -> Result<f32, SensorError> {
        if self.sim_fails {
            return Err(SensorError::BusTimeout);
        }
        Ok(self.sim_temp_c)
    }

    #[cfg(target_os = "espidf")]
    fn read_raw(&mut self) -> Result<f32, SensorError> {
        let now = hw_init::now_us();
        if now - self.last_read_us < MIN_READ_INTERVAL_US {
            // Inside the part's conversion dead time — serve the cache.
            return self.last_celsius.ok_or(SensorError::BusTimeout);
        }
        self.last_read_us = now;

        let frame = self.read_frame()?;
        let sum = frame[0]
            .wrapping_add(frame[1])
            .wrapping_add(frame[2])
            .wrapping_add(frame[3]);
        if sum != frame[4] {
            return Err(SensorError::ChecksumMismatch);
        }

        let raw = u16::from(frame[2] & 0x7F) << 8 | u16::from(frame[3]);
        let mut celsius = f32::from(raw) / 10.0;
        if frame[2] & 0x80 != 0 {
            celsius = -celsius;
        }
        self.last_celsius = Some(celsius);
        Ok(celsius)
    }

    /// Bit-bang one 40-bit frame off the data line.
    #[cfg(target_os = "espidf")]
    fn read_frame(&mut self) -> Result<[u8; 5], SensorError> {
        let pin = pins::DHT_DATA_GPIO;

        // Host start: pull low ≥ 1 ms, release, switch to input.
        hw_init::gpio_set_output(pin);
        hw_init::gpio_write(pin, false);
        hw_init::delay_us(1_200);
        hw_init::gpio_write(pin, true);
        hw_init::delay_us(30);
        hw_init::gpio_set_input(pin);

        // Sensor response: ~80 us low, ~80 us high.
        wait_level(pin, false, 100)?;
        wait_level(pin, true, 100)?;
        wait_level(pin, false, 100)?;

        // 40 data bits: 50 us low preamble, then 26-28 us high = 0,
        // ~70 us high = 1.
        let mut frame = [0u8; 5];
        for bit in 0..40 {
            wait_level(pin, true, 70)?;
            let high_us = measure_high(pin, 100)?;
            if high_us > 50 {
                frame[bit / 8] |= 1 << (7 - bit % 8);
            }
        }
        Ok(frame)
    }
}

impl Default for Dht22Sensor {
    fn default() -> Self {
        Self::new()
    }
}

/// Busy-wait until the line reaches `level`, up to `timeout_us`.
#[cfg(target_os = "espidf")]
fn wait_level(pin: i32, level: bool, timeout_us: u32) -> Result<(), SensorError> {
    for _ in 0..timeout_us {
        if hw_init::gpio_read(pin) == level {
            return Ok(());
        }
        hw_init::delay_us(1);
    }
    Err(SensorError::BusTimeout)
}

/// Microseconds the line stays high, up to `timeout_us`.
#[cfg(target_os = "espidf")]
fn measure_high(pin: i32, timeout_us: u32) -> Result<u32, SensorError> {
    for elapsed in 0..timeout_us {
        if !hw_init::gpio_read(pin) {
            return Ok(elapsed);
        }
        hw_init::delay_us(1);
    }
    Err(SensorError::BusTimeout)
}
