//! Pulse-oximeter front end (MAX30100-class optical sensor on I²C).
//!
//! The chip streams raw IR/red photodiode counts through a FIFO; beat
//! detection and SpO₂ estimation happen here in software.  [`BeatDetector`]
//! is pure and host-testable; the I²C glue that feeds it lives behind
//! `cfg(target_os = "espidf")`.  Each detected beat is published into the
//! lock-free intake ring (`vitals::push_sample`), where the control loop
//! drains it on its own schedule.

use crate::vitals::VitalsSample;

#[cfg(target_os = "espidf")]
use crate::drivers::hw_init;
#[cfg(target_os = "espidf")]
use crate::error::SensorError;
#[cfg(target_os = "espidf")]
use crate::vitals;

/// I²C address of the sensor.
#[cfg(target_os = "espidf")]
const OXIMETER_I2C_ADDR: u8 = 0x57;
/// FIFO data register; each entry is IR:u16 then red:u16, big-endian.
#[cfg(target_os = "espidf")]
const REG_FIFO_DATA: u8 = 0x05;
#[cfg(target_os = "espidf")]
const REG_MODE_CONFIG: u8 = 0x06;
#[cfg(target_os = "espidf")]
const REG_SPO2_CONFIG: u8 = 0x07;
#[cfg(target_os = "espidf")]
const REG_LED_CONFIG: u8 = 0x09;

/// DC tracking filter coefficient.
const DC_ALPHA: f32 = 0.95;
/// AC swing (counts above DC) that counts as a systolic upstroke.
const BEAT_THRESHOLD: f32 = 60.0;
/// Refractory window after a beat (ms); rejects dicrotic-notch retriggers.
const REFRACTORY_MS: u32 = 300;
/// Beat-to-beat intervals outside this window are discarded (30-240 bpm).
const MIN_INTERVAL_MS: u32 = 250;
const MAX_INTERVAL_MS: u32 = 2_000;

/// Streaming beat detector over raw IR/red samples.
///
/// Tracks the DC baseline of both channels with a one-pole filter, watches
/// the IR AC component for threshold crossings, and on each accepted beat
/// converts the beat interval to bpm and the red/IR AC ratio to an SpO₂
/// estimate (the usual empirical `110 − 25·R` line, clamped to 0-100).
#[derive(Debug)]
pub struct BeatDetector {
    ir_dc: f32,
    red_dc: f32,
    ir_ac_peak: f32,
    red_ac_peak: f32,
    in_upstroke: bool,
    last_beat_ms: Option<u32>,
    primed: bool,
}

impl BeatDetector {
    pub const fn new() -> Self {
        Self {
            ir_dc: 0.0,
            red_dc: 0.0,
            ir_ac_peak: 0.0,
            red_ac_peak: 0.0,
            in_upstroke: false,
            last_beat_ms: None,
            primed: false,
        }
    }

    /// Feed one raw sample pair.  Returns a vitals sample on each accepted
    /// beat; `now_ms` is a monotonic millisecond clock.
    pub fn process(&mut self, ir: u16, red: u16, now_ms: u32) -> Option<VitalsSample> {
        let ir = f32::from(ir);
        let red = f32::from(red);

        if !self.primed {
            self.ir_dc = ir;
            self.red_dc = red;
            self.primed = true;
            return None;
        }

        self.ir_dc = DC_ALPHA * self.ir_dc + (1.0 - DC_ALPHA) * ir;
        self.red_dc = DC_ALPHA * self.red_dc + (1.0 - DC_ALPHA) * red;

        let ir_ac = ir - self.ir_dc;
        let red_ac = red - self.red_dc;
        self.ir_ac_peak = self.ir_ac_peak.max(ir_ac.abs());
        self.red_ac_peak = self.red_ac_peak.max(red_ac.abs());

        if self.in_upstroke {
            if ir_ac < 0.0 {
                self.in_upstroke = false;
            }
            return None;
        }
        if ir_ac <= BEAT_THRESHOLD {
            return None;
        }
        self.in_upstroke = true;

        let sample = match self.last_beat_ms {
            Some(prev) => {
                let interval = now_ms.wrapping_sub(prev);
                if interval < REFRACTORY_MS {
                    return None;
                }
                if !(MIN_INTERVAL_MS..=MAX_INTERVAL_MS).contains(&interval) {
                    None
                } else {
                    Some(VitalsSample {
                        heart_rate: 60_000.0 / interval as f32,
                        spo2: self.estimate_spo2(),
                    })
                }
            }
            None => None,
        };

        self.last_beat_ms = Some(now_ms);
        self.ir_ac_peak = 0.0;
        self.red_ac_peak = 0.0;
        sample
    }

    fn estimate_spo2(&self) -> f32 {
        if self.ir_dc <= 0.0 || self.red_dc <= 0.0 || self.ir_ac_peak <= 0.0 {
            return 0.0;
        }
        let ratio = (self.red_ac_peak / self.red_dc) / (self.ir_ac_peak / self.ir_dc);
        (110.0 - 25.0 * ratio).clamp(0.0, 100.0)
    }
}

impl Default for BeatDetector {
    fn default() -> Self {
        Self::new()
    }
}

// ── ESP-IDF glue ──────────────────────────────────────────────

/// Hardware front end: configures the chip and pumps its FIFO through a
/// [`BeatDetector`], publishing accepted beats into the intake ring.
#[cfg(target_os = "espidf")]
pub struct OximeterFrontEnd {
    detector: BeatDetector,
}

#[cfg(target_os = "espidf")]
impl OximeterFrontEnd {
    /// Bring the sensor into SpO₂ mode with a mid-range LED current.
    pub fn init() -> Result<Self, SensorError> {
        // Mode 0x03 = SpO2 (both LEDs), 100 Hz / 1600 us pulses, 27.1 mA.
        hw_init::i2c_write_reg(OXIMETER_I2C_ADDR, REG_MODE_CONFIG, 0x03)
            .map_err(|_| SensorError::I2cReadFailed)?;
        hw_init::i2c_write_reg(OXIMETER_I2C_ADDR, REG_SPO2_CONFIG, 0x47)
            .map_err(|_| SensorError::I2cReadFailed)?;
        hw_init::i2c_write_reg(OXIMETER_I2C_ADDR, REG_LED_CONFIG, 0x99)
            .map_err(|_| SensorError::I2cReadFailed)?;
        Ok(Self {
            detector: BeatDetector::new(),
        })
    }

    /// Drain whatever the FIFO holds.  Called from the main loop every
    /// iteration; an I²C hiccup drops this batch and the next call retries.
    pub fn service(&mut self) {
        let now_ms = (hw_init::now_us() / 1_000) as u32;
        let mut entry = [0u8; 4];
        // The FIFO is at most 16 entries deep.
        for _ in 0..16 {
            if hw_init::i2c_read_regs(OXIMETER_I2C_ADDR, REG_FIFO_DATA, &mut entry).is_err() {
                return;
            }
            let ir = u16::from_be_bytes([entry[0], entry[1]]);
            let red = u16::from_be_bytes([entry[2], entry[3]]);
            if ir == 0 && red == 0 {
                return; // FIFO exhausted
            }
            if let Some(sample) = self.detector.process(ir, red, now_ms) {
                vitals::push_sample(sample);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Synthesise a pulse train: flat baseline with a sharp upstroke every
    /// `period_ms`, sampled at 100 Hz.
    fn feed_pulses(
        det: &mut BeatDetector,
        period_ms: u32,
        beats: u32,
        red_scale: f32,
    ) -> Vec<VitalsSample> {
        let mut out = Vec::new();
        let total_ms = period_ms * (beats + 1);
        for t in (0..total_ms).step_by(10) {
            let phase = t % period_ms;
            let ac = if phase < 100 { 400.0 } else { 0.0 };
            let ir = (20_000.0 + ac) as u16;
            let red = (20_000.0 + ac * red_scale) as u16;
            if let Some(s) = det.process(ir, red, t) {
                out.push(s);
            }
        }
        out
    }

    #[test]
    fn steady_pulse_train_yields_correct_rate() {
        let mut det = BeatDetector::new();
        // 800 ms period = 75 bpm.
        let samples = feed_pulses(&mut det, 800, 6, 1.0);
        assert!(samples.len() >= 4, "expected several beats, got {samples:?}");
        for s in &samples {
            assert!(
                (s.heart_rate - 75.0).abs() < 5.0,
                "rate {} off target",
                s.heart_rate
            );
        }
    }

    #[test]
    fn spo2_estimate_stays_in_percent_range() {
        let mut det = BeatDetector::new();
        let samples = feed_pulses(&mut det, 1000, 5, 0.5);
        assert!(!samples.is_empty());
        for s in &samples {
            assert!((0.0..=100.0).contains(&s.spo2), "spo2 {} out of range", s.spo2);
        }
    }

    #[test]
    fn flat_signal_produces_no_beats() {
        let mut det = BeatDetector::new();
        for t in (0..5_000).step_by(10) {
            assert!(det.process(20_000, 20_000, t).is_none());
        }
    }

    #[test]
    fn first_crossing_sets_reference_without_reporting() {
        let mut det = BeatDetector::new();
        det.process(20_000, 20_000, 0);
        // One isolated upstroke: no prior beat, so no interval to report.
        assert!(det.process(25_000, 25_000, 10).is_none());
    }
}
