//! System configuration parameters
//!
//! All tunable parameters for the VitalVent fan controller.  Values here are
//! compile-time defaults; the vitals thresholds themselves are runtime state
//! (see [`crate::thresholds`]) because they arrive over the network API.

use serde::{Deserialize, Serialize};

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Temperature tiers ---
    /// Temperatures at or below this run the fan in the Fast tier (Celsius).
    pub fast_tier_max_c: f32,
    /// Temperatures at or above this trigger the sticky safety stop (Celsius).
    /// The open interval between the two bounds is the Medium tier.
    pub safety_stop_c: f32,

    // --- Sweep ---
    /// Per-degree step interval in the Fast tier (milliseconds).
    pub fast_step_interval_ms: f32,
    /// Per-degree step interval in the Medium tier (milliseconds).
    pub medium_step_interval_ms: f32,
    /// Sweep end stop (degrees); the sweep runs 0 → this → 0.
    pub sweep_max_angle: u16,
    /// Display-RPM scale divisor applied in the Fast tier only.
    pub fast_rpm_divisor: f32,

    // --- Timing ---
    /// Control loop interval (milliseconds).
    pub control_loop_interval_ms: u32,
    /// Telemetry report interval (seconds).
    pub telemetry_interval_secs: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // Tier boundaries
            fast_tier_max_c: 34.0,
            safety_stop_c: 35.0,

            // Sweep
            fast_step_interval_ms: 0.1,
            medium_step_interval_ms: 5.0,
            sweep_max_angle: 180,
            fast_rpm_divisor: 20.0,

            // Timing
            control_loop_interval_ms: 100, // 10 Hz
            telemetry_interval_secs: 60,   // 1/min
        }
    }
}

impl SystemConfig {
    /// Steps in one full back-and-forth sweep (0 → max → 0).
    pub fn steps_per_sweep(&self) -> u32 {
        u32::from(self.sweep_max_angle) * 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_sane() {
        let c = SystemConfig::default();
        assert!(c.fast_tier_max_c < c.safety_stop_c);
        assert!(c.fast_step_interval_ms < c.medium_step_interval_ms);
        assert!(c.sweep_max_angle > 0);
        assert!(c.fast_rpm_divisor > 0.0);
        assert!(c.control_loop_interval_ms > 0);
    }

    #[test]
    fn serde_roundtrip() {
        let c = SystemConfig::default();
        let json = serde_json::to_string(&c).unwrap();
        let c2: SystemConfig = serde_json::from_str(&json).unwrap();
        assert!((c.fast_step_interval_ms - c2.fast_step_interval_ms).abs() < 1e-6);
        assert_eq!(c.sweep_max_angle, c2.sweep_max_angle);
        assert_eq!(c.control_loop_interval_ms, c2.control_loop_interval_ms);
    }

    #[test]
    fn tier_bounds_leave_a_medium_band() {
        let c = SystemConfig::default();
        assert!(
            c.safety_stop_c - c.fast_tier_max_c > 0.0,
            "fast and safety-stop bounds must leave an open Medium interval"
        );
    }

    #[test]
    fn steps_per_sweep_counts_both_directions() {
        let c = SystemConfig::default();
        assert_eq!(c.steps_per_sweep(), 360);
    }
}
