//! Vitals threshold store.
//!
//! Holds the operator-configured blood-oxygen and pulse-rate bounds that the
//! vitals supervisor evaluates incoming oximeter samples against.  The store
//! starts unconfigured and every dependent operation (motor enable, vitals
//! evaluation, read-back) fails with [`Error::NotConfigured`] until the first
//! valid [`ThresholdStore::set`].
//!
//! ## Atomic-replace contract
//!
//! A `set` call either replaces all four bounds as a unit or leaves the prior
//! configuration untouched.  Validation runs on the candidate values before
//! anything is written, so a rejected update can never tear an existing
//! configuration.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Inclusive limits accepted by the network API.
pub const OXYGEN_LIMIT: u8 = 100;
pub const PULSE_LIMIT: u16 = 200;

/// One complete set of vitals bounds, always replaced as a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VitalThresholds {
    pub min_oxygen: u8,
    pub max_oxygen: u8,
    pub min_pulse: u16,
    pub max_pulse: u16,
}

impl VitalThresholds {
    /// Validate candidate bounds without constructing anything.
    fn validate(min_o: u8, max_o: u8, min_p: u16, max_p: u16) -> Result<()> {
        if min_o == 0 || min_o > OXYGEN_LIMIT {
            return Err(Error::Validation("minOxygen outside 1..=100"));
        }
        if max_o == 0 || max_o > OXYGEN_LIMIT {
            return Err(Error::Validation("maxOxygen outside 1..=100"));
        }
        if min_p == 0 || min_p > PULSE_LIMIT {
            return Err(Error::Validation("minPulseRate outside 1..=200"));
        }
        if max_p == 0 || max_p > PULSE_LIMIT {
            return Err(Error::Validation("maxPulseRate outside 1..=200"));
        }
        if min_o == max_o {
            return Err(Error::Validation("oxygen min and max must differ"));
        }
        if min_p == max_p {
            return Err(Error::Validation("pulse min and max must differ"));
        }
        Ok(())
    }

    /// True if `spo2` lies inside the configured oxygen band.
    pub fn oxygen_in_range(&self, spo2: f32) -> bool {
        spo2 >= f32::from(self.min_oxygen) && spo2 <= f32::from(self.max_oxygen)
    }

    /// True if `heart_rate` lies inside the configured pulse band.
    pub fn pulse_in_range(&self, heart_rate: f32) -> bool {
        heart_rate >= f32::from(self.min_pulse) && heart_rate <= f32::from(self.max_pulse)
    }
}

/// Validated holder of the current vitals bounds.
#[derive(Debug, Default)]
pub struct ThresholdStore {
    current: Option<VitalThresholds>,
}

impl ThresholdStore {
    pub fn new() -> Self {
        Self { current: None }
    }

    /// Validate and atomically replace the configuration.
    ///
    /// On any validation failure the previous configuration (if any) is left
    /// exactly as it was.
    pub fn set(&mut self, min_o: u8, max_o: u8, min_p: u16, max_p: u16) -> Result<()> {
        VitalThresholds::validate(min_o, max_o, min_p, max_p)?;
        self.current = Some(VitalThresholds {
            min_oxygen: min_o,
            max_oxygen: max_o,
            min_pulse: min_p,
            max_pulse: max_p,
        });
        Ok(())
    }

    /// Current bounds, or [`Error::NotConfigured`] before the first valid set.
    pub fn get(&self) -> Result<VitalThresholds> {
        self.current.ok_or(Error::NotConfigured)
    }

    /// Whether a valid configuration has ever been accepted.
    pub fn is_configured(&self) -> bool {
        self.current.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_unconfigured() {
        let store = ThresholdStore::new();
        assert!(!store.is_configured());
        assert_eq!(store.get(), Err(Error::NotConfigured));
    }

    #[test]
    fn valid_set_reads_back_exactly() {
        let mut store = ThresholdStore::new();
        store.set(90, 100, 60, 120).unwrap();
        assert_eq!(
            store.get().unwrap(),
            VitalThresholds {
                min_oxygen: 90,
                max_oxygen: 100,
                min_pulse: 60,
                max_pulse: 120,
            }
        );
    }

    #[test]
    fn zero_values_rejected() {
        let mut store = ThresholdStore::new();
        assert!(matches!(
            store.set(0, 100, 60, 120),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            store.set(90, 100, 0, 120),
            Err(Error::Validation(_))
        ));
        assert!(!store.is_configured());
    }

    #[test]
    fn over_limit_values_rejected() {
        let mut store = ThresholdStore::new();
        assert!(matches!(
            store.set(90, 101, 60, 120),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            store.set(90, 100, 60, 201),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn equal_min_max_rejected() {
        let mut store = ThresholdStore::new();
        assert!(matches!(
            store.set(95, 95, 60, 120),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            store.set(90, 100, 80, 80),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn failed_set_preserves_previous_config() {
        let mut store = ThresholdStore::new();
        store.set(90, 100, 60, 120).unwrap();
        let before = store.get().unwrap();

        assert!(store.set(0, 100, 60, 120).is_err());
        assert_eq!(store.get().unwrap(), before);
    }

    #[test]
    fn later_valid_set_overwrites() {
        let mut store = ThresholdStore::new();
        store.set(90, 100, 60, 120).unwrap();
        store.set(85, 99, 50, 110).unwrap();
        let t = store.get().unwrap();
        assert_eq!(t.min_oxygen, 85);
        assert_eq!(t.max_pulse, 110);
    }

    #[test]
    fn range_helpers() {
        let t = VitalThresholds {
            min_oxygen: 90,
            max_oxygen: 100,
            min_pulse: 60,
            max_pulse: 120,
        };
        assert!(t.oxygen_in_range(95.0));
        assert!(!t.oxygen_in_range(89.9));
        assert!(t.pulse_in_range(60.0));
        assert!(!t.pulse_in_range(120.5));
    }
}
