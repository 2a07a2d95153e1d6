//! Vitals supervisor.
//!
//! The supervisor consumes every sample the control loop drains from the
//! oximeter ring and accumulates a fault bitmask.  Vitals faults are an
//! **independent trigger**: they latch the operator warning and the alert
//! line, but they do not force the temperature-driven motor state machine —
//! only the temperature path enters `SafetyStopped`.
//!
//! ## Fault lifecycle
//!
//! 1. A drained sample violates the configured bounds.
//! 2. The supervisor sets the corresponding bit and reports a rising edge,
//!    which the service turns into a mailbox warning + alert assert.
//! 3. A later in-range sample clears the bit.
//! 4. The alert line is released on the next completed sweep once
//!    `faults == 0`.
//!
//! Samples arriving before the thresholds are configured are discarded
//! unevaluated — there is nothing meaningful to compare them against.

use log::{error, info};

use crate::error::SafetyFault;
use crate::thresholds::VitalThresholds;
use crate::vitals::VitalsSample;

/// Vitals supervisor: latched fault bitmask over oximeter samples.
#[derive(Debug, Default)]
pub struct VitalsSupervisor {
    /// Latched fault bitmask.
    faults: u8,
    /// Samples evaluated since boot.
    evaluated: u32,
    /// Samples discarded because no thresholds were configured.
    discarded: u32,
}

impl VitalsSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate one sample against the configured bounds.
    ///
    /// `thresholds` is `None` while the store is unconfigured; such samples
    /// are counted and dropped.  Returns `true` if this evaluation latched a
    /// **new** fault (rising edge) — the caller posts the operator warning
    /// exactly once per edge rather than once per violating sample.
    pub fn evaluate(
        &mut self,
        sample: &VitalsSample,
        thresholds: Option<&VitalThresholds>,
    ) -> bool {
        let Some(t) = thresholds else {
            self.discarded = self.discarded.wrapping_add(1);
            return false;
        };
        self.evaluated = self.evaluated.wrapping_add(1);

        let before = self.faults;
        self.eval_fault(SafetyFault::OxygenOutOfRange, !t.oxygen_in_range(sample.spo2));
        self.eval_fault(
            SafetyFault::PulseOutOfRange,
            !t.pulse_in_range(sample.heart_rate),
        );

        // Rising edge: a bit set now that was clear before.
        self.faults & !before != 0
    }

    /// Current fault bitmask.
    pub fn faults(&self) -> u8 {
        self.faults
    }

    /// True if **any** fault is latched.
    pub fn has_faults(&self) -> bool {
        self.faults != 0
    }

    /// Check if a specific fault is latched.
    pub fn has_fault(&self, fault: SafetyFault) -> bool {
        self.faults & fault.mask() != 0
    }

    /// Samples evaluated since boot.
    pub fn evaluated_count(&self) -> u32 {
        self.evaluated
    }

    /// Samples discarded while unconfigured.
    pub fn discarded_count(&self) -> u32 {
        self.discarded
    }

    // ── Internal ──────────────────────────────────────────────────

    /// Set or clear a fault bit based on a boolean condition.
    fn eval_fault(&mut self, fault: SafetyFault, condition: bool) {
        if condition {
            if self.faults & fault.mask() == 0 {
                error!("VITALS FAULT SET: {fault}");
            }
            self.faults |= fault.mask();
        } else {
            if self.faults & fault.mask() != 0 {
                info!("VITALS FAULT CLEARED: {fault}");
            }
            self.faults &= !fault.mask();
        }
    }
}
