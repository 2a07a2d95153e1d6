//! Resumable servo sweep stepper.
//!
//! The fan oscillates by sweeping the servo 0 → 180 → 0 degrees, one degree
//! per step, with the step interval set by the active speed tier.  A naive
//! implementation would busy-loop through all 360 steps and block the
//! control loop for up to ~36 time-units at the slow tier; instead the sweep
//! is explicit state — angle, direction, fractional time carry — advanced
//! once per scheduler tick by however much wall time elapsed.  That keeps
//! configuration requests responsive mid-sweep and lets a disable or
//! safety-stop cancel a sweep before it completes.

/// Result of one [`SweepStepper::advance_by`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepProgress {
    /// Servo angle after this advance (degrees).
    pub angle: u16,
    /// True if at least one full 0 → max → 0 sweep finished during this
    /// advance.
    pub completed: bool,
}

/// Incrementally advanceable back-and-forth sweep.
#[derive(Debug, Clone)]
pub struct SweepStepper {
    angle: u16,
    rising: bool,
    max_angle: u16,
    step_interval_ms: f32,
    /// Elapsed time not yet converted into whole steps.
    carry_ms: f32,
    active: bool,
}

impl SweepStepper {
    pub fn new(max_angle: u16) -> Self {
        Self {
            angle: 0,
            rising: true,
            max_angle,
            step_interval_ms: 0.0,
            carry_ms: 0.0,
            active: false,
        }
    }

    /// Begin (or restart) a sweep from 0 degrees at `step_interval_ms` per
    /// degree.
    pub fn start(&mut self, step_interval_ms: f32) {
        self.angle = 0;
        self.rising = true;
        self.step_interval_ms = step_interval_ms;
        self.carry_ms = 0.0;
        self.active = true;
    }

    /// Change the step interval without restarting the sweep (tier change
    /// mid-flight keeps the current position).
    pub fn set_interval(&mut self, step_interval_ms: f32) {
        self.step_interval_ms = step_interval_ms;
    }

    /// Cancel the sweep.  The position freezes where it is; subsequent
    /// advances do nothing until [`start`](Self::start) is called again.
    pub fn cancel(&mut self) {
        self.active = false;
        self.carry_ms = 0.0;
    }

    /// Advance by `elapsed_ms` of wall time.  Returns `None` when the sweep
    /// is inactive.
    pub fn advance_by(&mut self, elapsed_ms: f32) -> Option<SweepProgress> {
        if !self.active || self.step_interval_ms <= 0.0 {
            return None;
        }

        self.carry_ms += elapsed_ms;
        let mut completed = false;
        while self.carry_ms >= self.step_interval_ms {
            self.carry_ms -= self.step_interval_ms;
            completed |= self.step();
        }
        Some(SweepProgress {
            angle: self.angle,
            completed,
        })
    }

    /// Current servo angle (degrees).
    pub fn position(&self) -> u16 {
        self.angle
    }

    /// Whether a sweep is in flight.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Active step interval (milliseconds per degree).
    pub fn interval_ms(&self) -> f32 {
        self.step_interval_ms
    }

    // ── Internal ──────────────────────────────────────────────────

    /// Take one step.  Returns `true` on full-sweep completion (back at 0).
    fn step(&mut self) -> bool {
        if self.rising {
            self.angle += 1;
            if self.angle >= self.max_angle {
                self.angle = self.max_angle;
                self.rising = false;
            }
            false
        } else {
            self.angle -= 1;
            if self.angle == 0 {
                self.rising = true;
                return true;
            }
            false
        }
    }
}

/// Display RPM for a full back-and-forth cycle of `steps_per_sweep` steps at
/// `step_interval_ms` per step.
pub fn cycle_rpm(steps_per_sweep: u32, step_interval_ms: f32) -> f32 {
    let secs_per_cycle = steps_per_sweep as f32 * step_interval_ms / 1000.0;
    if secs_per_cycle <= 0.0 {
        return 0.0;
    }
    60.0 / secs_per_cycle
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inactive_stepper_does_not_advance() {
        let mut s = SweepStepper::new(180);
        assert!(s.advance_by(100.0).is_none());
        assert_eq!(s.position(), 0);
    }

    #[test]
    fn advances_by_elapsed_over_interval() {
        let mut s = SweepStepper::new(180);
        s.start(5.0);
        let p = s.advance_by(50.0).unwrap();
        assert_eq!(p.angle, 10);
        assert!(!p.completed);
    }

    #[test]
    fn fractional_time_carries_between_ticks() {
        let mut s = SweepStepper::new(180);
        s.start(5.0);
        // 3 ms + 3 ms = one 5 ms step plus 1 ms carry.
        assert_eq!(s.advance_by(3.0).unwrap().angle, 0);
        assert_eq!(s.advance_by(3.0).unwrap().angle, 1);
    }

    #[test]
    fn full_sweep_completes_exactly_once() {
        let mut s = SweepStepper::new(180);
        s.start(1.0);
        // 359 steps: at angle 1, descending, not yet complete.
        let p = s.advance_by(359.0).unwrap();
        assert_eq!(p.angle, 1);
        assert!(!p.completed);
        // Step 360 closes the sweep.
        let p = s.advance_by(1.0).unwrap();
        assert_eq!(p.angle, 0);
        assert!(p.completed);
    }

    #[test]
    fn angle_stays_within_bounds() {
        let mut s = SweepStepper::new(180);
        s.start(0.5);
        for _ in 0..100 {
            let p = s.advance_by(7.3).unwrap();
            assert!(p.angle <= 180);
        }
    }

    #[test]
    fn cancel_freezes_mid_sweep() {
        let mut s = SweepStepper::new(180);
        s.start(1.0);
        s.advance_by(90.0).unwrap();
        assert_eq!(s.position(), 90);

        s.cancel();
        assert!(s.advance_by(1000.0).is_none());
        assert_eq!(s.position(), 90, "cancel must freeze the position");
    }

    #[test]
    fn restart_after_cancel_begins_at_zero() {
        let mut s = SweepStepper::new(180);
        s.start(1.0);
        s.advance_by(42.0).unwrap();
        s.cancel();
        s.start(5.0);
        assert_eq!(s.position(), 0);
        assert!(s.is_active());
    }

    #[test]
    fn interval_change_keeps_position() {
        let mut s = SweepStepper::new(180);
        s.start(1.0);
        s.advance_by(30.0).unwrap();
        s.set_interval(5.0);
        let p = s.advance_by(10.0).unwrap();
        assert_eq!(p.angle, 32);
    }

    #[test]
    fn rpm_matches_cycle_time() {
        // 360 steps at 5 ms = 1.8 s per cycle = 33.33 rpm.
        let rpm = cycle_rpm(360, 5.0);
        assert!((rpm - 33.333_332).abs() < 0.01);
        // 360 steps at 0.1 ms = 36 ms per cycle ~ 1666.7 rpm.
        let rpm = cycle_rpm(360, 0.1);
        assert!((rpm - 1666.666_6).abs() < 0.5);
    }

    #[test]
    fn zero_interval_yields_zero_rpm() {
        assert_eq!(cycle_rpm(360, 0.0), 0.0);
    }
}
