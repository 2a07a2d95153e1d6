//! Property tests for the core data structures and control logic.
//!
//! Runs on host (x86_64) only — proptest is not available for ESP32 targets.
//! On ESP32, these tests are compiled out.

#![cfg(not(target_os = "espidf"))]

use proptest::prelude::*;

use vitalvent::api::{self, Request};
use vitalvent::app::events::AppEvent;
use vitalvent::app::ports::{ActuatorPort, EventSink, SensorPort};
use vitalvent::app::service::AppService;
use vitalvent::config::SystemConfig;
use vitalvent::control::sweep::SweepStepper;
use vitalvent::error::{Error, SensorError};
use vitalvent::fsm::StateId;
use vitalvent::thresholds::ThresholdStore;
use vitalvent::vitals::SampleRing;

// ── Threshold store ───────────────────────────────────────────

proptest! {
    /// Any in-domain, non-degenerate configuration is accepted and read
    /// back exactly.
    #[test]
    fn valid_thresholds_round_trip(
        min_o in 1u8..=100,
        max_o in 1u8..=100,
        min_p in 1u16..=200,
        max_p in 1u16..=200,
    ) {
        prop_assume!(min_o != max_o && min_p != max_p);
        let mut store = ThresholdStore::new();
        store.set(min_o, max_o, min_p, max_p).unwrap();
        let t = store.get().unwrap();
        prop_assert_eq!(t.min_oxygen, min_o);
        prop_assert_eq!(t.max_oxygen, max_o);
        prop_assert_eq!(t.min_pulse, min_p);
        prop_assert_eq!(t.max_pulse, max_p);
    }

    /// Out-of-domain or degenerate values are rejected and never disturb
    /// a previously accepted configuration.
    #[test]
    fn invalid_thresholds_preserve_previous(
        min_o in 0u8..=255,
        max_o in 0u8..=255,
        min_p in 0u16..=400,
        max_p in 0u16..=400,
    ) {
        let invalid = !(1..=100).contains(&min_o)
            || !(1..=100).contains(&max_o)
            || !(1..=200).contains(&min_p)
            || !(1..=200).contains(&max_p)
            || min_o == max_o
            || min_p == max_p;
        prop_assume!(invalid);

        let mut store = ThresholdStore::new();
        store.set(90, 100, 60, 120).unwrap();

        prop_assert!(matches!(
            store.set(min_o, max_o, min_p, max_p),
            Err(Error::Validation(_))
        ));
        let t = store.get().unwrap();
        prop_assert_eq!(t.min_oxygen, 90);
        prop_assert_eq!(t.max_oxygen, 100);
        prop_assert_eq!(t.min_pulse, 60);
        prop_assert_eq!(t.max_pulse, 120);
    }
}

// ── Sweep stepper ─────────────────────────────────────────────

proptest! {
    /// The angle never leaves 0..=max for any interval and any sequence of
    /// advance calls; cancel always freezes the position.
    #[test]
    fn stepper_angle_always_in_bounds(
        interval in 0.05f32..10.0,
        advances in proptest::collection::vec(0.0f32..50.0, 1..=100),
    ) {
        let mut s = SweepStepper::new(180);
        s.start(interval);
        for a in &advances {
            if let Some(p) = s.advance_by(*a) {
                prop_assert!(p.angle <= 180);
            }
        }
        let frozen = s.position();
        s.cancel();
        prop_assert!(s.advance_by(1000.0).is_none());
        prop_assert_eq!(s.position(), frozen);
    }
}

// ── Tier mapping ──────────────────────────────────────────────

struct TempOnlyHw {
    temp: f32,
}

impl SensorPort for TempOnlyHw {
    fn read_temperature(&mut self) -> Result<f32, SensorError> {
        Ok(self.temp)
    }
}

impl ActuatorPort for TempOnlyHw {
    fn write_angle(&mut self, _angle: u16) {}
    fn attach(&mut self) {}
    fn detach(&mut self) {}
    fn is_attached(&self) -> bool {
        true
    }
    fn set_alert(&mut self, _on: bool) {}
    fn all_off(&mut self) {}
}

struct NullSink;
impl EventSink for NullSink {
    fn emit(&mut self, _event: &AppEvent) {}
}

proptest! {
    /// Every finite temperature maps an enabled fan to exactly the tier its
    /// band dictates.
    #[test]
    fn temperature_maps_to_exactly_one_tier(t in -40.0f32..80.0) {
        let mut sink = NullSink;
        let mut app = AppService::new(SystemConfig::default());
        app.start(&mut sink);
        app.set_thresholds(90, 100, 60, 120).unwrap();
        app.toggle_motor().unwrap();

        let mut hw = TempOnlyHw { temp: t };
        let ring = SampleRing::new();
        app.tick(&ring, &mut hw, &mut sink);

        let expected = if t >= 35.0 {
            StateId::SafetyStopped
        } else if t <= 34.0 {
            StateId::Fast
        } else {
            StateId::Medium
        };
        prop_assert_eq!(app.state(), expected);
    }
}

// ── Router robustness ─────────────────────────────────────────

proptest! {
    /// Arbitrary paths and parameter strings never panic the router, and
    /// every response carries a known status code.
    #[test]
    fn router_never_panics(
        path in "[ -~]{0,40}",
        key in "[a-zA-Z]{0,16}",
        value in "[ -~]{0,40}",
    ) {
        let mut app = AppService::new(SystemConfig::default());
        let params = [(key.as_str(), value.as_str())];

        let resp = api::dispatch(&Request::get(&path), &mut app);
        prop_assert!([200, 400, 404].contains(&resp.status));

        let resp = api::dispatch(&Request::post(&path, &params), &mut app);
        prop_assert!([200, 400, 404].contains(&resp.status));
    }
}
