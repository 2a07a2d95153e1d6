//! Event sink that renders application events onto the serial log.

use log::{error, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

pub struct LogEventSink;

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Telemetry(t) => info!(
                "telemetry: state={:?} temp={:.1}C rpm={:.2} enabled={} faults={:#04x} warn_pending={} dropped={}",
                t.state,
                t.temperature_c,
                t.display_rpm,
                t.motor_enabled,
                t.fault_flags,
                t.warning_pending,
                t.samples_dropped,
            ),
            AppEvent::StateChanged { from, to } => {
                info!("state change: {from:?} -> {to:?}");
            }
            AppEvent::SafetyStop { temperature_c } => {
                error!("SAFETY STOP at {temperature_c:.1}C: servo detached, enable cleared");
            }
            AppEvent::VitalsFault(mask) => {
                error!("vitals fault latched, mask={mask:#04x}");
            }
            AppEvent::VitalsFaultsCleared => info!("vitals faults cleared"),
            AppEvent::CycleSkipped => warn!("control cycle skipped (bad temperature read)"),
            AppEvent::Started(state) => info!("application started in {state:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsm::StateId;

    // The sink is pure formatting; this just pins the match as total.
    #[test]
    fn every_event_variant_is_renderable() {
        let mut sink = LogEventSink;
        sink.emit(&AppEvent::Started(StateId::Disabled));
        sink.emit(&AppEvent::StateChanged {
            from: StateId::Disabled,
            to: StateId::Fast,
        });
        sink.emit(&AppEvent::SafetyStop { temperature_c: 36.0 });
        sink.emit(&AppEvent::VitalsFault(0x03));
        sink.emit(&AppEvent::VitalsFaultsCleared);
        sink.emit(&AppEvent::CycleSkipped);
    }
}
