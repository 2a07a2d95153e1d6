//! Concrete state handler functions and table builder.
//!
//! Each state is defined by three plain `fn` pointers — no closures, no
//! dynamic dispatch, no heap.  This is the classic embedded C FSM pattern
//! expressed in safe Rust.
//!
//! ```text
//!                 ┌─────[toggle off]──────┐
//!                 ▼                        │
//!  DISABLED ──[toggle on]──▶ FAST ◀──────▶ MEDIUM
//!      ▲                      │ t in (34,35)  │
//!      │                 [t ≥ 35]        [t ≥ 35]
//!      │                      ▼               ▼
//!      └──[forced off]─── SAFETY-STOPPED ◀────┘
//!                          (sticky: exit only via external re-enable)
//! ```
//!
//! Tier selection runs on every update from the latest temperature sample:
//! `t ≤ 34 → Fast`, `34 < t < 35 → Medium`, `t ≥ 35 → SafetyStopped`.

use log::{info, warn};

use super::context::FsmContext;
use super::{StateDescriptor, StateId};
use crate::error::SafetyFault;
use crate::mailbox::OUT_OF_RANGE_WARNING;

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.  Called once at startup.
pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        // Index 0 — Disabled
        StateDescriptor {
            id: StateId::Disabled,
            name: "Disabled",
            on_enter: Some(disabled_enter),
            on_exit: None,
            on_update: disabled_update,
        },
        // Index 1 — Fast
        StateDescriptor {
            id: StateId::Fast,
            name: "Fast",
            on_enter: Some(fast_enter),
            on_exit: None,
            on_update: fast_update,
        },
        // Index 2 — Medium
        StateDescriptor {
            id: StateId::Medium,
            name: "Medium",
            on_enter: Some(medium_enter),
            on_exit: None,
            on_update: medium_update,
        },
        // Index 3 — SafetyStopped
        StateDescriptor {
            id: StateId::SafetyStopped,
            name: "SafetyStopped",
            on_enter: Some(safety_stopped_enter),
            on_exit: Some(safety_stopped_exit),
            on_update: safety_stopped_update,
        },
    ]
}

/// Tier for the latest temperature sample.
fn tier_for(ctx: &FsmContext) -> StateId {
    let t = ctx.sensors.temperature_c;
    if t >= ctx.config.safety_stop_c {
        StateId::SafetyStopped
    } else if t <= ctx.config.fast_tier_max_c {
        StateId::Fast
    } else {
        StateId::Medium
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  DISABLED state
// ═══════════════════════════════════════════════════════════════════════════

fn disabled_enter(ctx: &mut FsmContext) {
    ctx.commands.sweep_enabled = false;
    ctx.display_rpm = 0.0;
    info!("DISABLED: fan idle, awaiting enable");
}

fn disabled_update(ctx: &mut FsmContext) -> Option<StateId> {
    if ctx.motor_enabled {
        return Some(tier_for(ctx));
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  FAST tier — full-speed sweep for cool ambient temperatures
// ═══════════════════════════════════════════════════════════════════════════

fn fast_enter(ctx: &mut FsmContext) {
    ctx.commands.sweep_enabled = true;
    ctx.commands.step_interval_ms = ctx.config.fast_step_interval_ms;
    ctx.commands.rpm_divisor = ctx.config.fast_rpm_divisor;
    ctx.commands.servo_attached = true;
    info!(
        "FAST: sweeping at {} ms/step",
        ctx.config.fast_step_interval_ms
    );
}

fn fast_update(ctx: &mut FsmContext) -> Option<StateId> {
    if !ctx.motor_enabled {
        return Some(StateId::Disabled);
    }
    match tier_for(ctx) {
        StateId::Fast => None,
        other => Some(other),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  MEDIUM tier — reduced speed in the warm band
// ═══════════════════════════════════════════════════════════════════════════

fn medium_enter(ctx: &mut FsmContext) {
    ctx.commands.sweep_enabled = true;
    ctx.commands.step_interval_ms = ctx.config.medium_step_interval_ms;
    ctx.commands.rpm_divisor = 1.0;
    ctx.commands.servo_attached = true;
    info!(
        "MEDIUM: sweeping at {} ms/step",
        ctx.config.medium_step_interval_ms
    );
}

fn medium_update(ctx: &mut FsmContext) -> Option<StateId> {
    if !ctx.motor_enabled {
        return Some(StateId::Disabled);
    }
    match tier_for(ctx) {
        StateId::Medium => None,
        other => Some(other),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  SAFETY-STOPPED — sticky fail-stop, terminal for the session
// ═══════════════════════════════════════════════════════════════════════════

fn safety_stopped_enter(ctx: &mut FsmContext) {
    ctx.commands.sweep_enabled = false;
    ctx.commands.servo_attached = false;
    ctx.commands.alert_on = true;
    ctx.display_rpm = 0.0;
    ctx.pending_warning = Some(OUT_OF_RANGE_WARNING);
    ctx.fault_flags |= SafetyFault::OverTemperature.mask();
    // Sticky: the enable flag is force-cleared so a temperature drop alone
    // can never restart the fan.
    ctx.motor_enabled = false;
    warn!(
        "SAFETY STOP: t={:.1}°C >= {:.1}°C, servo detached, alert asserted",
        ctx.sensors.temperature_c, ctx.config.safety_stop_c
    );
}

fn safety_stopped_exit(ctx: &mut FsmContext) {
    ctx.commands.servo_attached = true;
    ctx.fault_flags &= !SafetyFault::OverTemperature.mask();
    info!("SAFETY STOP: externally re-enabled, servo re-attached");
}

fn safety_stopped_update(ctx: &mut FsmContext) -> Option<StateId> {
    // Only an external re-enable (toggle_motor) leaves this state; the
    // tier is then re-derived, so a still-hot sensor re-enters the stop.
    if ctx.motor_enabled {
        return Some(tier_for(ctx));
    }
    None
}
