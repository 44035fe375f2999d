use crate::core::timebase::Tick;
use crate::engine::state::{EngineState, MANUAL_HOLD_SEC};
use crate::graph::{param, SignalGraph};

/// Floor on an arp note's audibility window, so very short gates still
/// register as activity.
pub const MIN_NOTE_TICKS: Tick = 8;

/// Pitch bend span in semitones across the full x axis.
const BEND_SEMITONES: f32 = 7.0;
/// Slowest pointer lag, scaled down toward zero as hardness rises.
const BASE_LAG_SEC: f32 = 0.08;
/// Fast smoothing for the gesture-driven brightness boosts.
const BOOST_TAU_SEC: f32 = 0.02;

/// One frame of continuous pointer input, all axes normalized to [0, 1]
/// except `speed`, which is the pointer velocity estimate.
#[derive(Clone, Copy, Debug, Default)]
pub struct ModInput {
    pub x: f32,
    pub y: f32,
    pub speed: f32,
    pub hardness: f32,
    pub clicked: bool,
}

/// Map a pointer frame onto the steady values of the continuous params.
///
/// Audibility: with the arp running the synth sounds only inside scheduled
/// note windows; without it, pointer motion, clicks, and a short hold after
/// the last manual trigger keep it open. Everything lands as a steady
/// retarget, so a macro override in flight wins until it reverts.
pub fn apply(state: &mut EngineState, graph: &mut SignalGraph, input: ModInput, now: Tick) {
    let moving = input.speed > 0.05 || input.clicked;
    if moving {
        state.last_manual_trigger = Some(now);
    }
    let active = if state.arp.enabled {
        state.arp_state.is_active(now)
    } else {
        let hold = state.time.sec_to_tick(MANUAL_HOLD_SEC);
        moving
            || state
                .last_manual_trigger
                .is_some_and(|t| now.saturating_sub(t) < hold)
    };
    graph.set_steady(
        param::SYNTH_GAIN,
        if active { state.synth_volume } else { 0.0 },
    );

    // Harder gestures track the pointer more tightly.
    let lag = BASE_LAG_SEC * (1.0 - input.hardness.clamp(0.0, 1.0));
    let bend = (input.x.clamp(0.0, 1.0) - 0.5) * 2.0 * BEND_SEMITONES;
    graph.set_tau(param::PITCH_BEND, lag);
    graph.set_steady(param::PITCH_BEND, bend);
    graph.set_tau(param::OSC_SPREAD, lag);
    graph.set_steady(param::OSC_SPREAD, input.y.clamp(0.0, 1.0));

    let drive_base = if state.fx.distortion {
        3.5
    } else if state.fx.saturation {
        1.8
    } else {
        1.0
    };
    let click_boost = if input.clicked { 1.5 } else { 0.0 };
    graph.set_steady(param::DRIVE_GAIN, drive_base + click_boost);

    let hardness = input.hardness.clamp(0.0, 1.0);
    let cutoff = state.params.filter_cutoff_hz * (1.0 + 2.0 * hardness)
        + if input.clicked { 800.0 } else { 0.0 };
    graph.set_tau(param::FILTER_CUTOFF, BOOST_TAU_SEC);
    graph.set_steady(param::FILTER_CUTOFF, cutoff);
    graph.set_steady(param::FILTER_Q, state.params.filter_q + hardness * 2.0);
}
