use tracing::warn;

use crate::core::clock::MusicalClock;
use crate::core::timebase::{Tick, Timebase};
use crate::engine::arp::ArpState;
use crate::engine::patterns::{default_scale, genre_pattern, DrumPattern};
use crate::engine::settings::{ArpSettings, AudioParams, DrumSettings, FxState, GateSettings};
use crate::graph::{param, SignalGraph, Waveform};

/// How long after the last pointer gesture the synth stays audible with the
/// arpeggiator off.
pub const MANUAL_HOLD_SEC: f32 = 0.5;

/// All musical state the scheduler and modulation path read. Owned by the
/// render thread; control messages mutate it between hops, so every field is
/// plain data with no interior locking.
pub struct EngineState {
    pub time: Timebase,
    pub clock: MusicalClock,
    pub step: usize,

    pub drums: DrumSettings,
    pub drum_pattern: DrumPattern,
    pub gate: GateSettings,
    pub arp: ArpSettings,
    pub arp_state: ArpState,
    pub fx: FxState,
    pub params: AudioParams,

    pub scale: Vec<f32>,
    pub base_freq: f32,
    pub octave: i32,
    pub synth_volume: f32,
    pub last_manual_trigger: Option<Tick>,
}

impl EngineState {
    pub fn new(time: Timebase, origin: Tick, bpm: f32, seed: u64) -> Self {
        let mut clock = MusicalClock::start_at(origin);
        clock.set_bpm(bpm);
        Self {
            time,
            clock,
            step: 0,
            drums: DrumSettings::default(),
            drum_pattern: genre_pattern("house"),
            gate: GateSettings::default(),
            arp: ArpSettings::default(),
            arp_state: ArpState::new(seed),
            fx: FxState::default(),
            params: AudioParams::default(),
            scale: default_scale(),
            base_freq: 110.0,
            octave: 0,
            synth_volume: 0.8,
            last_manual_trigger: None,
        }
    }

    /// Base frequency shifted by the current octave offset.
    pub fn tuned_base_freq(&self) -> f32 {
        self.base_freq * 2.0_f32.powi(self.octave)
    }

    pub fn set_bpm(&mut self, bpm: f32) {
        self.clock.set_bpm(bpm);
    }

    pub fn set_scale(&mut self, freqs: Vec<f32>) {
        if freqs.iter().any(|f| !f.is_finite() || *f <= 0.0) {
            warn!(target: "state", "rejecting scale with non-positive degree");
            return;
        }
        if !freqs.is_empty() {
            self.scale = freqs;
        }
    }

    pub fn set_octave(&mut self, octave: i32) {
        self.octave = octave.clamp(-3, 3);
    }

    pub fn set_synth_volume(&mut self, volume: f32) {
        if volume.is_finite() && volume >= 0.0 {
            self.synth_volume = volume.min(2.0);
        }
    }

    /// A manual pointer trigger restarts the arp pattern and opens the
    /// no-arp audibility window.
    pub fn trigger(&mut self, now: Tick) {
        self.arp_state.reset();
        self.last_manual_trigger = Some(now);
    }

    /// Arp enable restarts the pattern from step one; plain parameter edits
    /// while running leave the index alone.
    pub fn set_arp(&mut self, settings: ArpSettings) {
        if let Err(e) = settings.validate() {
            warn!(target: "state", "rejecting arp settings: {e}");
            return;
        }
        if settings.enabled && !self.arp.enabled {
            self.arp_state.reset();
        }
        self.arp = settings;
    }

    /// Drum enable restarts the bar; the kit and level apply immediately.
    pub fn set_drums(&mut self, settings: DrumSettings, graph: &mut SignalGraph) {
        if let Err(e) = settings.validate() {
            warn!(target: "state", "rejecting drum settings: {e}");
            return;
        }
        if settings.enabled && !self.drums.enabled {
            self.step = 0;
        }
        self.drum_pattern = genre_pattern(&settings.genre);
        graph.set_drum_kit(settings.kit);
        graph.set_steady(param::DRUM_GAIN, settings.volume);
        self.drums = settings;
    }

    /// Disabling the gate drives it open rather than freezing it wherever
    /// the pattern left it.
    pub fn set_gate(&mut self, settings: GateSettings, graph: &mut SignalGraph) {
        if let Err(e) = settings.validate() {
            warn!(target: "state", "rejecting gate settings: {e}");
            return;
        }
        if !settings.enabled && self.gate.enabled {
            graph.set_steady(param::GATE_GAIN, 1.0);
        }
        self.gate = settings;
    }

    pub fn apply_fx(&mut self, fx: FxState, graph: &mut SignalGraph) {
        graph.set_steady(param::DELAY_WET, if fx.delay { 0.5 } else { 0.0 });
        graph.set_steady(param::CHORUS_WET, if fx.chorus { 0.4 } else { 0.0 });
        graph.set_steady(param::HP_CUTOFF, if fx.highpass { 500.0 } else { 20.0 });
        graph.set_steady(param::PHASER_WET, if fx.phaser { 0.5 } else { 0.0 });
        graph.set_steady(param::REVERB_WET, if fx.reverb { 0.4 } else { 0.0 });
        // Distortion and saturation set the drive baseline in the modulation
        // path, so gesture boosts stack on top of the toggled amount.
        self.fx = fx;
    }

    pub fn apply_params(&mut self, params: AudioParams, graph: &mut SignalGraph) {
        graph.set_oscillator_waves(
            Waveform::from_name(&params.osc_a_wave),
            Waveform::from_name(&params.osc_b_wave),
        );
        graph.set_drive_curve_amount(params.drive_curve_amount);
        graph.set_steady(param::FILTER_CUTOFF, params.filter_cutoff_hz);
        graph.set_steady(param::FILTER_Q, params.filter_q);
        self.params = params;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TB: Timebase = Timebase { fs: 1000.0, hop: 64 };

    fn state_and_graph() -> (EngineState, SignalGraph) {
        (EngineState::new(TB, 0, 120.0, 7), SignalGraph::new(TB, 7))
    }

    #[test]
    fn drum_enable_restarts_the_bar() {
        let (mut state, mut graph) = state_and_graph();
        let mut on = DrumSettings::default();
        on.enabled = true;
        state.set_drums(on.clone(), &mut graph);
        state.step = 9;
        // Parameter edit while enabled keeps the step.
        on.volume = 0.5;
        state.set_drums(on.clone(), &mut graph);
        assert_eq!(state.step, 9);
        // Disable then re-enable restarts.
        on.enabled = false;
        state.set_drums(on.clone(), &mut graph);
        on.enabled = true;
        state.set_drums(on, &mut graph);
        assert_eq!(state.step, 0);
    }

    #[test]
    fn gate_disable_forces_open() {
        let (mut state, mut graph) = state_and_graph();
        let mut gate = GateSettings::default();
        gate.enabled = true;
        state.set_gate(gate.clone(), &mut graph);
        graph.set_steady(param::GATE_GAIN, 0.0);
        gate.enabled = false;
        state.set_gate(gate, &mut graph);
        assert_eq!(graph.target(param::GATE_GAIN), 1.0);
    }

    #[test]
    fn arp_enable_resets_pattern_index() {
        let (mut state, _graph) = state_and_graph();
        let mut arp = ArpSettings::default();
        arp.enabled = true;
        state.set_arp(arp.clone());
        let scale = state.scale.clone();
        let first = state.arp_state.resolve_next(110.0, &scale, &arp);
        let _ = state.arp_state.resolve_next(110.0, &scale, &arp);
        arp.enabled = false;
        state.set_arp(arp.clone());
        arp.enabled = true;
        state.set_arp(arp.clone());
        assert_eq!(state.arp_state.resolve_next(110.0, &scale, &arp), first);
    }

    #[test]
    fn invalid_settings_are_rejected_whole() {
        let (mut state, mut graph) = state_and_graph();
        let mut gate = GateSettings::default();
        gate.mix = 2.0;
        gate.enabled = true;
        state.set_gate(gate, &mut graph);
        assert!(!state.gate.enabled);
        let mut arp = ArpSettings::default();
        arp.gate = -1.0;
        arp.enabled = true;
        state.set_arp(arp);
        assert!(!state.arp.enabled);
    }

    #[test]
    fn octave_offset_is_clamped_and_applied() {
        let (mut state, _graph) = state_and_graph();
        state.set_octave(1);
        assert_eq!(state.tuned_base_freq(), 220.0);
        state.set_octave(9);
        assert_eq!(state.octave, 3);
    }

    #[test]
    fn fx_toggles_retarget_sends() {
        let (mut state, mut graph) = state_and_graph();
        let mut fx = FxState::default();
        fx.delay = true;
        fx.reverb = true;
        state.apply_fx(fx, &mut graph);
        assert_eq!(graph.target(param::DELAY_WET), 0.5);
        assert_eq!(graph.target(param::REVERB_WET), 0.4);
        fx.delay = false;
        state.apply_fx(fx, &mut graph);
        assert_eq!(graph.target(param::DELAY_WET), 0.0);
    }
}
