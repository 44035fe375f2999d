use tracing::debug;

use crate::core::curves;
use crate::core::timebase::{Tick, Timebase};
use crate::drums::{DrumKit, DrumLane, DrumVoice};
use crate::graph::analysis::AnalysisTap;
use crate::graph::convolver::Convolver;
use crate::graph::nodes::{
    Biquad, Chorus, Compressor, Delay, FilterMode, Oscillator, Phaser, Waveform, Waveshaper,
};
use crate::graph::params::{Param, ParamId};

/// Parameter handles. The set is fixed at build time; handles are stable for
/// the graph's lifetime.
pub mod param {
    use super::ParamId;

    pub const OSC_FREQ: ParamId = ParamId(0);
    pub const PITCH_BEND: ParamId = ParamId(1);
    pub const OSC_SPREAD: ParamId = ParamId(2);
    pub const SUB_GAIN: ParamId = ParamId(3);
    pub const FILTER_CUTOFF: ParamId = ParamId(4);
    pub const FILTER_Q: ParamId = ParamId(5);
    pub const HP_CUTOFF: ParamId = ParamId(6);
    pub const SWEEP_FREQ: ParamId = ParamId(7);
    pub const SWEEP_MODE: ParamId = ParamId(8);
    pub const DRIVE_GAIN: ParamId = ParamId(9);
    pub const SHAPER_CURVE: ParamId = ParamId(10);
    pub const SYNTH_GAIN: ParamId = ParamId(11);
    pub const GATE_GAIN: ParamId = ParamId(12);
    pub const DRUM_GAIN: ParamId = ParamId(13);
    pub const MASTER_GAIN: ParamId = ParamId(14);
    pub const DELAY_TIME: ParamId = ParamId(15);
    pub const DELAY_FEEDBACK: ParamId = ParamId(16);
    pub const DELAY_WET: ParamId = ParamId(17);
    pub const REVERB_WET: ParamId = ParamId(18);
    pub const CHORUS_WET: ParamId = ParamId(19);
    pub const PHASER_WET: ParamId = ParamId(20);
    pub const PHASER_RATE: ParamId = ParamId(21);

    pub const COUNT: usize = 22;
}

/// Shaper transfer selection, read from the SHAPER_CURVE param.
pub const CURVE_DRIVE: f32 = 0.0;
pub const CURVE_FOLD: f32 = 1.0;
pub const CURVE_CRUSH: f32 = 2.0;

/// Sweep filter modes, read from the SWEEP_MODE param.
pub const SWEEP_BYPASS: f32 = 0.0;
pub const SWEEP_BANDPASS: f32 = 1.0;
pub const SWEEP_NOTCH: f32 = 2.0;

const CURVE_LEN: usize = 1025;

/// The fixed-topology signal graph. Built once per engine lifetime; only
/// parameter values move afterwards. Two buses (synth, drums) merge into a
/// master bus with a compressor and an analysis tap.
pub struct SignalGraph {
    time: Timebase,
    params: Vec<Param>,

    osc_a: Oscillator,
    osc_b: Oscillator,
    sub_osc: Oscillator,
    lowpass: Biquad,
    highpass: Biquad,
    sweep: Biquad,
    shaper_drive: Waveshaper,
    shaper_fold: Waveshaper,
    shaper_crush: Waveshaper,
    delay: Delay,
    chorus: Chorus,
    phaser: Phaser,
    reverb: Convolver,
    compressor: Compressor,
    tap: AnalysisTap,

    drum_voices: Vec<DrumVoice>,
    drum_kit: DrumKit,
    noise_seed: u64,

    reverb_send: Vec<f32>,
    reverb_out: Vec<f32>,
}

impl SignalGraph {
    /// Builds the whole topology, including the precomputed reverb impulse.
    /// This is the expensive call the session refuses to repeat on rapid
    /// start/stop cycles.
    pub fn new(time: Timebase, seed: u64) -> Self {
        let fs = time.fs;
        let mk = |value: f32, tau: f32, lo: f32, hi: f32| Param::new(value, tau, fs, lo, hi);
        let mut params = Vec::with_capacity(param::COUNT);
        params.push(mk(220.0, 0.02, 20.0, 4000.0)); // OSC_FREQ
        params.push(mk(0.0, 0.03, -12.0, 12.0)); // PITCH_BEND
        params.push(mk(0.0, 0.03, 0.0, 0.1)); // OSC_SPREAD
        params.push(mk(0.3, 0.02, 0.0, 1.0)); // SUB_GAIN
        params.push(mk(1200.0, 0.008, 40.0, 18_000.0)); // FILTER_CUTOFF
        params.push(mk(0.9, 0.02, 0.1, 20.0)); // FILTER_Q
        params.push(mk(20.0, 0.02, 20.0, 4000.0)); // HP_CUTOFF
        params.push(mk(800.0, 0.01, 60.0, 8000.0)); // SWEEP_FREQ
        params.push(mk(SWEEP_BYPASS, 0.0, 0.0, 2.0)); // SWEEP_MODE
        params.push(mk(1.0, 0.01, 0.1, 12.0)); // DRIVE_GAIN
        params.push(mk(CURVE_DRIVE, 0.0, 0.0, 2.0)); // SHAPER_CURVE
        params.push(mk(0.0, 0.005, 0.0, 1.0)); // SYNTH_GAIN
        params.push(mk(1.0, 0.003, 0.0, 1.0)); // GATE_GAIN
        params.push(mk(0.8, 0.02, 0.0, 1.0)); // DRUM_GAIN
        params.push(mk(0.9, 0.02, 0.0, 1.5)); // MASTER_GAIN
        params.push(mk(0.28, 0.05, 0.02, 1.0)); // DELAY_TIME
        params.push(mk(0.35, 0.02, 0.0, 0.9)); // DELAY_FEEDBACK
        params.push(mk(0.0, 0.02, 0.0, 1.0)); // DELAY_WET
        params.push(mk(0.0, 0.05, 0.0, 1.0)); // REVERB_WET
        params.push(mk(0.0, 0.02, 0.0, 1.0)); // CHORUS_WET
        params.push(mk(0.0, 0.02, 0.0, 1.0)); // PHASER_WET
        params.push(mk(0.5, 0.02, 0.01, 12.0)); // PHASER_RATE
        debug_assert_eq!(params.len(), param::COUNT);

        let impulse = curves::reverb_impulse(fs, 1.2, 2.5, seed);
        debug!(target: "graph::build", fs, hop = time.hop, ir_len = impulse.len(), "graph built");

        Self {
            time,
            params,
            osc_a: Oscillator::new(Waveform::Sawtooth),
            osc_b: Oscillator::new(Waveform::Square),
            sub_osc: Oscillator::new(Waveform::Sine),
            lowpass: Biquad::new(FilterMode::Lowpass, 1200.0, 0.9, fs),
            highpass: Biquad::new(FilterMode::Highpass, 20.0, 0.707, fs),
            sweep: Biquad::new(FilterMode::Bandpass, 800.0, 2.0, fs),
            shaper_drive: Waveshaper::new(curves::drive_curve(CURVE_LEN, 0.0)),
            shaper_fold: Waveshaper::new(curves::fold_curve(CURVE_LEN, 1.0)),
            shaper_crush: Waveshaper::new(curves::bitcrush_curve(CURVE_LEN, 5)),
            delay: Delay::new(1.0, fs),
            chorus: Chorus::new(fs),
            phaser: Phaser::new(),
            reverb: Convolver::new(&impulse, time.hop),
            compressor: Compressor::new(0.5, 3.0, 5.0, 80.0, fs),
            tap: AnalysisTap::new(),
            drum_voices: Vec::new(),
            drum_kit: DrumKit::default(),
            noise_seed: seed,
            reverb_send: vec![0.0; time.hop],
            reverb_out: vec![0.0; time.hop],
        }
    }

    pub fn timebase(&self) -> Timebase {
        self.time
    }

    pub fn value(&self, id: ParamId) -> f32 {
        self.params[id.0].value()
    }

    pub fn target(&self, id: ParamId) -> f32 {
        self.params[id.0].target()
    }

    pub fn steady(&self, id: ParamId) -> f32 {
        self.params[id.0].steady()
    }

    pub fn set_steady(&mut self, id: ParamId, value: f32) {
        self.params[id.0].set_steady(value);
    }

    pub fn set_tau(&mut self, id: ParamId, tau_sec: f32) {
        self.params[id.0].set_tau(tau_sec);
    }

    pub fn schedule(&mut self, id: ParamId, at_tick: Tick, value: f32, tau_sec: Option<f32>) {
        self.params[id.0].schedule(at_tick, value, tau_sec);
    }

    pub fn schedule_override(
        &mut self,
        id: ParamId,
        at_tick: Tick,
        value: f32,
        tau_sec: Option<f32>,
        revert_at: Tick,
    ) {
        self.params[id.0].schedule_override(at_tick, value, tau_sec, revert_at);
    }

    pub fn set_oscillator_waves(&mut self, a: Waveform, b: Waveform) {
        self.osc_a.wave = a;
        self.osc_b.wave = b;
    }

    /// Rebuilds the drive transfer. Called from `set_params`, never from the
    /// render loop.
    pub fn set_drive_curve_amount(&mut self, amount: f32) {
        self.shaper_drive
            .set_table(curves::drive_curve(CURVE_LEN, amount.max(0.0)));
    }

    pub fn set_drum_kit(&mut self, kit: DrumKit) {
        self.drum_kit = kit;
    }

    pub fn drum_kit(&self) -> DrumKit {
        self.drum_kit
    }

    /// Schedules a one-shot drum voice. Each call gets a fresh noise seed so
    /// no two hits share a noise sequence.
    pub fn trigger_drum(&mut self, lane: DrumLane, at_tick: Tick) {
        self.noise_seed = self.noise_seed.wrapping_mul(6364136223846793005).wrapping_add(1);
        let voice = DrumVoice::new(lane, at_tick, self.drum_kit, self.time, self.noise_seed);
        debug!(target: "graph::drum", ?lane, at_tick, "trigger");
        self.drum_voices.push(voice);
    }

    pub fn active_drum_voices(&self) -> usize {
        self.drum_voices.len()
    }

    /// Drops voices and pending sends so an idled engine restarts clean.
    pub fn quiesce(&mut self) {
        self.drum_voices.clear();
        self.reverb_send.fill(0.0);
        self.reverb_out.fill(0.0);
    }

    /// Renders one hop starting at `now`. Scheduled parameter changes apply
    /// on their exact tick inside this loop, which is what makes coarse
    /// scheduler polling sample-accurate.
    pub fn render(&mut self, now: Tick, out: &mut [f32]) {
        let hop = self.time.hop;
        debug_assert_eq!(out.len(), hop);
        let fs = self.time.fs;

        // Previous block's send becomes this block's reverb tail.
        let mut send = std::mem::take(&mut self.reverb_send);
        self.reverb.process(&send, &mut self.reverb_out);
        send.fill(0.0);

        self.drum_voices.retain(|v| !v.is_done(now));

        for (i, slot) in out.iter_mut().enumerate() {
            let tick = now.saturating_add(i as Tick);
            for p in self.params.iter_mut() {
                p.apply_due(tick);
                p.tick();
            }

            let base = self.params[param::OSC_FREQ.0].value();
            let bend = self.params[param::PITCH_BEND.0].value();
            let spread = self.params[param::OSC_SPREAD.0].value();
            let freq = base * (bend / 12.0).exp2();
            let a = self.osc_a.tick(freq * (1.0 + spread), fs);
            let b = self.osc_b.tick(freq * (1.0 - spread), fs);
            let sub = self.sub_osc.tick(freq * 0.5, fs) * self.params[param::SUB_GAIN.0].value();
            let mut synth = (a + b) * 0.5 + sub;

            self.lowpass.retune(
                FilterMode::Lowpass,
                self.params[param::FILTER_CUTOFF.0].value(),
                self.params[param::FILTER_Q.0].value(),
                fs,
            );
            synth = self.lowpass.tick(synth);

            let sweep_mode = self.params[param::SWEEP_MODE.0].value().round();
            if sweep_mode >= SWEEP_BANDPASS {
                let mode = if sweep_mode >= SWEEP_NOTCH {
                    FilterMode::Notch
                } else {
                    FilterMode::Bandpass
                };
                self.sweep
                    .retune(mode, self.params[param::SWEEP_FREQ.0].value(), 2.0, fs);
                synth = self.sweep.tick(synth);
            }

            self.highpass.retune(
                FilterMode::Highpass,
                self.params[param::HP_CUTOFF.0].value(),
                0.707,
                fs,
            );
            synth = self.highpass.tick(synth);

            let driven = (synth * self.params[param::DRIVE_GAIN.0].value()).clamp(-1.0, 1.0);
            let curve = self.params[param::SHAPER_CURVE.0].value().round();
            synth = if curve >= CURVE_CRUSH {
                self.shaper_crush.tick(driven)
            } else if curve >= CURVE_FOLD {
                self.shaper_fold.tick(driven)
            } else {
                self.shaper_drive.tick(driven)
            };

            synth *= self.params[param::SYNTH_GAIN.0].value();
            synth *= self.params[param::GATE_GAIN.0].value();

            // Sends are taken post-gate so the gate chops the tails' feed
            // with the dry signal.
            let delay_in = synth * self.params[param::DELAY_WET.0].value();
            let delay_samples = self.params[param::DELAY_TIME.0].value() * fs;
            let delay_out = self.delay.tick(
                delay_in,
                delay_samples,
                self.params[param::DELAY_FEEDBACK.0].value(),
            );
            let chorus_out =
                self.chorus.tick(synth, fs) * self.params[param::CHORUS_WET.0].value();
            let phaser_out = self
                .phaser
                .tick(synth, self.params[param::PHASER_RATE.0].value(), fs)
                * self.params[param::PHASER_WET.0].value();
            send[i] = synth * self.params[param::REVERB_WET.0].value();

            let mut drums = 0.0;
            for voice in self.drum_voices.iter_mut() {
                drums += voice.render_tick(tick, fs);
            }
            drums *= self.params[param::DRUM_GAIN.0].value();

            let mix = synth + delay_out + chorus_out + phaser_out + self.reverb_out[i] + drums;
            let master = self.compressor.tick(mix * self.params[param::MASTER_GAIN.0].value());
            self.tap.push(master);
            *slot = master;
        }

        self.reverb_send = send;
    }

    pub fn analysis_window(&self) -> Vec<f32> {
        self.tap.window()
    }
}
