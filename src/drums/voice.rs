use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::core::timebase::{Tick, Timebase};
use crate::drums::kit::{DrumKit, KitParams};
use crate::graph::nodes::{Biquad, FilterMode};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DrumLane {
    Kick,
    Snare,
    Hihat,
    Clap,
}

pub const DRUM_LANES: [DrumLane; 4] = [
    DrumLane::Kick,
    DrumLane::Snare,
    DrumLane::Hihat,
    DrumLane::Clap,
];

const DONE_LEVEL: f32 = 1e-4;

enum VoiceKind {
    Kick {
        phase: f32,
        pitch_env: f32,
    },
    Snare {
        tone_phase: f32,
        band: Biquad,
        rng: SmallRng,
    },
    Hihat {
        hp: Biquad,
        rng: SmallRng,
    },
    Clap {
        band: Biquad,
        rng: SmallRng,
    },
}

/// One-shot drum voice. Independent of every other voice; starts at its
/// onset tick and removes itself once the envelope has decayed.
pub struct DrumVoice {
    lane: DrumLane,
    onset: Tick,
    params: KitParams,
    kind: VoiceKind,
    env: f32,
    env_decay: f32,
    elapsed_sec: f32,
    started: bool,
}

impl DrumVoice {
    /// `seed` individualizes the noise of this trigger; callers pass a fresh
    /// value every time so no two hits share a noise sequence.
    pub fn new(lane: DrumLane, onset: Tick, kit: DrumKit, time: Timebase, seed: u64) -> Self {
        let params = KitParams::for_kit(kit);
        let fs = time.fs;
        let decay_sec = match lane {
            DrumLane::Kick => params.kick.amp_decay_sec,
            DrumLane::Snare => params.snare.decay_sec,
            DrumLane::Hihat => params.hihat.decay_sec,
            DrumLane::Clap => params.clap.decay_sec,
        };
        // Per-sample multiplier for a ~60 dB fall over the decay time.
        let env_decay = (-6.9 / (decay_sec.max(0.005) * fs)).exp();
        let kind = match lane {
            DrumLane::Kick => VoiceKind::Kick {
                phase: 0.0,
                pitch_env: 1.0,
            },
            DrumLane::Snare => VoiceKind::Snare {
                tone_phase: 0.0,
                band: Biquad::new(
                    FilterMode::Bandpass,
                    params.snare.band_hz,
                    params.snare.band_q,
                    fs,
                ),
                rng: SmallRng::seed_from_u64(seed),
            },
            DrumLane::Hihat => VoiceKind::Hihat {
                hp: Biquad::new(FilterMode::Highpass, params.hihat.hp_hz, 0.707, fs),
                rng: SmallRng::seed_from_u64(seed),
            },
            DrumLane::Clap => VoiceKind::Clap {
                band: Biquad::new(
                    FilterMode::Bandpass,
                    params.clap.band_hz,
                    params.clap.band_q,
                    fs,
                ),
                rng: SmallRng::seed_from_u64(seed),
            },
        };
        Self {
            lane,
            onset,
            params,
            kind,
            env: 1.0,
            env_decay,
            elapsed_sec: 0.0,
            started: false,
        }
    }

    pub fn lane(&self) -> DrumLane {
        self.lane
    }

    pub fn onset(&self) -> Tick {
        self.onset
    }

    pub fn is_done(&self, now: Tick) -> bool {
        now > self.onset && self.started && self.env < DONE_LEVEL
    }

    pub fn render_tick(&mut self, tick: Tick, fs: f32) -> f32 {
        if tick < self.onset {
            return 0.0;
        }
        self.started = true;
        let dt = 1.0 / fs;
        let out = match &mut self.kind {
            VoiceKind::Kick { phase, pitch_env } => {
                let p = self.params.kick;
                let freq = p.end_hz + (p.start_hz - p.end_hz) * *pitch_env;
                *pitch_env *= (-dt / p.pitch_decay_sec.max(0.001)).exp();
                let body = (*phase * std::f32::consts::TAU).sin();
                *phase = (*phase + freq * dt).fract();
                let click = if self.elapsed_sec < 0.004 { p.click } else { 0.0 };
                (body + click) * p.gain
            }
            VoiceKind::Snare { tone_phase, band, rng } => {
                let p = self.params.snare;
                let noise = rng.random::<f32>() * 2.0 - 1.0;
                let rattle = band.tick(noise);
                let tone = (*tone_phase * std::f32::consts::TAU).sin();
                *tone_phase = (*tone_phase + p.tone_hz * dt).fract();
                (rattle * (1.0 - p.tone_mix) + tone * p.tone_mix) * p.gain
            }
            VoiceKind::Hihat { hp, rng } => {
                let p = self.params.hihat;
                let noise = rng.random::<f32>() * 2.0 - 1.0;
                hp.tick(noise) * p.gain
            }
            VoiceKind::Clap { band, rng } => {
                let p = self.params.clap;
                // Staggered bursts: the envelope restarts at each burst
                // boundary, then the last burst rings out.
                let burst = (self.elapsed_sec / p.burst_spacing_sec.max(0.001)) as u32;
                let burst_env = if burst < p.bursts {
                    let in_burst = self.elapsed_sec - burst as f32 * p.burst_spacing_sec;
                    (-in_burst * 120.0).exp()
                } else {
                    1.0
                };
                let noise = rng.random::<f32>() * 2.0 - 1.0;
                band.tick(noise) * burst_env * p.gain
            }
        };
        self.elapsed_sec += dt;
        let shaped = out * self.env;
        self.env *= self.env_decay;
        shaped
    }
}
