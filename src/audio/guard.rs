use std::env;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SoftClipParams {
    pub ceiling: f32,
    pub drive: f32,
}

impl Default for SoftClipParams {
    fn default() -> Self {
        Self {
            ceiling: 0.98,
            drive: 2.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct PeakLimiterParams {
    pub ceiling: f32,
    pub attack_ms: f32,
    pub release_ms: f32,
}

impl Default for PeakLimiterParams {
    fn default() -> Self {
        Self {
            ceiling: 0.98,
            attack_ms: 0.5,
            release_ms: 50.0,
        }
    }
}

/// Last line of defense on the mono output path. Applied after the graph's
/// compressor, on both the device feed and the recording tee.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "mode")]
pub enum OutputGuardMode {
    None,
    SoftClip(SoftClipParams),
    PeakLimiter(PeakLimiterParams),
}

impl Default for OutputGuardMode {
    fn default() -> Self {
        Self::PeakLimiter(PeakLimiterParams::default())
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct OutputGuardStats {
    pub max_abs_in: f32,
    pub max_abs_out: f32,
    pub max_reduction_db: f32,
    pub num_over: u64,
}

/// Lock-free engagement counters, readable from any thread.
#[derive(Debug, Default)]
pub struct OutputGuardMeter {
    engaged_count: AtomicU64,
    over_count: AtomicU64,
    max_reduction_bits: AtomicU32,
    max_abs_in_bits: AtomicU32,
    max_abs_out_bits: AtomicU32,
}

impl OutputGuardMeter {
    pub fn record(&self, stats: &OutputGuardStats) {
        if stats.num_over == 0 && stats.max_reduction_db <= 0.0 {
            return;
        }
        self.engaged_count.fetch_add(1, Ordering::Relaxed);
        if stats.num_over > 0 {
            self.over_count.fetch_add(stats.num_over, Ordering::Relaxed);
        }
        self.max_reduction_bits
            .store(stats.max_reduction_db.to_bits(), Ordering::Relaxed);
        self.max_abs_in_bits
            .store(stats.max_abs_in.to_bits(), Ordering::Relaxed);
        self.max_abs_out_bits
            .store(stats.max_abs_out.to_bits(), Ordering::Relaxed);
    }

    pub fn take_snapshot(&self) -> Option<OutputGuardStats> {
        let engaged = self.engaged_count.swap(0, Ordering::Relaxed);
        if engaged == 0 {
            return None;
        }
        let num_over = self.over_count.swap(0, Ordering::Relaxed);
        Some(OutputGuardStats {
            max_abs_in: f32::from_bits(self.max_abs_in_bits.swap(0, Ordering::Relaxed)),
            max_abs_out: f32::from_bits(self.max_abs_out_bits.swap(0, Ordering::Relaxed)),
            max_reduction_db: f32::from_bits(self.max_reduction_bits.swap(0, Ordering::Relaxed)),
            num_over,
        })
    }
}

#[derive(Debug)]
struct PeakLimiterState {
    gain: f32,
    attack_coeff: f32,
    release_coeff: f32,
}

#[derive(Debug)]
pub struct OutputGuard {
    mode: OutputGuardMode,
    limiter_state: Option<PeakLimiterState>,
    stats: OutputGuardStats,
    meter: Option<Arc<OutputGuardMeter>>,
}

impl OutputGuard {
    pub fn new(mode: OutputGuardMode, sample_rate: u32) -> Self {
        let sample_rate = (sample_rate as f32).max(1.0);
        let limiter_state = match mode {
            OutputGuardMode::PeakLimiter(params) => Some(PeakLimiterState {
                gain: 1.0,
                attack_coeff: time_to_coeff(params.attack_ms, sample_rate),
                release_coeff: time_to_coeff(params.release_ms, sample_rate),
            }),
            _ => None,
        };
        Self {
            mode,
            limiter_state,
            stats: OutputGuardStats::default(),
            meter: None,
        }
    }

    pub fn with_meter(mut self, meter: Arc<OutputGuardMeter>) -> Self {
        self.meter = Some(meter);
        self
    }

    pub fn process_block(&mut self, samples: &mut [f32]) {
        if samples.is_empty() {
            return;
        }
        self.stats = OutputGuardStats::default();
        match self.mode {
            OutputGuardMode::None => {}
            OutputGuardMode::SoftClip(params) => {
                let ceiling = params.ceiling.abs().max(1e-6);
                let drive = params.drive.max(0.0);
                for s in samples.iter_mut() {
                    let x = if s.is_finite() { *s } else { 0.0 };
                    let abs_in = x.abs();
                    self.stats.max_abs_in = self.stats.max_abs_in.max(abs_in);
                    if abs_in > ceiling {
                        self.stats.num_over += 1;
                    }
                    let y = (x * drive).tanh() * ceiling;
                    self.stats.max_abs_out = self.stats.max_abs_out.max(y.abs());
                    update_reduction(&mut self.stats, abs_in, y.abs());
                    *s = y;
                }
            }
            OutputGuardMode::PeakLimiter(params) => {
                let ceiling = params.ceiling.abs().max(1e-6);
                let state = match self.limiter_state.as_mut() {
                    Some(s) => s,
                    None => return,
                };
                for s in samples.iter_mut() {
                    let x = if s.is_finite() { *s } else { 0.0 };
                    let abs_in = x.abs();
                    let target_gain = if abs_in > ceiling {
                        ceiling / abs_in
                    } else {
                        1.0
                    };
                    state.gain = smooth_gain(
                        state.gain,
                        target_gain,
                        state.attack_coeff,
                        state.release_coeff,
                    );
                    self.stats.max_abs_in = self.stats.max_abs_in.max(abs_in);
                    if abs_in > ceiling {
                        self.stats.num_over += 1;
                    }
                    let y = (x * state.gain).clamp(-ceiling, ceiling);
                    self.stats.max_abs_out = self.stats.max_abs_out.max(y.abs());
                    update_reduction(&mut self.stats, abs_in, y.abs());
                    *s = y;
                }
            }
        }
        if let Some(meter) = self.meter.as_ref() {
            meter.record(&self.stats);
        }
    }

    pub fn stats(&self) -> OutputGuardStats {
        self.stats
    }

    pub fn from_env_or(config_mode: OutputGuardMode) -> OutputGuardMode {
        mode_from_env().unwrap_or(config_mode)
    }
}

fn time_to_coeff(time_ms: f32, sample_rate: f32) -> f32 {
    let time_s = time_ms.max(0.0) * 0.001;
    if time_s <= 0.0 {
        0.0
    } else {
        (-1.0 / (time_s * sample_rate)).exp()
    }
}

fn smooth_gain(current: f32, target: f32, attack_coeff: f32, release_coeff: f32) -> f32 {
    if target < current {
        attack_coeff * current + (1.0 - attack_coeff) * target
    } else {
        release_coeff * current + (1.0 - release_coeff) * target
    }
}

fn update_reduction(stats: &mut OutputGuardStats, abs_in: f32, abs_out: f32) {
    if abs_in <= 1e-12 || abs_out <= 0.0 {
        return;
    }
    let ratio = abs_out / abs_in;
    if ratio <= 0.0 || ratio >= 1.0 {
        return;
    }
    let db = 20.0 * ratio.log10();
    if db.is_finite() && -db > stats.max_reduction_db {
        stats.max_reduction_db = -db;
    }
}

fn mode_from_env() -> Option<OutputGuardMode> {
    let value = env::var("OOBLECK_OUTPUT_GUARD").ok()?;
    match value.trim().to_ascii_lowercase().as_str() {
        "none" | "off" | "0" => Some(OutputGuardMode::None),
        "soft" | "softclip" => Some(OutputGuardMode::SoftClip(SoftClipParams::default())),
        "limiter" | "peak" | "peaklimiter" => {
            Some(OutputGuardMode::PeakLimiter(PeakLimiterParams::default()))
        }
        _ => None,
    }
}
