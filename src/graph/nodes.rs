use std::f32::consts::{PI, TAU};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Waveform {
    Sine,
    Triangle,
    #[default]
    Sawtooth,
    Square,
}

impl Waveform {
    pub fn from_name(name: &str) -> Self {
        match name {
            "sine" => Self::Sine,
            "triangle" => Self::Triangle,
            "square" => Self::Square,
            _ => Self::Sawtooth,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Oscillator {
    pub wave: Waveform,
    phase: f32,
}

impl Oscillator {
    pub fn new(wave: Waveform) -> Self {
        Self { wave, phase: 0.0 }
    }

    pub fn tick(&mut self, freq_hz: f32, fs: f32) -> f32 {
        let out = match self.wave {
            Waveform::Sine => (self.phase * TAU).sin(),
            Waveform::Triangle => 1.0 - 4.0 * (self.phase - 0.5).abs(),
            Waveform::Sawtooth => 2.0 * self.phase - 1.0,
            Waveform::Square => {
                if self.phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
        };
        self.phase += freq_hz.max(0.0) / fs;
        if self.phase >= 1.0 {
            self.phase -= self.phase.floor();
        }
        out
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterMode {
    Lowpass,
    Highpass,
    Bandpass,
    Notch,
}

/// RBJ biquad. Coefficients are recomputed when the control inputs move;
/// state is preserved across retunes so sweeps stay continuous.
#[derive(Clone, Copy, Debug)]
pub struct Biquad {
    mode: FilterMode,
    freq_hz: f32,
    q: f32,
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    z1: f32,
    z2: f32,
}

impl Biquad {
    pub fn new(mode: FilterMode, freq_hz: f32, q: f32, fs: f32) -> Self {
        let mut f = Self {
            mode,
            freq_hz: 0.0,
            q: 0.0,
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            z1: 0.0,
            z2: 0.0,
        };
        f.retune(mode, freq_hz, q, fs);
        f
    }

    pub fn retune(&mut self, mode: FilterMode, freq_hz: f32, q: f32, fs: f32) {
        let freq_hz = freq_hz.clamp(10.0, fs * 0.45);
        let q = q.clamp(0.1, 30.0);
        if mode == self.mode && (freq_hz - self.freq_hz).abs() < 1e-3 && (q - self.q).abs() < 1e-4 {
            return;
        }
        self.mode = mode;
        self.freq_hz = freq_hz;
        self.q = q;

        let w0 = TAU * freq_hz / fs;
        let (sin_w0, cos_w0) = w0.sin_cos();
        let alpha = sin_w0 / (2.0 * q);
        let a0 = 1.0 + alpha;
        let a0_inv = 1.0 / a0;
        match mode {
            FilterMode::Lowpass => {
                let b1 = 1.0 - cos_w0;
                self.b0 = b1 * 0.5 * a0_inv;
                self.b1 = b1 * a0_inv;
                self.b2 = self.b0;
            }
            FilterMode::Highpass => {
                let b1 = 1.0 + cos_w0;
                self.b0 = b1 * 0.5 * a0_inv;
                self.b1 = -b1 * a0_inv;
                self.b2 = self.b0;
            }
            FilterMode::Bandpass => {
                self.b0 = alpha * a0_inv;
                self.b1 = 0.0;
                self.b2 = -alpha * a0_inv;
            }
            FilterMode::Notch => {
                self.b0 = a0_inv;
                self.b1 = -2.0 * cos_w0 * a0_inv;
                self.b2 = a0_inv;
            }
        }
        self.a1 = -2.0 * cos_w0 * a0_inv;
        self.a2 = (1.0 - alpha) * a0_inv;
    }

    pub fn tick(&mut self, x: f32) -> f32 {
        // Transposed direct form II.
        let y = self.b0 * x + self.z1;
        self.z1 = self.b1 * x - self.a1 * y + self.z2;
        self.z2 = self.b2 * x - self.a2 * y;
        y
    }
}

/// Table-lookup waveshaper with linear interpolation.
#[derive(Clone, Debug)]
pub struct Waveshaper {
    table: Vec<f32>,
}

impl Waveshaper {
    pub fn new(table: Vec<f32>) -> Self {
        let table = if table.len() >= 2 { table } else { vec![-1.0, 1.0] };
        Self { table }
    }

    pub fn set_table(&mut self, table: Vec<f32>) {
        if table.len() >= 2 {
            self.table = table;
        }
    }

    pub fn tick(&self, x: f32) -> f32 {
        let n = self.table.len();
        let pos = (x.clamp(-1.0, 1.0) * 0.5 + 0.5) * (n - 1) as f32;
        let idx = (pos as usize).min(n - 2);
        let frac = pos - idx as f32;
        self.table[idx] * (1.0 - frac) + self.table[idx + 1] * frac
    }
}

/// Feedback delay line with a smoothly movable read head.
#[derive(Clone, Debug)]
pub struct Delay {
    buf: Vec<f32>,
    write: usize,
}

impl Delay {
    pub fn new(max_sec: f32, fs: f32) -> Self {
        let len = ((max_sec.max(0.01) * fs) as usize).max(16);
        Self {
            buf: vec![0.0; len],
            write: 0,
        }
    }

    pub fn tick(&mut self, x: f32, delay_samples: f32, feedback: f32) -> f32 {
        let len = self.buf.len();
        let delay = delay_samples.clamp(1.0, (len - 2) as f32);
        let read_pos = (self.write as f32 - delay).rem_euclid(len as f32);
        let idx = read_pos as usize;
        let frac = read_pos - idx as f32;
        let a = self.buf[idx];
        let b = self.buf[(idx + 1) % len];
        let out = a * (1.0 - frac) + b * frac;
        self.buf[self.write] = x + out * feedback.clamp(-0.98, 0.98);
        self.write = (self.write + 1) % len;
        out
    }
}

/// Chorus: short modulated delay mixed against the dry path.
#[derive(Clone, Debug)]
pub struct Chorus {
    delay: Delay,
    lfo_phase: f32,
}

impl Chorus {
    pub fn new(fs: f32) -> Self {
        Self {
            delay: Delay::new(0.05, fs),
            lfo_phase: 0.0,
        }
    }

    pub fn tick(&mut self, x: f32, fs: f32) -> f32 {
        let rate_hz = 0.6;
        let base = 0.018 * fs;
        let depth = 0.006 * fs;
        let mod_samples = base + depth * (self.lfo_phase * TAU).sin();
        self.lfo_phase = (self.lfo_phase + rate_hz / fs).fract();
        self.delay.tick(x, mod_samples, 0.15)
    }
}

/// Four-stage phaser.
#[derive(Clone, Copy, Debug)]
pub struct Phaser {
    stages: [f32; 4],
    lfo_phase: f32,
}

impl Phaser {
    pub fn new() -> Self {
        Self {
            stages: [0.0; 4],
            lfo_phase: 0.0,
        }
    }

    pub fn tick(&mut self, x: f32, rate_hz: f32, fs: f32) -> f32 {
        let sweep = 400.0 + 1200.0 * (0.5 + 0.5 * (self.lfo_phase * TAU).sin());
        self.lfo_phase = (self.lfo_phase + rate_hz.clamp(0.01, 20.0) / fs).fract();
        let w = (PI * sweep / fs).tan();
        let a = (w - 1.0) / (w + 1.0);
        let mut y = x;
        for z in self.stages.iter_mut() {
            let out = a * y + *z;
            *z = y - a * out;
            y = out;
        }
        y
    }
}

impl Default for Phaser {
    fn default() -> Self {
        Self::new()
    }
}

/// Feed-forward bus compressor with an envelope follower gain computer.
#[derive(Clone, Copy, Debug)]
pub struct Compressor {
    threshold: f32,
    ratio: f32,
    attack_alpha: f32,
    release_alpha: f32,
    env: f32,
}

impl Compressor {
    pub fn new(threshold: f32, ratio: f32, attack_ms: f32, release_ms: f32, fs: f32) -> Self {
        let alpha = |ms: f32| 1.0 - (-1.0 / (ms.max(0.01) * 0.001 * fs)).exp();
        Self {
            threshold: threshold.clamp(0.01, 1.0),
            ratio: ratio.max(1.0),
            attack_alpha: alpha(attack_ms),
            release_alpha: alpha(release_ms),
            env: 0.0,
        }
    }

    pub fn tick(&mut self, x: f32) -> f32 {
        let level = x.abs();
        let alpha = if level > self.env {
            self.attack_alpha
        } else {
            self.release_alpha
        };
        self.env += (level - self.env) * alpha;
        if self.env <= self.threshold {
            return x;
        }
        let over = self.env / self.threshold;
        let gain = over.powf(1.0 / self.ratio - 1.0);
        x * gain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oscillator_sine_is_periodic() {
        let fs = 1000.0;
        let mut osc = Oscillator::new(Waveform::Sine);
        let first: Vec<f32> = (0..100).map(|_| osc.tick(10.0, fs)).collect();
        let second: Vec<f32> = (0..100).map(|_| osc.tick(10.0, fs)).collect();
        for (a, b) in first.iter().zip(second.iter()) {
            assert!((a - b).abs() < 1e-4);
        }
    }

    #[test]
    fn lowpass_attenuates_high_frequency() {
        let fs = 48_000.0;
        let mut f = Biquad::new(FilterMode::Lowpass, 500.0, 0.707, fs);
        let mut osc = Oscillator::new(Waveform::Sine);
        let mut power_in = 0.0;
        let mut power_out = 0.0;
        for _ in 0..4800 {
            let x = osc.tick(8000.0, fs);
            let y = f.tick(x);
            power_in += x * x;
            power_out += y * y;
        }
        assert!(power_out < power_in * 0.05);
    }

    #[test]
    fn waveshaper_interpolates_identity() {
        let table: Vec<f32> = (0..65).map(|i| i as f32 / 32.0 - 1.0).collect();
        let shaper = Waveshaper::new(table);
        for &x in &[-1.0, -0.37, 0.0, 0.2, 0.99] {
            assert!((shaper.tick(x) - x).abs() < 1e-3, "x={x}");
        }
    }

    #[test]
    fn delay_returns_input_after_delay_time() {
        let fs = 1000.0;
        let mut d = Delay::new(0.5, fs);
        let mut out = Vec::new();
        for i in 0..30 {
            let x = if i == 0 { 1.0 } else { 0.0 };
            out.push(d.tick(x, 10.0, 0.0));
        }
        let peak = out
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.abs().partial_cmp(&b.1.abs()).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(i, _)| i)
            .unwrap_or(0);
        assert_eq!(peak, 10);
    }

    #[test]
    fn compressor_reduces_loud_signal() {
        let mut c = Compressor::new(0.25, 4.0, 1.0, 50.0, 1000.0);
        let mut out = 0.0;
        for _ in 0..200 {
            out = c.tick(1.0);
        }
        assert!(out < 1.0);
        assert!(out > 0.2);
    }
}
