use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

/// Rolling tap on the master bus feeding the telemetry snapshot.
#[derive(Clone, Debug)]
pub struct AnalysisTap {
    ring: Vec<f32>,
    write: usize,
}

pub const ANALYSIS_WINDOW: usize = 1024;

impl AnalysisTap {
    pub fn new() -> Self {
        Self {
            ring: vec![0.0; ANALYSIS_WINDOW],
            write: 0,
        }
    }

    pub fn push(&mut self, sample: f32) {
        self.ring[self.write] = sample;
        self.write = (self.write + 1) % self.ring.len();
    }

    /// Oldest-first copy of the window.
    pub fn window(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.ring.len());
        out.extend_from_slice(&self.ring[self.write..]);
        out.extend_from_slice(&self.ring[..self.write]);
        out
    }
}

impl Default for AnalysisTap {
    fn default() -> Self {
        Self::new()
    }
}

/// Hann-windowed magnitude spectrum of a time-domain window. Runs on the
/// caller's thread; the audio thread only fills the tap.
pub fn magnitude_spectrum(window: &[f32]) -> Vec<f32> {
    if window.is_empty() {
        return Vec::new();
    }
    let n = window.len();
    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(n);
    let mut buf: Vec<Complex<f32>> = window
        .iter()
        .enumerate()
        .map(|(i, &s)| {
            let w = 0.5 - 0.5 * (std::f32::consts::TAU * i as f32 / n as f32).cos();
            Complex::new(s * w, 0.0)
        })
        .collect();
    fft.process(&mut buf);
    let scale = 2.0 / n as f32;
    buf[..n / 2].iter().map(|c| c.norm() * scale).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spectrum_peaks_at_signal_bin() {
        let n = 1024;
        let bin = 32;
        let window: Vec<f32> = (0..n)
            .map(|i| (std::f32::consts::TAU * bin as f32 * i as f32 / n as f32).sin())
            .collect();
        let mags = magnitude_spectrum(&window);
        let peak = mags
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(i, _)| i)
            .unwrap_or(0);
        assert_eq!(peak, bin);
    }

    #[test]
    fn tap_window_is_oldest_first() {
        let mut tap = AnalysisTap::new();
        for i in 0..(ANALYSIS_WINDOW + 3) {
            tap.push(i as f32);
        }
        let w = tap.window();
        assert_eq!(w[0], 3.0);
        assert_eq!(w[ANALYSIS_WINDOW - 1], (ANALYSIS_WINDOW + 2) as f32);
    }
}
