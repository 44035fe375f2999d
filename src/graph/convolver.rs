use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

/// Uniform partitioned convolution (overlap-save with a frequency-domain
/// delay line). The impulse is chopped into hop-sized partitions at build
/// time; each processed block costs one FFT, one IFFT, and a
/// multiply-accumulate over the partitions.
pub struct Convolver {
    block: usize,
    fft: Arc<dyn Fft<f32>>,
    ifft: Arc<dyn Fft<f32>>,
    partitions: Vec<Vec<Complex<f32>>>,
    fdl: Vec<Vec<Complex<f32>>>,
    fdl_pos: usize,
    prev_input: Vec<f32>,
    scratch: Vec<Complex<f32>>,
    acc: Vec<Complex<f32>>,
}

impl Convolver {
    pub fn new(impulse: &[f32], block: usize) -> Self {
        let block = block.max(16);
        let n = block * 2;
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(n);
        let ifft = planner.plan_fft_inverse(n);

        let n_parts = impulse.len().div_ceil(block).max(1);
        let mut partitions = Vec::with_capacity(n_parts);
        for p in 0..n_parts {
            let start = p * block;
            let end = (start + block).min(impulse.len());
            let mut buf = vec![Complex::new(0.0, 0.0); n];
            for (i, &s) in impulse[start..end].iter().enumerate() {
                buf[i] = Complex::new(s, 0.0);
            }
            fft.process(&mut buf);
            partitions.push(buf);
        }

        let fdl = vec![vec![Complex::new(0.0, 0.0); n]; n_parts];
        Self {
            block,
            fft,
            ifft,
            partitions,
            fdl,
            fdl_pos: 0,
            prev_input: vec![0.0; block],
            scratch: vec![Complex::new(0.0, 0.0); n],
            acc: vec![Complex::new(0.0, 0.0); n],
        }
    }

    /// Convolve one block. `input.len() == output.len() == block`.
    pub fn process(&mut self, input: &[f32], output: &mut [f32]) {
        debug_assert_eq!(input.len(), self.block);
        debug_assert_eq!(output.len(), self.block);
        let n = self.block * 2;

        for (i, c) in self.scratch.iter_mut().enumerate() {
            let s = if i < self.block {
                self.prev_input[i]
            } else {
                input[i - self.block]
            };
            *c = Complex::new(s, 0.0);
        }
        self.prev_input.copy_from_slice(input);
        self.fft.process(&mut self.scratch);

        self.fdl_pos = (self.fdl_pos + self.fdl.len() - 1) % self.fdl.len();
        self.fdl[self.fdl_pos].copy_from_slice(&self.scratch);

        for c in self.acc.iter_mut() {
            *c = Complex::new(0.0, 0.0);
        }
        for (p, part) in self.partitions.iter().enumerate() {
            let slot = &self.fdl[(self.fdl_pos + p) % self.fdl.len()];
            for i in 0..n {
                self.acc[i] += slot[i] * part[i];
            }
        }
        self.ifft.process(&mut self.acc);

        // Overlap-save: the second half is the valid output.
        let scale = 1.0 / n as f32;
        for (i, out) in output.iter_mut().enumerate() {
            *out = self.acc[self.block + i].re * scale;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn direct_convolve(x: &[f32], h: &[f32], len: usize) -> Vec<f32> {
        let mut out = vec![0.0f32; len];
        for (i, o) in out.iter_mut().enumerate() {
            for (j, &hj) in h.iter().enumerate() {
                if i >= j && i - j < x.len() {
                    *o += x[i - j] * hj;
                }
            }
        }
        out
    }

    #[test]
    fn matches_direct_convolution() {
        let block = 32;
        let impulse: Vec<f32> = (0..80).map(|i| (0.9f32).powi(i) * if i % 3 == 0 { 1.0 } else { -0.5 }).collect();
        let mut conv = Convolver::new(&impulse, block);
        let input: Vec<f32> = (0..128).map(|i| ((i * 7) % 13) as f32 / 13.0 - 0.5).collect();

        let mut got = Vec::new();
        for chunk in input.chunks(block) {
            let mut out = vec![0.0; block];
            conv.process(chunk, &mut out);
            got.extend_from_slice(&out);
        }
        let want = direct_convolve(&input, &impulse, got.len());
        for (g, w) in got.iter().zip(want.iter()) {
            assert!((g - w).abs() < 1e-3, "got={g} want={w}");
        }
    }

    #[test]
    fn unit_impulse_response_passes_input() {
        let block = 16;
        let mut conv = Convolver::new(&[1.0], block);
        let input: Vec<f32> = (0..16).map(|i| i as f32).collect();
        let mut out = vec![0.0; block];
        conv.process(&input, &mut out);
        for (i, (a, b)) in input.iter().zip(out.iter()).enumerate() {
            assert!((a - b).abs() < 1e-4, "i={i}");
        }
    }
}
