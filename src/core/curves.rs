use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Static lookup tables consumed by the signal graph at build time and by
/// effect macros at trigger time.

/// Symmetric tanh-family drive curve over [-1, 1].
pub fn drive_curve(len: usize, amount: f32) -> Vec<f32> {
    let len = len.max(2);
    let k = amount.max(0.0);
    (0..len)
        .map(|i| {
            let x = (i as f32 / (len - 1) as f32) * 2.0 - 1.0;
            ((1.0 + k) * x) / (1.0 + k * x.abs())
        })
        .collect()
}

/// Wavefolder transfer: sine folding that hardens with `amount`.
pub fn fold_curve(len: usize, amount: f32) -> Vec<f32> {
    let len = len.max(2);
    let depth = 1.0 + amount.max(0.0) * 3.0;
    (0..len)
        .map(|i| {
            let x = (i as f32 / (len - 1) as f32) * 2.0 - 1.0;
            (x * depth * std::f32::consts::FRAC_PI_2).sin()
        })
        .collect()
}

/// Staircase transfer used by the temporary bit-reduction macro.
pub fn bitcrush_curve(len: usize, bits: u32) -> Vec<f32> {
    let len = len.max(2);
    let levels = (1u32 << bits.clamp(1, 16)) as f32;
    (0..len)
        .map(|i| {
            let x = (i as f32 / (len - 1) as f32) * 2.0 - 1.0;
            (x * levels * 0.5).round() / (levels * 0.5)
        })
        .collect()
}

/// Exponentially decaying noise impulse used by the convolution reverb.
/// Deterministic for a given seed.
pub fn reverb_impulse(fs: f32, seconds: f32, decay: f32, seed: u64) -> Vec<f32> {
    let n = ((fs * seconds.max(0.01)) as usize).max(1);
    let mut rng = SmallRng::seed_from_u64(seed);
    (0..n)
        .map(|i| {
            let t = i as f32 / n as f32;
            let env = (1.0 - t).powf(decay.max(0.1));
            (rng.random::<f32>() * 2.0 - 1.0) * env
        })
        .collect()
}

/// Fresh white noise. Every drum trigger draws its own sequence; a shared
/// buffer loops audibly on fast hihat patterns.
pub fn noise_buffer(len: usize, rng: &mut SmallRng) -> Vec<f32> {
    (0..len).map(|_| rng.random::<f32>() * 2.0 - 1.0).collect()
}
