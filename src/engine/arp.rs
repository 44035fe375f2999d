use std::collections::VecDeque;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::core::timebase::Tick;
use crate::engine::settings::{ArpMode, ArpSettings};

/// Running state of the arpeggio resolver: a monotonically advancing index,
/// a seeded rng for the stochastic modes, and the windows of recently
/// scheduled notes (used by the modulation path to decide audibility).
pub struct ArpState {
    index: u64,
    brownian_pos: i64,
    rng: SmallRng,
    windows: VecDeque<(Tick, Tick)>,
}

impl ArpState {
    pub fn new(seed: u64) -> Self {
        Self {
            index: 0,
            brownian_pos: 0,
            rng: SmallRng::seed_from_u64(seed),
            windows: VecDeque::new(),
        }
    }

    /// Restart the pattern from its first step. Rng state is kept so a reset
    /// does not replay the same random walk.
    pub fn reset(&mut self) {
        self.index = 0;
        self.brownian_pos = 0;
    }

    /// Resolve the next note frequency and advance the index.
    ///
    /// The pattern is anchored at the smallest scale degree at or above
    /// `base_freq`; octave overflow wraps rather than clamping, so long
    /// patterns cycle through the octave range instead of pinning at the top.
    /// Degenerate inputs (empty scale, zero steps) fail soft to `base_freq`.
    pub fn resolve_next(&mut self, base_freq: f32, scale: &[f32], settings: &ArpSettings) -> f32 {
        if scale.is_empty() || settings.steps == 0 {
            return base_freq;
        }
        let steps = settings.steps as u64;
        let base = scale
            .iter()
            .position(|&f| f >= base_freq)
            .unwrap_or(0) as u64;

        let offset = match settings.mode {
            ArpMode::Up => self.index % steps,
            ArpMode::Down => (steps - 1) - (self.index % steps),
            ArpMode::UpDown => {
                if steps == 1 {
                    0
                } else {
                    let cycle = 2 * steps - 2;
                    let pos = self.index % cycle;
                    if pos < steps {
                        pos
                    } else {
                        cycle - pos
                    }
                }
            }
            ArpMode::Random => self.rng.random_range(0..steps),
            ArpMode::Brownian => {
                let delta: i64 = if self.rng.random::<bool>() { 1 } else { -1 };
                self.brownian_pos = (self.brownian_pos + delta).rem_euclid(steps as i64);
                self.brownian_pos as u64
            }
        };
        self.index = self.index.wrapping_add(1);

        let slot = base + offset;
        let idx = (slot % scale.len() as u64) as usize;
        let shift = (slot / scale.len() as u64) % (settings.octaves as u64 + 1);
        scale[idx] * (shift as f32).exp2()
    }

    /// Record a scheduled note's sounding interval.
    pub fn push_window(&mut self, at: Tick, end: Tick) {
        self.windows.push_back((at, end));
        while self.windows.len() > 64 {
            self.windows.pop_front();
        }
    }

    /// True when `now` falls inside any scheduled note window. Expired
    /// windows are dropped as a side effect.
    pub fn is_active(&mut self, now: Tick) -> bool {
        while let Some(&(_, end)) = self.windows.front() {
            if end < now {
                self.windows.pop_front();
            } else {
                break;
            }
        }
        self.windows.iter().any(|&(at, end)| at <= now && now <= end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(mode: ArpMode, steps: usize, octaves: u32) -> ArpSettings {
        ArpSettings {
            enabled: true,
            mode,
            steps,
            octaves,
            ..ArpSettings::default()
        }
    }

    fn scale() -> Vec<f32> {
        vec![110.0, 130.8, 146.8, 164.8, 196.0]
    }

    #[test]
    fn up_mode_walks_in_order() {
        let mut arp = ArpState::new(7);
        let s = settings(ArpMode::Up, 3, 0);
        let got: Vec<f32> = (0..6)
            .map(|_| arp.resolve_next(100.0, &scale(), &s))
            .collect();
        assert_eq!(got, vec![110.0, 130.8, 146.8, 110.0, 130.8, 146.8]);
    }

    #[test]
    fn down_mode_mirrors_up() {
        let mut arp = ArpState::new(7);
        let s = settings(ArpMode::Down, 3, 0);
        let got: Vec<f32> = (0..3)
            .map(|_| arp.resolve_next(100.0, &scale(), &s))
            .collect();
        assert_eq!(got, vec![146.8, 130.8, 110.0]);
    }

    #[test]
    fn updown_is_a_palindrome_without_repeated_endpoints() {
        let mut arp = ArpState::new(7);
        let s = settings(ArpMode::UpDown, 4, 0);
        // Cycle length 2*4-2 = 6.
        let got: Vec<f32> = (0..6)
            .map(|_| arp.resolve_next(100.0, &scale(), &s))
            .collect();
        assert_eq!(got, vec![110.0, 130.8, 146.8, 164.8, 146.8, 130.8]);
        assert_eq!(arp.resolve_next(100.0, &scale(), &s), 110.0);
    }

    #[test]
    fn single_step_pattern_is_constant() {
        for mode in [
            ArpMode::Up,
            ArpMode::Down,
            ArpMode::UpDown,
            ArpMode::Random,
            ArpMode::Brownian,
        ] {
            let mut arp = ArpState::new(7);
            let s = settings(mode, 1, 0);
            for _ in 0..4 {
                assert_eq!(arp.resolve_next(100.0, &scale(), &s), 110.0);
            }
        }
    }

    #[test]
    fn octave_overflow_wraps_instead_of_clamping() {
        let mut arp = ArpState::new(7);
        let s = settings(ArpMode::Up, 12, 1);
        let got: Vec<f32> = (0..12)
            .map(|_| arp.resolve_next(100.0, &scale(), &s))
            .collect();
        // Slots 0..4 at the base octave, 5..9 one octave up, 10..11 wrap back.
        assert_eq!(got[0], 110.0);
        assert_eq!(got[5], 220.0);
        assert_eq!(got[9], 392.0);
        assert_eq!(got[10], 110.0);
        assert_eq!(got[11], 130.8);
    }

    #[test]
    fn oversized_pattern_and_range_resolve_without_panicking() {
        // A long pattern over a small scale pushes the octave shift well
        // past anything a left shift on u32 could represent.
        let mut arp = ArpState::new(7);
        let s = settings(ArpMode::Up, 1000, 40);
        for _ in 0..1000 {
            let f = arp.resolve_next(100.0, &scale(), &s);
            assert!(f.is_finite() && f >= 110.0, "{f}");
        }
    }

    #[test]
    fn base_anchors_at_first_degree_at_or_above() {
        let mut arp = ArpState::new(7);
        let s = settings(ArpMode::Up, 2, 0);
        assert_eq!(arp.resolve_next(140.0, &scale(), &s), 146.8);
        assert_eq!(arp.resolve_next(140.0, &scale(), &s), 164.8);
    }

    #[test]
    fn degenerate_inputs_fail_soft_to_base() {
        let mut arp = ArpState::new(7);
        let s = settings(ArpMode::Up, 4, 0);
        assert_eq!(arp.resolve_next(220.0, &[], &s), 220.0);
        let zero = settings(ArpMode::Up, 0, 0);
        assert_eq!(arp.resolve_next(220.0, &scale(), &zero), 220.0);
    }

    #[test]
    fn random_mode_stays_within_pattern() {
        let mut arp = ArpState::new(42);
        let s = settings(ArpMode::Random, 3, 0);
        for _ in 0..64 {
            let f = arp.resolve_next(100.0, &scale(), &s);
            assert!([110.0, 130.8, 146.8].contains(&f), "{f}");
        }
    }

    #[test]
    fn windows_track_activity() {
        let mut arp = ArpState::new(7);
        arp.push_window(100, 200);
        arp.push_window(400, 450);
        assert!(!arp.is_active(50));
        assert!(arp.is_active(150));
        assert!(!arp.is_active(300));
        assert!(arp.is_active(410));
        // Expired windows are pruned.
        assert!(!arp.is_active(500));
    }
}
