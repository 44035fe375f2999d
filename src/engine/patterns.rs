use crate::drums::DrumLane;

pub const STEPS_PER_BAR: usize = 16;

/// One bar of drum triggers: per step, up to four independent lanes.
/// Owned by the selected genre preset; read-only to the scheduler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DrumPattern {
    steps: Vec<[bool; 4]>,
}

impl DrumPattern {
    pub fn from_steps(steps: Vec<[bool; 4]>) -> Self {
        let steps = if steps.is_empty() {
            vec![[false; 4]; STEPS_PER_BAR]
        } else {
            steps
        };
        Self { steps }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn lanes_at(&self, step: usize) -> impl Iterator<Item = DrumLane> + '_ {
        let hits = self.steps[step % self.steps.len()];
        [
            (DrumLane::Kick, hits[0]),
            (DrumLane::Snare, hits[1]),
            (DrumLane::Hihat, hits[2]),
            (DrumLane::Clap, hits[3]),
        ]
        .into_iter()
        .filter_map(|(lane, on)| on.then_some(lane))
    }

    pub fn hit(&self, step: usize, lane: DrumLane) -> bool {
        let hits = self.steps[step % self.steps.len()];
        match lane {
            DrumLane::Kick => hits[0],
            DrumLane::Snare => hits[1],
            DrumLane::Hihat => hits[2],
            DrumLane::Clap => hits[3],
        }
    }
}

/// Genre presets. Lane order: kick, snare, hihat, clap.
pub fn genre_pattern(genre: &str) -> DrumPattern {
    const K: [bool; 4] = [true, false, false, false];
    const S: [bool; 4] = [false, true, false, false];
    const H: [bool; 4] = [false, false, true, false];
    const KH: [bool; 4] = [true, false, true, false];
    const SH: [bool; 4] = [false, true, true, false];
    const KC: [bool; 4] = [true, false, false, true];
    const HC: [bool; 4] = [false, false, true, true];
    const O: [bool; 4] = [false, false, false, false];

    let steps = match genre {
        "techno" => vec![K, O, H, O, KH, O, H, O, K, O, H, O, KC, O, H, H],
        "hiphop" => vec![K, O, O, H, S, O, K, O, O, K, H, O, S, O, O, H],
        "breaks" => vec![K, O, H, K, SH, O, H, O, O, K, H, O, SH, O, K, H],
        "ambient" => vec![K, O, O, O, O, O, H, O, O, O, K, O, O, O, HC, O],
        // house
        _ => vec![K, O, H, O, KC, O, H, O, K, O, H, O, KC, O, H, O],
    };
    debug_assert_eq!(steps.len(), STEPS_PER_BAR);
    DrumPattern::from_steps(steps)
}

/// Fixed table of 16-step gate shapes, selected by name.
pub fn gate_pattern(name: &str) -> Option<[bool; 16]> {
    let p = |bits: u16| {
        let mut out = [false; 16];
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = bits & (1 << (15 - i)) != 0;
        }
        out
    };
    match name {
        "all" => Some(p(0b1111_1111_1111_1111)),
        "alternate" => Some(p(0b1010_1010_1010_1010)),
        "offbeat" => Some(p(0b0101_0101_0101_0101)),
        "four" => Some(p(0b1000_1000_1000_1000)),
        "trance" => Some(p(0b1011_0110_1011_0110)),
        "stutter" => Some(p(0b1101_0011_0100_1101)),
        "long" => Some(p(0b1111_0000_1111_0000)),
        "push" => Some(p(0b0011_1100_1111_0011)),
        _ => None,
    }
}

/// Default key/scale table: A minor pentatonic over four octaves. The UI
/// layer replaces this wholesale on key changes.
pub fn default_scale() -> Vec<f32> {
    let degrees = [110.0f32, 130.81, 146.83, 164.81, 196.0];
    let mut out = Vec::with_capacity(degrees.len() * 4);
    for oct in 0..4 {
        let mult = (oct as f32).exp2();
        out.extend(degrees.iter().map(|d| d * mult));
    }
    out
}
