pub type Tick = u64;

#[derive(Clone, Copy, Debug)]
pub struct Timebase {
    pub fs: f32,
    pub hop: usize,
}

impl Timebase {
    pub fn tick_to_sec(&self, t: Tick) -> f32 {
        t as f32 / self.fs
    }

    pub fn sec_to_tick(&self, s: f32) -> Tick {
        if s <= 0.0 {
            return 0;
        }
        let tick = (s as f64 * self.fs as f64).round();
        tick as Tick
    }

    pub fn frame_start_tick(&self, frame_idx: u64) -> Tick {
        frame_idx.saturating_mul(self.hop as u64)
    }

    pub fn frame_end_tick(&self, frame_idx: u64) -> Tick {
        self.frame_start_tick(frame_idx)
            .saturating_add(self.hop as u64)
    }

    /// Length of one sixteenth note in ticks at the given tempo.
    ///
    /// Fractional because fast gate/arp divisions subdivide below the grid.
    pub fn ticks_per_sixteenth(&self, bpm: f32) -> f64 {
        let bpm = bpm.max(1.0) as f64;
        60.0 / bpm / 4.0 * self.fs as f64
    }
}

pub fn seconds_per_sixteenth(bpm: f32) -> f32 {
    60.0 / bpm.max(1.0) / 4.0
}
