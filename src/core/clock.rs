use crate::core::timebase::{Tick, Timebase};

/// Source of "now" in audio time. Injected so the scheduler can be driven by
/// a fake clock in tests instead of the live render position.
pub trait ClockSource {
    fn now(&self) -> Tick;
}

/// A fixed clock value, for tests and offline rendering.
#[derive(Clone, Copy, Debug, Default)]
pub struct FixedClock(pub Tick);

impl ClockSource for FixedClock {
    fn now(&self) -> Tick {
        self.0
    }
}

impl ClockSource for Tick {
    fn now(&self) -> Tick {
        *self
    }
}

/// Musical clock: a floating next-event cursor advanced on a sixteenth-note
/// grid. The cursor never regresses; if it falls behind real time by more
/// than one tick interval it is snapped to just ahead of now, so a stall
/// (e.g. a backgrounded host) never produces a burst of stale events.
#[derive(Clone, Copy, Debug)]
pub struct MusicalClock {
    cursor: f64,
    bpm: f32,
}

impl MusicalClock {
    pub fn start_at(origin: Tick) -> Self {
        Self {
            cursor: origin as f64,
            bpm: 120.0,
        }
    }

    pub fn bpm(&self) -> f32 {
        self.bpm
    }

    /// Tempo changes take effect on the next grid increment, never
    /// retroactively.
    pub fn set_bpm(&mut self, bpm: f32) {
        if bpm.is_finite() && bpm > 0.0 {
            self.bpm = bpm;
        }
    }

    pub fn cursor(&self) -> f64 {
        self.cursor
    }

    pub fn cursor_tick(&self) -> Tick {
        self.cursor.max(0.0).round() as Tick
    }

    /// Snap the cursor forward if it has fallen behind `now` by more than one
    /// poll interval. Returns true when a resync happened.
    pub fn resync_if_stalled(&mut self, now: Tick, poll_interval: Tick, epsilon: Tick) -> bool {
        let now_f = now as f64;
        if self.cursor + (poll_interval as f64) < now_f {
            self.cursor = now_f + epsilon as f64;
            return true;
        }
        false
    }

    /// True while the cursor is inside the lookahead window ending at
    /// `now + lookahead`.
    pub fn within_lookahead(&self, now: Tick, lookahead: Tick) -> bool {
        self.cursor < (now.saturating_add(lookahead)) as f64
    }

    /// Advance the cursor by one sixteenth at the current tempo.
    pub fn advance_sixteenth(&mut self, time: Timebase) {
        self.cursor += time.ticks_per_sixteenth(self.bpm);
    }
}
