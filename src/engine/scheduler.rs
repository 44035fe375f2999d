use tracing::{debug, warn};

use crate::core::clock::ClockSource;
use crate::core::timebase::Tick;
use crate::engine::gate::{self, GATE_TAU_SEC};
use crate::engine::modulation;
use crate::engine::state::EngineState;
use crate::graph::{param, SignalGraph};

/// Smoothing constant for scheduled pitch moves.
const NOTE_TAU_SEC: f32 = 0.004;

/// An event resolved ahead of time, stamped with its exact onset tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ScheduledEvent {
    Drum {
        lane: crate::drums::DrumLane,
        at: Tick,
    },
    Gate {
        at: Tick,
        level: f32,
    },
    ArpNote {
        at: Tick,
        freq_hz: f32,
        gate_ticks: Tick,
    },
}

impl ScheduledEvent {
    pub fn at(&self) -> Tick {
        match *self {
            ScheduledEvent::Drum { at, .. }
            | ScheduledEvent::Gate { at, .. }
            | ScheduledEvent::ArpNote { at, .. } => at,
        }
    }
}

/// Look-ahead scheduler. Each poll resolves every grid tick whose cursor
/// falls inside `now + lookahead`, in a fixed order (drums, gate, arp) per
/// tick, and advances the musical clock. Events land in the future, so the
/// render loop applies them sample-accurately at their stamped tick.
pub struct LookaheadScheduler {
    pub lookahead: Tick,
    pub poll_interval: Tick,
    /// How far ahead of now a snapped cursor lands after a stall.
    pub epsilon: Tick,
}

impl LookaheadScheduler {
    pub fn new(lookahead: Tick, poll_interval: Tick) -> Self {
        Self {
            lookahead,
            poll_interval,
            epsilon: poll_interval / 4,
        }
    }

    pub fn poll(&self, state: &mut EngineState, clock: &impl ClockSource) -> Vec<ScheduledEvent> {
        let now = clock.now();
        if state.clock.resync_if_stalled(now, self.poll_interval, self.epsilon) {
            warn!(target: "sched", now, cursor = state.clock.cursor(), "clock stalled, resynced");
        }

        let mut events = Vec::new();
        while state.clock.within_lookahead(now, self.lookahead) {
            let at = state.clock.cursor_tick();
            let tps = state.time.ticks_per_sixteenth(state.clock.bpm());

            if state.drums.enabled {
                for lane in state.drum_pattern.lanes_at(state.step) {
                    events.push(ScheduledEvent::Drum { lane, at });
                }
            }

            if state.gate.enabled {
                if let Some(pattern) =
                    crate::engine::patterns::gate_pattern(&state.gate.pattern)
                {
                    for ev in gate::resolve(
                        &pattern,
                        state.gate.division,
                        state.step,
                        state.gate.mix,
                        tps,
                    ) {
                        events.push(ScheduledEvent::Gate {
                            at: at + ev.offset,
                            level: ev.level,
                        });
                    }
                }
            } else {
                // Drive the gate open on every tick so a disable can never
                // leave a stale closed value scheduled in flight.
                events.push(ScheduledEvent::Gate { at, level: 1.0 });
            }

            if state.arp.enabled {
                let nps = state.arp.division.notes_per_sixteenth();
                let base = state.tuned_base_freq();
                if nps >= 1.0 {
                    let k = nps as u64;
                    let span = tps / k as f64;
                    for i in 0..k {
                        let freq =
                            state
                                .arp_state
                                .resolve_next(base, &state.scale, &state.arp);
                        let note_at = at + (i as f64 * span).round() as Tick;
                        events.push(ScheduledEvent::ArpNote {
                            at: note_at,
                            freq_hz: freq,
                            gate_ticks: (span * state.arp.gate as f64) as Tick,
                        });
                    }
                } else {
                    let interval = state.arp.division.ticks_per_event();
                    if state.step % interval == 0 {
                        let freq =
                            state
                                .arp_state
                                .resolve_next(base, &state.scale, &state.arp);
                        events.push(ScheduledEvent::ArpNote {
                            at,
                            freq_hz: freq,
                            gate_ticks: (tps * interval as f64 * state.arp.gate as f64)
                                as Tick,
                        });
                    }
                }
            }

            state.step = (state.step + 1) % state.drum_pattern.len();
            state.clock.advance_sixteenth(state.time);
        }
        if !events.is_empty() {
            debug!(target: "sched", now, count = events.len(), "resolved events");
        }
        events
    }

    /// Translate resolved events into graph-side actions. Drums spawn
    /// voices at their stamped onset; gate and pitch land as scheduled
    /// parameter moves applied inside the render loop.
    pub fn apply_events(
        &self,
        events: &[ScheduledEvent],
        state: &mut EngineState,
        graph: &mut SignalGraph,
    ) {
        for ev in events {
            match *ev {
                ScheduledEvent::Drum { lane, at } => graph.trigger_drum(lane, at),
                ScheduledEvent::Gate { at, level } => {
                    graph.schedule(param::GATE_GAIN, at, level, Some(GATE_TAU_SEC));
                }
                ScheduledEvent::ArpNote {
                    at,
                    freq_hz,
                    gate_ticks,
                } => {
                    graph.schedule(param::OSC_FREQ, at, freq_hz, Some(NOTE_TAU_SEC));
                    state
                        .arp_state
                        .push_window(at, at + gate_ticks.max(modulation::MIN_NOTE_TICKS));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::FixedClock;
    use crate::core::timebase::Timebase;
    use crate::engine::settings::{ArpSettings, Division, DrumSettings, GateSettings};

    const TB: Timebase = Timebase { fs: 1000.0, hop: 64 };

    fn scheduler() -> LookaheadScheduler {
        LookaheadScheduler::new(100, 25)
    }

    fn state() -> EngineState {
        EngineState::new(TB, 0, 120.0, 7)
    }

    #[test]
    fn disabled_engines_still_drive_gate_open() {
        let mut st = state();
        let events = scheduler().poll(&mut st, &FixedClock(0));
        assert!(!events.is_empty());
        assert!(events
            .iter()
            .all(|e| matches!(e, ScheduledEvent::Gate { level, .. } if *level == 1.0)));
    }

    #[test]
    fn events_never_land_in_the_past() {
        let mut st = state();
        st.drums = DrumSettings {
            enabled: true,
            ..DrumSettings::default()
        };
        let sched = scheduler();
        for now in (0..4000u64).step_by(25) {
            for ev in sched.poll(&mut st, &now) {
                assert!(ev.at() >= now, "event at {} behind now {}", ev.at(), now);
            }
        }
    }

    #[test]
    fn drum_events_follow_the_sixteenth_grid() {
        let mut st = state();
        st.drums = DrumSettings {
            enabled: true,
            genre: "house".to_string(),
            ..DrumSettings::default()
        };
        let sched = scheduler();
        let mut kicks = Vec::new();
        for now in (0..2200u64).step_by(25) {
            for ev in sched.poll(&mut st, &now) {
                if let ScheduledEvent::Drum { lane, at } = ev {
                    if lane == crate::drums::DrumLane::Kick {
                        kicks.push(at);
                    }
                }
            }
        }
        // House: kick on every quarter, i.e. every 4 sixteenths = 500 ticks.
        assert!(kicks.len() >= 4);
        for pair in kicks.windows(2) {
            assert_eq!(pair[1] - pair[0], 500);
        }
    }

    #[test]
    fn fixed_order_within_a_tick() {
        let mut st = state();
        st.drums = DrumSettings {
            enabled: true,
            ..DrumSettings::default()
        };
        st.gate = GateSettings {
            enabled: true,
            pattern: "all".to_string(),
            ..GateSettings::default()
        };
        st.arp = ArpSettings {
            enabled: true,
            ..ArpSettings::default()
        };
        let events = scheduler().poll(&mut st, &FixedClock(0));
        let first_tick = events[0].at();
        fn rank(e: &ScheduledEvent) -> u8 {
            match e {
                ScheduledEvent::Drum { .. } => 0,
                ScheduledEvent::Gate { .. } => 1,
                ScheduledEvent::ArpNote { .. } => 2,
            }
        }
        let ranks: Vec<u8> = events
            .iter()
            .filter(|e| e.at() == first_tick)
            .map(rank)
            .collect();
        assert!(ranks.contains(&0) && ranks.contains(&1) && ranks.contains(&2));
        assert!(ranks.windows(2).all(|p| p[0] <= p[1]), "{ranks:?}");
    }

    #[test]
    fn stall_snaps_without_a_backlog_burst() {
        let mut st = state();
        st.drums = DrumSettings {
            enabled: true,
            ..DrumSettings::default()
        };
        let sched = scheduler();
        let _ = sched.poll(&mut st, &FixedClock(0));
        // Jump far ahead, as if the host was suspended.
        let events = sched.poll(&mut st, &FixedClock(60_000));
        for ev in &events {
            assert!(ev.at() >= 60_000);
        }
        // A single lookahead window's worth of ticks at most, not 60 s of
        // catch-up.
        let ticks: std::collections::BTreeSet<Tick> = events.iter().map(|e| e.at()).collect();
        assert!(ticks.len() <= 2);
    }

    #[test]
    fn bpm_change_applies_from_the_next_increment() {
        let mut st = state();
        st.drums = DrumSettings {
            enabled: true,
            ..DrumSettings::default()
        };
        let sched = scheduler();
        let mut kicks = Vec::new();
        for now in (0..3000u64).step_by(25) {
            if now == 500 {
                st.set_bpm(240.0);
            }
            for ev in sched.poll(&mut st, &now) {
                if let ScheduledEvent::Drum { lane, at } = ev {
                    if lane == crate::drums::DrumLane::Kick {
                        kicks.push(at);
                    }
                }
            }
        }
        // Intervals shrink from 500 ticks (120 bpm) to 250 (240 bpm), and
        // already-resolved onsets are not revised.
        let deltas: Vec<Tick> = kicks.windows(2).map(|p| p[1] - p[0]).collect();
        assert!(deltas.first().copied() == Some(500));
        assert!(deltas.last().copied() == Some(250));
        assert!(kicks.windows(2).all(|p| p[1] > p[0]));
    }

    #[test]
    fn arp_subdivision_emits_multiple_notes_per_tick() {
        let mut st = state();
        st.arp = ArpSettings {
            enabled: true,
            division: Division::ThirtySecond,
            ..ArpSettings::default()
        };
        let events = scheduler().poll(&mut st, &FixedClock(0));
        let notes: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, ScheduledEvent::ArpNote { .. }))
            .collect();
        // One tick resolves two 1/32 notes 62 or 63 ticks apart.
        assert!(notes.len() >= 2);
        if let (ScheduledEvent::ArpNote { at: a, .. }, ScheduledEvent::ArpNote { at: b, .. }) =
            (notes[0], notes[1])
        {
            let d = b - a;
            assert!((62..=63).contains(&d));
        }
    }
}
