use tracing::debug;

use crate::core::timebase::{Tick, Timebase};
use crate::graph::{
    build::{CURVE_CRUSH, CURVE_FOLD, SWEEP_BANDPASS, SWEEP_NOTCH},
    param, SignalGraph,
};

/// Number of distinct effect macros.
pub const STACK_COUNT: u8 = 9;

fn sec(time: Timebase, s: f32) -> Tick {
    time.sec_to_tick(s)
}

/// Fire one effect macro at `now`. Each macro is a burst of override
/// parameter moves with a common revert point; when the overrides lapse the
/// params glide back to whatever their steady values are at that moment, so
/// a toggle flipped mid-macro is honored on exit.
pub fn dispatch(graph: &mut SignalGraph, now: Tick, id: u8) {
    let time = graph.timebase();
    debug!(target: "stacks", id, now, "macro");
    match id {
        // Phaser sweep: deep wet with a fast rate for one bar-ish burst.
        1 => {
            let end = now + sec(time, 1.2);
            graph.schedule_override(param::PHASER_WET, now, 0.6, Some(0.05), end);
            graph.schedule_override(param::PHASER_RATE, now, 4.0, Some(0.05), end);
        }
        // Formant sweep: bandpass mode with the center walked up vowel-like.
        2 => {
            let end = now + sec(time, 1.0);
            graph.schedule_override(param::SWEEP_MODE, now, SWEEP_BANDPASS, None, end);
            graph.schedule_override(param::SWEEP_FREQ, now, 300.0, Some(0.02), end);
            graph.schedule_override(
                param::SWEEP_FREQ,
                now + sec(time, 0.3),
                900.0,
                Some(0.15),
                end,
            );
            graph.schedule_override(
                param::SWEEP_FREQ,
                now + sec(time, 0.6),
                2500.0,
                Some(0.2),
                end,
            );
        }
        // Wavefold slam: fold transfer plus heavy drive.
        3 => {
            let end = now + sec(time, 0.8);
            graph.schedule_override(param::SHAPER_CURVE, now, CURVE_FOLD, None, end);
            graph.schedule_override(param::DRIVE_GAIN, now, 6.0, Some(0.01), end);
        }
        // Flanger: delay pulled down into comb territory with high feedback.
        // Wet is an override, so it cannot exceed 0.5 even with the delay
        // toggle already on.
        4 => {
            let end = now + sec(time, 1.5);
            graph.schedule_override(param::DELAY_TIME, now, 0.012, Some(0.3), end);
            graph.schedule_override(param::DELAY_FEEDBACK, now, 0.7, Some(0.05), end);
            graph.schedule_override(param::DELAY_WET, now, 0.5, Some(0.05), end);
        }
        // Pitch drop: a fast octave dive that snaps back.
        5 => {
            let end = now + sec(time, 0.7);
            graph.schedule_override(param::PITCH_BEND, now, -12.0, Some(0.25), end);
        }
        // Notch sweep with a drive push.
        6 => {
            let end = now + sec(time, 1.0);
            graph.schedule_override(param::SWEEP_MODE, now, SWEEP_NOTCH, None, end);
            graph.schedule_override(param::SWEEP_FREQ, now, 400.0, Some(0.02), end);
            graph.schedule_override(
                param::SWEEP_FREQ,
                now + sec(time, 0.4),
                3000.0,
                Some(0.3),
                end,
            );
            graph.schedule_override(param::DRIVE_GAIN, now, 3.0, Some(0.02), end);
        }
        // Sub dip: drop the low anchor out for a moment.
        7 => {
            let end = now + sec(time, 0.6);
            graph.schedule_override(param::SUB_GAIN, now, 0.0, Some(0.03), end);
        }
        // Filter wobble: square LFO painted as alternating overrides.
        8 => {
            let end = now + sec(time, 0.6);
            let half = sec(time, 0.04);
            let mut at = now;
            let mut low = true;
            while at < end {
                let cutoff = if low { 400.0 } else { 3000.0 };
                graph.schedule_override(param::FILTER_CUTOFF, at, cutoff, Some(0.008), end);
                low = !low;
                at += half;
            }
        }
        // Bit reduction: staircase transfer for the burst.
        9 => {
            let end = now + sec(time, 0.9);
            graph.schedule_override(param::SHAPER_CURVE, now, CURVE_CRUSH, None, end);
            graph.schedule_override(param::DRIVE_GAIN, now, 2.0, Some(0.02), end);
        }
        _ => debug!(target: "stacks", id, "unknown macro id ignored"),
    }
}

/// Fire several macros at once; unknown ids are skipped, duplicates fire
/// once each and their reverts compose.
pub fn dispatch_many(graph: &mut SignalGraph, now: Tick, ids: &[u8]) {
    for &id in ids {
        dispatch(graph, now, id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::build::CURVE_DRIVE;

    const TB: Timebase = Timebase { fs: 1000.0, hop: 64 };

    fn render_until(graph: &mut SignalGraph, from: Tick, to: Tick) {
        let mut out = vec![0.0; TB.hop];
        let mut t = from;
        while t < to {
            graph.render(t, &mut out);
            t += TB.hop as Tick;
        }
    }

    #[test]
    fn macro_reverts_to_current_steady() {
        let mut graph = SignalGraph::new(TB, 7);
        graph.set_steady(param::DRIVE_GAIN, 1.0);
        dispatch(&mut graph, 100, 3);
        render_until(&mut graph, 0, 512);
        assert_eq!(graph.target(param::DRIVE_GAIN), 6.0);
        // Steady changes mid-macro, the override still wins...
        graph.set_steady(param::DRIVE_GAIN, 2.0);
        assert_eq!(graph.target(param::DRIVE_GAIN), 6.0);
        // ...and the revert lands on the new steady value.
        render_until(&mut graph, 512, 1100);
        assert_eq!(graph.target(param::DRIVE_GAIN), 2.0);
    }

    #[test]
    fn flanger_wet_stays_capped() {
        let mut graph = SignalGraph::new(TB, 7);
        // Delay toggle already on at full musical wet.
        graph.set_steady(param::DELAY_WET, 0.5);
        dispatch(&mut graph, 0, 4);
        render_until(&mut graph, 0, 1500);
        assert!(graph.target(param::DELAY_WET) <= 0.5);
    }

    #[test]
    fn concurrent_macros_compose_and_revert() {
        let mut graph = SignalGraph::new(TB, 7);
        dispatch_many(&mut graph, 0, &[3, 7]);
        render_until(&mut graph, 0, 256);
        assert_eq!(graph.target(param::SHAPER_CURVE), CURVE_FOLD);
        assert_eq!(graph.target(param::SUB_GAIN), 0.0);
        // Sub dip (0.6 s) reverts first, fold (0.8 s) still holds.
        render_until(&mut graph, 256, 700);
        assert_eq!(graph.target(param::SUB_GAIN), graph.steady(param::SUB_GAIN));
        assert_eq!(graph.target(param::SHAPER_CURVE), CURVE_FOLD);
        render_until(&mut graph, 700, 900);
        assert_eq!(graph.target(param::SHAPER_CURVE), CURVE_DRIVE);
    }

    #[test]
    fn unknown_id_is_a_no_op() {
        let mut graph = SignalGraph::new(TB, 7);
        let before: Vec<f32> = (0..param::COUNT)
            .map(|i| graph.target(crate::graph::ParamId(i)))
            .collect();
        dispatch(&mut graph, 0, 42);
        let after: Vec<f32> = (0..param::COUNT)
            .map(|i| graph.target(crate::graph::ParamId(i)))
            .collect();
        assert_eq!(before, after);
    }

    #[test]
    fn wobble_alternates_cutoff_targets() {
        let mut graph = SignalGraph::new(TB, 7);
        dispatch(&mut graph, 0, 8);
        let mut out = vec![0.0; TB.hop];
        let mut seen = Vec::new();
        for i in 0..8u64 {
            graph.render(i * TB.hop as Tick, &mut out);
            seen.push(graph.target(param::FILTER_CUTOFF));
        }
        assert!(seen.contains(&400.0));
        assert!(seen.contains(&3000.0));
    }
}
