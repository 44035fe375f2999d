use oobleck::core::timebase::Timebase;
use oobleck::engine::settings::FxState;
use oobleck::engine::{stacks, EngineState};
use oobleck::graph::{param, SignalGraph};

const TB: Timebase = Timebase {
    fs: 48_000.0,
    hop: 512,
};

fn render_span(graph: &mut SignalGraph, from: u64, to: u64) {
    let mut block = vec![0.0f32; TB.hop];
    let mut t = from;
    while t < to {
        graph.render(t, &mut block);
        t += TB.hop as u64;
    }
}

/// A toggle flipped while a macro override is in flight must be honored
/// when the macro reverts: the param lands on the new steady value, not the
/// one captured at macro start.
#[test]
fn toggle_during_macro_wins_after_revert() {
    let mut graph = SignalGraph::new(TB, 1);
    let mut state = EngineState::new(TB, 0, 120.0, 1);

    // Flanger macro overrides delay wet for 1.5 s.
    stacks::dispatch(&mut graph, 0, 4);
    render_span(&mut graph, 0, 24_000);
    assert_eq!(graph.target(param::DELAY_WET), 0.5);

    // User enables the delay toggle mid-macro.
    let fx = FxState {
        delay: true,
        ..FxState::default()
    };
    state.apply_fx(fx, &mut graph);
    // Override still pins the target.
    assert_eq!(graph.target(param::DELAY_WET), 0.5);

    // Past the 1.5 s revert point the toggle's steady value applies.
    render_span(&mut graph, 24_000, 48_000 + 24_000 + 4096);
    assert_eq!(graph.target(param::DELAY_WET), graph.steady(param::DELAY_WET));
    assert_eq!(graph.steady(param::DELAY_WET), 0.5);

    // And turning the toggle off afterwards moves the target normally.
    state.apply_fx(FxState::default(), &mut graph);
    assert_eq!(graph.target(param::DELAY_WET), 0.0);
}

/// Two macros touching disjoint params revert independently.
#[test]
fn disjoint_macros_revert_independently() {
    let mut graph = SignalGraph::new(TB, 1);
    // Pitch drop (0.7 s) and sub dip (0.6 s).
    stacks::dispatch_many(&mut graph, 0, &[5, 7]);
    render_span(&mut graph, 0, 4096);
    assert_eq!(graph.target(param::PITCH_BEND), -12.0);
    assert_eq!(graph.target(param::SUB_GAIN), 0.0);

    // 0.65 s in: sub dip reverted, pitch drop still holding.
    render_span(&mut graph, 4096, 31_500);
    assert_eq!(graph.target(param::SUB_GAIN), graph.steady(param::SUB_GAIN));
    assert_eq!(graph.target(param::PITCH_BEND), -12.0);

    // 0.75 s in: both reverted.
    render_span(&mut graph, 31_500, 36_500);
    assert_eq!(graph.target(param::PITCH_BEND), graph.steady(param::PITCH_BEND));
}
