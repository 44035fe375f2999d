use oobleck::core::timebase::Timebase;
use oobleck::engine::scheduler::{LookaheadScheduler, ScheduledEvent};
use oobleck::engine::settings::DrumSettings;
use oobleck::engine::EngineState;
use oobleck::graph::SignalGraph;

const TB: Timebase = Timebase {
    fs: 48_000.0,
    hop: 512,
};

/// At 120 bpm a sixteenth is exactly 6000 ticks at 48 kHz, so house kicks
/// (every fourth step) must land exactly 24000 ticks apart regardless of
/// the coarse polling cadence.
#[test]
fn kick_onsets_are_sample_exact_on_the_grid() {
    let mut state = EngineState::new(TB, 0, 120.0, 1);
    state.drums = DrumSettings {
        enabled: true,
        genre: "house".to_string(),
        ..DrumSettings::default()
    };
    let sched = LookaheadScheduler::new(TB.sec_to_tick(0.1), TB.sec_to_tick(0.025));

    let mut kicks = Vec::new();
    let mut now = 0u64;
    while now < 48_000 * 4 {
        for ev in sched.poll(&mut state, &now) {
            if let ScheduledEvent::Drum { lane, at } = ev {
                if lane == oobleck::drums::DrumLane::Kick {
                    kicks.push(at);
                }
            }
        }
        now += sched.poll_interval;
    }

    assert!(kicks.len() >= 7, "expected a bar's worth of kicks");
    assert_eq!(kicks[0], 0);
    for pair in kicks.windows(2) {
        assert_eq!(pair[1] - pair[0], 24_000);
    }
}

/// Triggered voices start producing audio on their exact onset tick even
/// when the onset falls mid-hop.
#[test]
fn drum_voice_starts_mid_hop() {
    let mut graph = SignalGraph::new(TB, 1);
    let onset = 100u64; // inside the first 512-sample hop
    graph.trigger_drum(oobleck::drums::DrumLane::Kick, onset);

    let mut block = vec![0.0f32; TB.hop];
    graph.render(0, &mut block);
    assert!(
        block[..100].iter().all(|&s| s == 0.0),
        "audio before the onset"
    );
    assert!(
        block[100..].iter().any(|&s| s != 0.0),
        "no audio after the onset"
    );
}
