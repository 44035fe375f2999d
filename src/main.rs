use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use oobleck::audio::{OutputGuard, WavOutput};
use oobleck::config::EngineConfig;
use oobleck::core::timebase::Timebase;
use oobleck::engine::scheduler::LookaheadScheduler;
use oobleck::engine::settings::{ArpSettings, DrumSettings, GateSettings};
use oobleck::engine::{Engine, EngineState, ModInput};
use oobleck::graph::SignalGraph;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Config file path; created with defaults if missing
    #[arg(long, default_value = "oobleck.toml")]
    config: String,

    /// Render offline to a wav file instead of playing live
    #[arg(long)]
    wav: Option<PathBuf>,

    /// Offline render length in seconds
    #[arg(long, default_value_t = 8.0)]
    seconds: f32,

    /// Tempo override
    #[arg(long)]
    bpm: Option<f32>,

    /// Drum genre preset for the demo groove
    #[arg(long, default_value = "house")]
    genre: String,

    /// Seed override for the noise sources
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<(), String> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let mut config = EngineConfig::load_or_default(&args.config);
    if let Some(bpm) = args.bpm {
        config.scheduler.bpm = bpm;
    }
    if let Some(seed) = args.seed {
        config.scheduler.seed = seed;
    }
    config.validate()?;

    match args.wav.clone() {
        Some(path) => render_offline(&config, &args, path),
        None => run_live(config, &args),
    }
}

/// Demo groove: drums plus an arpeggio over the default scale, gate on the
/// offbeat pattern.
fn demo_state(config: &EngineConfig, args: &Args, time: Timebase, graph: &mut SignalGraph) -> EngineState {
    let mut state = EngineState::new(time, 0, config.scheduler.bpm, config.scheduler.seed);
    state.set_drums(
        DrumSettings {
            enabled: true,
            genre: args.genre.clone(),
            ..DrumSettings::default()
        },
        graph,
    );
    state.set_arp(ArpSettings {
        enabled: true,
        ..ArpSettings::default()
    });
    state.set_gate(
        GateSettings {
            enabled: true,
            ..GateSettings::default()
        },
        graph,
    );
    state
}

fn render_offline(config: &EngineConfig, args: &Args, path: PathBuf) -> Result<(), String> {
    let fs = config.audio.sample_rate as f32;
    let time = Timebase {
        fs,
        hop: config.audio.hop,
    };
    let mut graph = SignalGraph::new(time, config.scheduler.seed);
    let mut state = demo_state(config, args, time, &mut graph);
    let sched = LookaheadScheduler::new(
        time.sec_to_tick(config.scheduler.lookahead_ms / 1000.0),
        time.sec_to_tick(config.scheduler.tick_ms / 1000.0),
    );
    let mut guard = OutputGuard::new(config.audio.output_guard.mode(), config.audio.sample_rate);

    let (tx, rx) = crossbeam_channel::unbounded::<Arc<[f32]>>();
    let writer = WavOutput::run(
        rx,
        path.clone(),
        config.audio.sample_rate,
        oobleck::audio::OutputGuardMode::None,
        None,
    );

    let total_frames = ((args.seconds.max(0.1) * fs) as usize / time.hop) as u64;
    let mut block = vec![0.0f32; time.hop];
    let mut next_poll = 0u64;
    for frame in 0..total_frames {
        let now = time.frame_start_tick(frame);
        if now >= next_poll {
            // Keep the synth open the whole render.
            oobleck::engine::modulation::apply(
                &mut state,
                &mut graph,
                ModInput {
                    x: 0.5,
                    y: 0.3,
                    speed: 0.5,
                    hardness: 0.4,
                    clicked: false,
                },
                now,
            );
            let events = sched.poll(&mut state, &now);
            sched.apply_events(&events, &mut state, &mut graph);
            next_poll = now + sched.poll_interval;
        }
        graph.render(now, &mut block);
        guard.process_block(&mut block);
        tx.send(Arc::from(block.as_slice()))
            .map_err(|_| "writer thread exited early".to_string())?;
    }
    drop(tx);
    let written = writer
        .join()
        .map_err(|_| "writer thread panicked".to_string())??;
    info!(target: "main", path = %written.display(), seconds = args.seconds, "offline render done");
    Ok(())
}

fn run_live(config: EngineConfig, args: &Args) -> Result<(), String> {
    let engine = Engine::init(config)?;
    engine.set_drums(DrumSettings {
        enabled: true,
        genre: args.genre.clone(),
        ..DrumSettings::default()
    });
    engine.set_arp(ArpSettings {
        enabled: true,
        ..ArpSettings::default()
    });

    let stop = Arc::new(AtomicBool::new(false));
    let stop_for_ctrlc = stop.clone();
    ctrlc::set_handler(move || {
        stop_for_ctrlc.store(true, Ordering::SeqCst);
    })
    .map_err(|e| format!("install signal handler: {e}"))?;

    info!(target: "main", "playing; ctrl-c to exit");
    // Synthetic pointer drift so the demo is audible without a UI attached.
    let mut t = 0.0f32;
    while !stop.load(Ordering::SeqCst) {
        engine.modulate(ModInput {
            x: 0.5 + 0.4 * (t * 0.33).sin(),
            y: 0.5 + 0.3 * (t * 0.21).cos(),
            speed: 0.5,
            hardness: 0.3 + 0.3 * (t * 0.11).sin().abs(),
            clicked: false,
        });
        t += 0.05;
        std::thread::sleep(std::time::Duration::from_millis(50));
    }
    drop(engine);
    Ok(())
}
