use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use tracing::{debug, error, info, warn};

use crate::audio::{AudioOutput, OutputGuard, OutputGuardMeter, WavOutput};
use crate::config::EngineConfig;
use crate::core::timebase::{Tick, Timebase};
use crate::engine::modulation::{self, ModInput};
use crate::engine::scheduler::LookaheadScheduler;
use crate::engine::settings::{ArpSettings, AudioParams, DrumSettings, FxState, GateSettings};
use crate::engine::state::EngineState;
use crate::engine::stacks;
use crate::graph::analysis::magnitude_spectrum;
use crate::graph::SignalGraph;

/// Control messages for the render thread. All setters are fire-and-forget;
/// the render thread applies them between hops.
pub enum Command {
    SetParams(AudioParams),
    SetFx(FxState),
    SetArp(ArpSettings),
    SetDrums(DrumSettings),
    SetGate(GateSettings),
    SetScale(Vec<f32>),
    SetSynthVolume(f32),
    SetOctave(i32),
    SetBpm(f32),
    Modulate(ModInput),
    Trigger,
    Stacks(Vec<u8>),
    Stop,
    Resume,
    SetRecorder(Option<Sender<Arc<[f32]>>>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RunState {
    Running,
    /// Fading toward silence; a resume inside the fade cancels it.
    Stopping,
    /// Silent, but the graph, stream, and thread are all still alive so a
    /// restart is cheap.
    Idle,
}

struct Telemetry {
    analysis: Mutex<Vec<f32>>,
    step: AtomicUsize,
    shutdown: AtomicBool,
}

impl Telemetry {
    /// Magnitude spectrum of the latest analysis window; `None` until the
    /// first rendered hop lands.
    fn spectrum(&self) -> Option<Vec<f32>> {
        let window = self.analysis.lock().ok()?;
        if window.is_empty() {
            None
        } else {
            Some(magnitude_spectrum(&window))
        }
    }
}

/// The engine facade: owns the render thread and translates the public API
/// into commands. Everything here is callable from a UI thread; nothing
/// blocks on audio except `stop_recording`, which waits for the file to
/// flush.
pub struct Engine {
    config: EngineConfig,
    tx: Sender<Command>,
    render_thread: Option<JoinHandle<()>>,
    telemetry: Arc<Telemetry>,
    guard_meter: Arc<OutputGuardMeter>,
    recorder: Option<JoinHandle<Result<PathBuf, String>>>,
    sample_rate: u32,
}

impl Engine {
    /// Build the output stream and start the render thread. The stream is
    /// opened on the render thread (cpal streams are not `Send`), so this
    /// waits on a ready handshake to surface device errors synchronously.
    pub fn init(config: EngineConfig) -> Result<Self, String> {
        config.validate()?;
        let (tx, rx) = unbounded::<Command>();
        let (ready_tx, ready_rx) = bounded::<Result<u32, String>>(1);
        let telemetry = Arc::new(Telemetry {
            analysis: Mutex::new(Vec::new()),
            step: AtomicUsize::new(0),
            shutdown: AtomicBool::new(false),
        });
        let guard_meter = Arc::new(OutputGuardMeter::default());

        let thread_cfg = config.clone();
        let thread_tel = telemetry.clone();
        let thread_meter = guard_meter.clone();
        let render_thread = std::thread::Builder::new()
            .name("oobleck-render".to_string())
            .spawn(move || render_main(thread_cfg, rx, ready_tx, thread_tel, thread_meter))
            .map_err(|e| format!("spawn render thread: {e}"))?;

        let sample_rate = match ready_rx.recv_timeout(Duration::from_secs(5)) {
            Ok(Ok(rate)) => rate,
            Ok(Err(e)) => {
                let _ = render_thread.join();
                return Err(e);
            }
            Err(_) => {
                // A slow device open must not leave a detached render thread
                // behind; it checks the flag as soon as bring-up finishes.
                telemetry.shutdown.store(true, Ordering::Relaxed);
                let _ = render_thread.join();
                return Err("render thread did not come up".to_string());
            }
        };
        info!(target: "engine", sample_rate, "engine ready");

        Ok(Self {
            config,
            tx,
            render_thread: Some(render_thread),
            telemetry,
            guard_meter,
            recorder: None,
            sample_rate,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn guard_meter(&self) -> Arc<OutputGuardMeter> {
        self.guard_meter.clone()
    }

    fn send(&self, cmd: Command) {
        if self.tx.send(cmd).is_err() {
            warn!(target: "engine", "render thread gone, command dropped");
        }
    }

    pub fn set_params(&self, params: AudioParams) {
        self.send(Command::SetParams(params));
    }

    pub fn set_fx(&self, fx: FxState) {
        self.send(Command::SetFx(fx));
    }

    pub fn set_arp(&self, arp: ArpSettings) {
        self.send(Command::SetArp(arp));
    }

    pub fn set_drums(&self, drums: DrumSettings) {
        self.send(Command::SetDrums(drums));
    }

    pub fn set_gate(&self, gate: GateSettings) {
        self.send(Command::SetGate(gate));
    }

    pub fn set_scale(&self, freqs: Vec<f32>) {
        self.send(Command::SetScale(freqs));
    }

    pub fn set_synth_volume(&self, volume: f32) {
        self.send(Command::SetSynthVolume(volume));
    }

    pub fn set_octave(&self, octave: i32) {
        self.send(Command::SetOctave(octave));
    }

    pub fn set_bpm(&self, bpm: f32) {
        self.send(Command::SetBpm(bpm));
    }

    pub fn modulate(&self, input: ModInput) {
        self.send(Command::Modulate(input));
    }

    pub fn trigger(&self) {
        self.send(Command::Trigger);
    }

    pub fn trigger_effect_stacks(&self, ids: Vec<u8>) {
        self.send(Command::Stacks(ids));
    }

    /// Fade out and go idle. The graph and stream stay alive; a `resume`
    /// inside the grace window cancels the fade without rebuilding anything.
    pub fn stop(&self) {
        self.send(Command::Stop);
    }

    pub fn resume(&self) {
        self.send(Command::Resume);
    }

    /// Frequency-magnitude snapshot of the master output's latest analysis
    /// window. `None` until the render loop has produced a hop.
    pub fn audio_data(&self) -> Option<Vec<f32>> {
        self.telemetry.spectrum()
    }

    pub fn current_step(&self) -> usize {
        self.telemetry.step.load(Ordering::Relaxed)
    }

    pub fn start_recording(&mut self, path: PathBuf) -> Result<(), String> {
        if self.recorder.is_some() {
            return Err("already recording".to_string());
        }
        let (rec_tx, rec_rx) = unbounded::<Arc<[f32]>>();
        let handle = WavOutput::run(
            rec_rx,
            path,
            self.sample_rate,
            self.config.audio.output_guard.mode(),
            Some(self.guard_meter.clone()),
        );
        self.send(Command::SetRecorder(Some(rec_tx)));
        self.recorder = Some(handle);
        Ok(())
    }

    /// Detach the tee and wait for the writer to finalize the file.
    pub fn stop_recording(&mut self) -> Result<PathBuf, String> {
        let handle = self.recorder.take().ok_or("not recording")?;
        self.send(Command::SetRecorder(None));
        handle
            .join()
            .map_err(|_| "recording thread panicked".to_string())?
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.telemetry.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.render_thread.take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.recorder.take() {
            match handle.join() {
                Ok(Ok(path)) => debug!(target: "engine", path = %path.display(), "recording closed on drop"),
                Ok(Err(e)) => error!(target: "engine", "recording failed: {e}"),
                Err(_) => error!(target: "engine", "recording thread panicked"),
            }
        }
    }
}

fn render_main(
    config: EngineConfig,
    rx: Receiver<Command>,
    ready_tx: Sender<Result<u32, String>>,
    telemetry: Arc<Telemetry>,
    guard_meter: Arc<OutputGuardMeter>,
) {
    let (mut output, mut prod) = match AudioOutput::new(config.audio.sample_rate, config.audio.latency_ms) {
        Ok(pair) => pair,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };
    let fs = output.sample_rate() as f32;
    let hop = config.audio.hop;
    let time = Timebase { fs, hop };
    let _ = ready_tx.send(Ok(output.sample_rate()));

    let mut graph = SignalGraph::new(time, config.scheduler.seed);
    let mut state = EngineState::new(time, 0, config.scheduler.bpm, config.scheduler.seed);
    let sched = LookaheadScheduler::new(
        time.sec_to_tick(config.scheduler.lookahead_ms / 1000.0),
        time.sec_to_tick(config.scheduler.tick_ms / 1000.0),
    );
    let guard_mode = OutputGuard::from_env_or(config.audio.output_guard.mode());
    let mut guard = OutputGuard::new(guard_mode, fs as u32).with_meter(guard_meter);

    let mut run_state = RunState::Running;
    let mut fade = 1.0f32;
    let fade_step = 1.0 / (fs * (config.scheduler.grace_ms / 1000.0).max(0.01));
    let mut recorder: Option<Sender<Arc<[f32]>>> = None;

    let mut block = vec![0.0f32; hop];
    let mut frame: u64 = 0;
    let mut next_poll: Tick = 0;
    // Reapplied every poll so arp note windows open and close the synth
    // even while the pointer is idle.
    let mut last_mod = ModInput::default();

    info!(target: "engine", fs, hop, "render loop started");
    loop {
        if telemetry.shutdown.load(Ordering::Relaxed) {
            break;
        }
        let now = time.frame_start_tick(frame);

        while let Ok(cmd) = rx.try_recv() {
            match cmd {
                Command::SetParams(p) => state.apply_params(p, &mut graph),
                Command::SetFx(fx) => state.apply_fx(fx, &mut graph),
                Command::SetArp(a) => state.set_arp(a),
                Command::SetDrums(d) => state.set_drums(d, &mut graph),
                Command::SetGate(g) => state.set_gate(g, &mut graph),
                Command::SetScale(s) => state.set_scale(s),
                Command::SetSynthVolume(v) => state.set_synth_volume(v),
                Command::SetOctave(o) => state.set_octave(o),
                Command::SetBpm(bpm) => state.set_bpm(bpm),
                Command::Modulate(input) => {
                    last_mod = input;
                    modulation::apply(&mut state, &mut graph, input, now);
                }
                Command::Trigger => state.trigger(now),
                Command::Stacks(ids) => stacks::dispatch_many(&mut graph, now, &ids),
                Command::Stop => {
                    if run_state == RunState::Running {
                        debug!(target: "engine", now, "fading out");
                        run_state = RunState::Stopping;
                    }
                }
                Command::Resume => {
                    if run_state != RunState::Running {
                        debug!(target: "engine", now, ?run_state, "resuming");
                        if run_state == RunState::Idle {
                            // Came back after the fade completed: restart
                            // the grid from the current position.
                            let bpm = state.clock.bpm();
                            state.clock = crate::core::clock::MusicalClock::start_at(now);
                            state.clock.set_bpm(bpm);
                            state.step = 0;
                        }
                        run_state = RunState::Running;
                    }
                }
                Command::SetRecorder(sender) => recorder = sender,
            }
        }

        if run_state == RunState::Idle {
            block.fill(0.0);
            AudioOutput::push_samples(&mut prod, &block);
            frame += 1;
            continue;
        }

        if run_state == RunState::Running && now >= next_poll {
            // Replay the pointer position but not its motion, so the manual
            // hold window expires once frames stop arriving.
            let held = ModInput {
                speed: 0.0,
                clicked: false,
                ..last_mod
            };
            modulation::apply(&mut state, &mut graph, held, now);
            let events = sched.poll(&mut state, &now);
            sched.apply_events(&events, &mut state, &mut graph);
            telemetry.step.store(state.step, Ordering::Relaxed);
            next_poll = now + sched.poll_interval;
        }

        graph.render(now, &mut block);

        match run_state {
            RunState::Running => {
                if fade < 1.0 {
                    for s in block.iter_mut() {
                        fade = (fade + fade_step * 4.0).min(1.0);
                        *s *= fade;
                    }
                }
            }
            RunState::Stopping => {
                for s in block.iter_mut() {
                    fade = (fade - fade_step).max(0.0);
                    *s *= fade;
                }
                if fade <= 0.0 {
                    debug!(target: "engine", now, "fade complete, idling");
                    graph.quiesce();
                    run_state = RunState::Idle;
                }
            }
            RunState::Idle => {}
        }

        guard.process_block(&mut block);

        if let Some(tx) = &recorder {
            let shared: Arc<[f32]> = Arc::from(block.as_slice());
            if tx.send(shared).is_err() {
                warn!(target: "engine", "recorder channel closed, detaching");
                recorder = None;
            }
        }

        if let Ok(mut window) = telemetry.analysis.lock() {
            let latest = graph.analysis_window();
            window.clear();
            window.extend_from_slice(&latest);
        }

        AudioOutput::push_samples(&mut prod, &block);
        frame += 1;
    }

    output.stop();
    info!(target: "engine", frames = frame, "render loop ended");
}
