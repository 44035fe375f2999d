use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::Receiver;
use hound::{SampleFormat, WavSpec, WavWriter};
use tracing::{error, info};

use crate::audio::guard::{OutputGuard, OutputGuardMeter, OutputGuardMode};

/// Recording sink: drains the render thread's tee channel into a 16-bit
/// mono WAV, with its own guard instance so the file is protected even when
/// the device guard is disabled. The thread exits when the sender side is
/// dropped; joining it is how stop waits for the final flush.
pub struct WavOutput;

impl WavOutput {
    pub fn run(
        rx: Receiver<Arc<[f32]>>,
        path: PathBuf,
        sample_rate: u32,
        guard_mode: OutputGuardMode,
        guard_meter: Option<Arc<OutputGuardMeter>>,
    ) -> JoinHandle<Result<PathBuf, String>> {
        std::thread::spawn(move || {
            let mut guard = OutputGuard::new(guard_mode, sample_rate);
            if let Some(meter) = guard_meter {
                guard = guard.with_meter(meter);
            }
            let spec = WavSpec {
                channels: 1,
                sample_rate,
                bits_per_sample: 16,
                sample_format: SampleFormat::Int,
            };
            let mut writer = WavWriter::create(&path, spec)
                .map_err(|e| format!("create {}: {e}", path.display()))?;
            let mut scratch: Vec<f32> = Vec::new();
            let mut written: u64 = 0;

            while let Ok(samples) = rx.recv() {
                if scratch.len() != samples.len() {
                    scratch.resize(samples.len(), 0.0);
                }
                scratch.copy_from_slice(&samples);
                guard.process_block(&mut scratch);
                for &s in &scratch {
                    let v = (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
                    writer
                        .write_sample(v)
                        .map_err(|e| format!("write sample: {e}"))?;
                }
                written += scratch.len() as u64;
            }

            if let Err(e) = writer.finalize() {
                error!(target: "audio::writer", "finalize failed: {e}");
                return Err(format!("finalize {}: {e}", path.display()));
            }
            info!(target: "audio::writer", path = %path.display(), written, "recording closed");
            Ok(path)
        })
    }
}
