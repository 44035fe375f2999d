use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use ringbuf::traits::*;
use ringbuf::{HeapCons, HeapProd, HeapRb};
use tracing::{error, info, warn};

/// Device output: a cpal stream fed from a ring buffer. The render thread
/// produces mono samples; the callback duplicates them across the device's
/// channels and substitutes silence on underrun.
pub struct AudioOutput {
    stream: Option<cpal::Stream>,
    pub config: cpal::StreamConfig,
}

/// Pick an f32 output config at the requested rate, if the device offers
/// one.
fn pick_stream_config(
    ranges: impl Iterator<Item = cpal::SupportedStreamConfigRange>,
    requested_rate: u32,
) -> Option<cpal::SupportedStreamConfig> {
    ranges
        .filter(|r| r.sample_format() == cpal::SampleFormat::F32)
        .find_map(|r| r.try_with_sample_rate(cpal::SampleRate(requested_rate)))
}

impl AudioOutput {
    pub fn new(requested_rate: u32, latency_ms: f32) -> Result<(Self, HeapProd<f32>), String> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| "no output device".to_string())?;
        let supported = match device
            .supported_output_configs()
            .ok()
            .and_then(|ranges| pick_stream_config(ranges, requested_rate))
        {
            Some(cfg) => cfg,
            None => {
                let fallback = device
                    .default_output_config()
                    .map_err(|e| format!("no default output config: {e}"))?;
                warn!(
                    target: "audio",
                    requested_rate,
                    fallback_rate = fallback.sample_rate().0,
                    "device does not offer the requested rate, using its default"
                );
                fallback
            }
        };
        let sample_rate = supported.sample_rate().0;
        let channels = supported.channels();

        let config = cpal::StreamConfig {
            channels,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let capacity = ((sample_rate as f32 * latency_ms / 1000.0) as usize).max(256);
        let rb = HeapRb::<f32>::new(capacity * 4);
        let (prod, mut cons): (HeapProd<f32>, HeapCons<f32>) = rb.split();

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let n_frames = data.len() / channels as usize;
                    for frame in 0..n_frames {
                        let s = cons.try_pop().unwrap_or(0.0);
                        for ch in 0..channels as usize {
                            data[frame * channels as usize + ch] = s;
                        }
                    }
                },
                |err| error!(target: "audio", "stream error: {err}"),
                None,
            )
            .map_err(|e| format!("build output stream: {e}"))?;
        stream.play().map_err(|e| format!("start stream: {e}"))?;
        info!(target: "audio", sample_rate, channels, capacity, "output stream started");

        Ok((
            Self {
                stream: Some(stream),
                config,
            },
            prod,
        ))
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    pub fn stop(&mut self) {
        self.stream.take();
    }

    /// Blocking push: backpressure from a full ring buffer is what paces the
    /// render thread against real time.
    pub fn push_samples(prod: &mut HeapProd<f32>, samples: &[f32]) {
        let mut offset = 0;
        while offset < samples.len() {
            let written = prod.push_slice(&samples[offset..]);
            offset += written;
            if offset < samples.len() {
                std::thread::sleep(std::time::Duration::from_micros(200));
            }
        }
    }
}

impl Drop for AudioOutput {
    fn drop(&mut self) {
        self.stream.take();
    }
}
