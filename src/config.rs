use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::audio::guard::{OutputGuardMode, PeakLimiterParams, SoftClipParams};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Requested from the output device; falls back to the device default
    /// when unsupported. Offline renders use it as-is.
    #[serde(default = "AudioConfig::default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "AudioConfig::default_latency_ms")]
    pub latency_ms: f32,
    #[serde(default = "AudioConfig::default_hop")]
    pub hop: usize,
    #[serde(default)]
    pub output_guard: OutputGuardSetting,
}

impl AudioConfig {
    fn default_sample_rate() -> u32 {
        48_000
    }
    fn default_latency_ms() -> f32 {
        50.0
    }
    fn default_hop() -> usize {
        512
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: Self::default_sample_rate(),
            latency_ms: Self::default_latency_ms(),
            hop: Self::default_hop(),
            output_guard: OutputGuardSetting::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum OutputGuardSetting {
    None,
    SoftClip,
    PeakLimiter,
}

impl Default for OutputGuardSetting {
    fn default() -> Self {
        Self::PeakLimiter
    }
}

impl OutputGuardSetting {
    pub fn mode(&self) -> OutputGuardMode {
        match self {
            Self::None => OutputGuardMode::None,
            Self::SoftClip => OutputGuardMode::SoftClip(SoftClipParams::default()),
            Self::PeakLimiter => OutputGuardMode::PeakLimiter(PeakLimiterParams::default()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Poll cadence of the look-ahead resolver.
    #[serde(default = "SchedulerConfig::default_tick_ms")]
    pub tick_ms: f32,
    /// How far ahead each poll resolves. Must exceed `tick_ms` or events
    /// can land in the past between polls.
    #[serde(default = "SchedulerConfig::default_lookahead_ms")]
    pub lookahead_ms: f32,
    /// Stop fade window: a restart inside it reuses the live graph.
    #[serde(default = "SchedulerConfig::default_grace_ms")]
    pub grace_ms: f32,
    #[serde(default = "SchedulerConfig::default_bpm")]
    pub bpm: f32,
    #[serde(default = "SchedulerConfig::default_seed")]
    pub seed: u64,
}

impl SchedulerConfig {
    fn default_tick_ms() -> f32 {
        25.0
    }
    fn default_lookahead_ms() -> f32 {
        100.0
    }
    fn default_grace_ms() -> f32 {
        500.0
    }
    fn default_bpm() -> f32 {
        120.0
    }
    fn default_seed() -> u64 {
        0xB00B1E
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.tick_ms.is_finite() || self.tick_ms <= 0.0 {
            return Err("scheduler.tick_ms must be positive".to_string());
        }
        if !self.lookahead_ms.is_finite() || self.lookahead_ms <= self.tick_ms {
            return Err("scheduler.lookahead_ms must exceed tick_ms".to_string());
        }
        if !self.bpm.is_finite() || self.bpm <= 0.0 {
            return Err("scheduler.bpm must be positive".to_string());
        }
        Ok(())
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_ms: Self::default_tick_ms(),
            lookahead_ms: Self::default_lookahead_ms(),
            grace_ms: Self::default_grace_ms(),
            bpm: Self::default_bpm(),
            seed: Self::default_seed(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.audio.sample_rate == 0 {
            return Err("audio.sample_rate must be positive".to_string());
        }
        if self.audio.hop == 0 {
            return Err("audio.hop must be positive".to_string());
        }
        self.scheduler.validate()
    }

    /// Read the file if it exists; otherwise write the defaults there (as a
    /// commented template) and return them. Parse failures fall back to
    /// defaults rather than aborting.
    pub fn load_or_default(path: &str) -> Self {
        let path_obj = Path::new(path);
        if path_obj.exists() {
            match fs::read_to_string(path_obj) {
                Ok(contents) => match toml::from_str::<Self>(&contents) {
                    Ok(cfg) => match cfg.validate() {
                        Ok(()) => return cfg,
                        Err(err) => {
                            warn!(target: "config", "invalid config {path}: {err}; using defaults");
                        }
                    },
                    Err(err) => {
                        warn!(target: "config", "failed to parse {path}: {err}; using defaults");
                    }
                },
                Err(err) => {
                    warn!(target: "config", "failed to read {path}: {err}; using defaults");
                }
            }
            return Self::default();
        }

        let default_cfg = Self::default();
        match toml::to_string_pretty(&default_cfg) {
            Ok(text) => {
                let mut commented = String::new();
                for line in text.lines() {
                    let trimmed = line.trim();
                    if trimmed.is_empty() || (trimmed.starts_with('[') && trimmed.ends_with(']')) {
                        commented.push_str(line);
                    } else {
                        commented.push_str("# ");
                        commented.push_str(line);
                    }
                    commented.push('\n');
                }
                if let Err(err) = fs::write(path_obj, commented) {
                    warn!(target: "config", "failed to write default config to {path}: {err}");
                }
            }
            Err(err) => {
                warn!(target: "config", "failed to serialize default config: {err}");
            }
        }
        default_cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unique_path(name: &str) -> std::path::PathBuf {
        let mut p = std::env::temp_dir();
        p.push(format!(
            "oobleck_config_test_{}_{}",
            name,
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or(0)
        ));
        p
    }

    #[test]
    fn load_or_default_writes_commented_template() {
        let path = unique_path("template");
        let path_str = path.to_string_lossy().to_string();
        let cfg = EngineConfig::load_or_default(&path_str);
        assert_eq!(cfg.audio.sample_rate, 48_000);
        let written = fs::read_to_string(&path).expect("template written");
        assert!(written.lines().any(|l| l.starts_with("# ")));
        // The commented template still round-trips through the defaults.
        let again = EngineConfig::load_or_default(&path_str);
        assert_eq!(again.scheduler.bpm, 120.0);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn load_or_default_reads_existing() {
        let path = unique_path("existing");
        let path_str = path.to_string_lossy().to_string();
        fs::write(
            &path,
            "[audio]\nsample_rate = 44100\n\n[scheduler]\nbpm = 90.0\n",
        )
        .expect("write");
        let cfg = EngineConfig::load_or_default(&path_str);
        assert_eq!(cfg.audio.sample_rate, 44_100);
        assert_eq!(cfg.scheduler.bpm, 90.0);
        // Omitted fields take defaults.
        assert_eq!(cfg.audio.hop, 512);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn invalid_config_falls_back_to_defaults() {
        let path = unique_path("invalid");
        let path_str = path.to_string_lossy().to_string();
        fs::write(&path, "[scheduler]\ntick_ms = 200.0\nlookahead_ms = 100.0\n").expect("write");
        let cfg = EngineConfig::load_or_default(&path_str);
        assert_eq!(cfg.scheduler.tick_ms, 25.0);
        let _ = fs::remove_file(&path);
    }
}
