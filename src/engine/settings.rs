use serde::{Deserialize, Serialize};

use crate::drums::DrumKit;

/// Tempo-relative event rate. `notes_per_sixteenth` is the subdivision
/// factor against the sixteenth-note scheduler grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Division {
    Bar,
    Half,
    Quarter,
    Eighth,
    #[default]
    Sixteenth,
    ThirtySecond,
    SixtyFourth,
}

impl Division {
    pub fn notes_per_sixteenth(self) -> f64 {
        match self {
            Division::Bar => 1.0 / 16.0,
            Division::Half => 1.0 / 8.0,
            Division::Quarter => 1.0 / 4.0,
            Division::Eighth => 1.0 / 2.0,
            Division::Sixteenth => 1.0,
            Division::ThirtySecond => 2.0,
            Division::SixtyFourth => 4.0,
        }
    }

    /// For slower-than-grid divisions: fire only on step indices that are
    /// multiples of this. Integer arithmetic, no floating-point time
    /// comparison, so slow divisions cannot drift.
    pub fn ticks_per_event(self) -> usize {
        let nps = self.notes_per_sixteenth();
        if nps >= 1.0 {
            1
        } else {
            (1.0 / nps).round() as usize
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArpMode {
    #[default]
    Up,
    Down,
    UpDown,
    Random,
    Brownian,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArpSettings {
    pub enabled: bool,
    pub division: Division,
    pub mode: ArpMode,
    /// Size of the note pool.
    pub steps: usize,
    /// Octave range; the resolved octave shift wraps modulo `octaves + 1`.
    pub octaves: u32,
    /// Fraction of the nominal step duration the note stays audible.
    pub gate: f32,
}

impl Default for ArpSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            division: Division::Sixteenth,
            mode: ArpMode::Up,
            steps: 8,
            octaves: 1,
            gate: 0.8,
        }
    }
}

impl ArpSettings {
    pub const MAX_STEPS: usize = 64;
    pub const MAX_OCTAVES: u32 = 8;

    pub fn validate(&self) -> Result<(), String> {
        if !self.gate.is_finite() || self.gate < 0.0 || self.gate > 1.0 {
            return Err("arp.gate must be in [0, 1]".to_string());
        }
        if self.steps == 0 || self.steps > Self::MAX_STEPS {
            return Err(format!("arp.steps must be in [1, {}]", Self::MAX_STEPS));
        }
        if self.octaves > Self::MAX_OCTAVES {
            return Err(format!("arp.octaves must be at most {}", Self::MAX_OCTAVES));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DrumSettings {
    pub enabled: bool,
    pub kit: DrumKit,
    pub genre: String,
    pub volume: f32,
}

impl Default for DrumSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            kit: DrumKit::default(),
            genre: "house".to_string(),
            volume: 0.8,
        }
    }
}

impl DrumSettings {
    pub fn validate(&self) -> Result<(), String> {
        if !self.volume.is_finite() || self.volume < 0.0 {
            return Err("drums.volume must be finite and >= 0".to_string());
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GateSettings {
    pub enabled: bool,
    pub pattern: String,
    pub division: Division,
    /// Wet depth: how far gain drops during a closed step. 0 = no effect,
    /// 1 = full mute.
    pub mix: f32,
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            pattern: "offbeat".to_string(),
            division: Division::Sixteenth,
            mix: 1.0,
        }
    }
}

impl GateSettings {
    pub fn validate(&self) -> Result<(), String> {
        if !self.mix.is_finite() || self.mix < 0.0 || self.mix > 1.0 {
            return Err("gate.mix must be in [0, 1]".to_string());
        }
        Ok(())
    }
}

/// Independently toggled effects, each mapped to a fixed target parameter
/// value when active and a neutral value when inactive. Transitions ride the
/// params' smoothing, never jumps.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct FxState {
    pub delay: bool,
    pub chorus: bool,
    pub highpass: bool,
    pub distortion: bool,
    pub phaser: bool,
    pub reverb: bool,
    pub saturation: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AudioParams {
    pub osc_a_wave: String,
    pub osc_b_wave: String,
    pub drive_curve_amount: f32,
    pub filter_cutoff_hz: f32,
    pub filter_q: f32,
}

impl Default for AudioParams {
    fn default() -> Self {
        Self {
            osc_a_wave: "sawtooth".to_string(),
            osc_b_wave: "square".to_string(),
            drive_curve_amount: 1.5,
            filter_cutoff_hz: 1200.0,
            filter_q: 0.9,
        }
    }
}
