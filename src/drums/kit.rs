use serde::{Deserialize, Serialize};

/// Drum kit selection. Affects timbre constants only, never pattern or
/// timing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DrumKit {
    #[default]
    Tr808,
    Tr909,
    Acoustic,
    Industrial,
    Lofi,
}

impl DrumKit {
    pub fn from_name(name: &str) -> Self {
        match name {
            "808" | "tr808" => Self::Tr808,
            "909" | "tr909" => Self::Tr909,
            "acoustic" => Self::Acoustic,
            "industrial" => Self::Industrial,
            "lofi" => Self::Lofi,
            _ => Self::default(),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct KickParams {
    pub start_hz: f32,
    pub end_hz: f32,
    pub pitch_decay_sec: f32,
    pub amp_decay_sec: f32,
    pub click: f32,
    pub gain: f32,
}

#[derive(Clone, Copy, Debug)]
pub struct SnareParams {
    pub tone_hz: f32,
    pub tone_mix: f32,
    pub band_hz: f32,
    pub band_q: f32,
    pub decay_sec: f32,
    pub gain: f32,
}

#[derive(Clone, Copy, Debug)]
pub struct HihatParams {
    pub hp_hz: f32,
    pub decay_sec: f32,
    pub gain: f32,
}

#[derive(Clone, Copy, Debug)]
pub struct ClapParams {
    pub band_hz: f32,
    pub band_q: f32,
    pub burst_spacing_sec: f32,
    pub bursts: u32,
    pub decay_sec: f32,
    pub gain: f32,
}

#[derive(Clone, Copy, Debug)]
pub struct KitParams {
    pub kick: KickParams,
    pub snare: SnareParams,
    pub hihat: HihatParams,
    pub clap: ClapParams,
}

impl KitParams {
    pub fn for_kit(kit: DrumKit) -> Self {
        match kit {
            DrumKit::Tr808 => Self {
                kick: KickParams {
                    start_hz: 120.0,
                    end_hz: 45.0,
                    pitch_decay_sec: 0.08,
                    amp_decay_sec: 0.45,
                    click: 0.1,
                    gain: 1.0,
                },
                snare: SnareParams {
                    tone_hz: 180.0,
                    tone_mix: 0.35,
                    band_hz: 1800.0,
                    band_q: 1.2,
                    decay_sec: 0.18,
                    gain: 0.8,
                },
                hihat: HihatParams {
                    hp_hz: 7000.0,
                    decay_sec: 0.06,
                    gain: 0.5,
                },
                clap: ClapParams {
                    band_hz: 1200.0,
                    band_q: 2.0,
                    burst_spacing_sec: 0.012,
                    bursts: 3,
                    decay_sec: 0.16,
                    gain: 0.7,
                },
            },
            DrumKit::Tr909 => Self {
                kick: KickParams {
                    start_hz: 180.0,
                    end_hz: 55.0,
                    pitch_decay_sec: 0.05,
                    amp_decay_sec: 0.3,
                    click: 0.35,
                    gain: 1.0,
                },
                snare: SnareParams {
                    tone_hz: 220.0,
                    tone_mix: 0.45,
                    band_hz: 2200.0,
                    band_q: 1.0,
                    decay_sec: 0.14,
                    gain: 0.85,
                },
                hihat: HihatParams {
                    hp_hz: 8500.0,
                    decay_sec: 0.05,
                    gain: 0.55,
                },
                clap: ClapParams {
                    band_hz: 1400.0,
                    band_q: 1.8,
                    burst_spacing_sec: 0.01,
                    bursts: 4,
                    decay_sec: 0.14,
                    gain: 0.75,
                },
            },
            DrumKit::Acoustic => Self {
                kick: KickParams {
                    start_hz: 95.0,
                    end_hz: 60.0,
                    pitch_decay_sec: 0.03,
                    amp_decay_sec: 0.22,
                    click: 0.2,
                    gain: 0.9,
                },
                snare: SnareParams {
                    tone_hz: 200.0,
                    tone_mix: 0.5,
                    band_hz: 1500.0,
                    band_q: 0.8,
                    decay_sec: 0.25,
                    gain: 0.8,
                },
                hihat: HihatParams {
                    hp_hz: 6000.0,
                    decay_sec: 0.12,
                    gain: 0.45,
                },
                clap: ClapParams {
                    band_hz: 1000.0,
                    band_q: 1.2,
                    burst_spacing_sec: 0.015,
                    bursts: 2,
                    decay_sec: 0.2,
                    gain: 0.6,
                },
            },
            DrumKit::Industrial => Self {
                kick: KickParams {
                    start_hz: 160.0,
                    end_hz: 38.0,
                    pitch_decay_sec: 0.12,
                    amp_decay_sec: 0.6,
                    click: 0.5,
                    gain: 1.0,
                },
                snare: SnareParams {
                    tone_hz: 140.0,
                    tone_mix: 0.25,
                    band_hz: 2800.0,
                    band_q: 2.5,
                    decay_sec: 0.3,
                    gain: 0.9,
                },
                hihat: HihatParams {
                    hp_hz: 5000.0,
                    decay_sec: 0.09,
                    gain: 0.6,
                },
                clap: ClapParams {
                    band_hz: 1800.0,
                    band_q: 3.0,
                    burst_spacing_sec: 0.008,
                    bursts: 5,
                    decay_sec: 0.25,
                    gain: 0.8,
                },
            },
            DrumKit::Lofi => Self {
                kick: KickParams {
                    start_hz: 100.0,
                    end_hz: 50.0,
                    pitch_decay_sec: 0.06,
                    amp_decay_sec: 0.25,
                    click: 0.05,
                    gain: 0.85,
                },
                snare: SnareParams {
                    tone_hz: 160.0,
                    tone_mix: 0.3,
                    band_hz: 1200.0,
                    band_q: 0.9,
                    decay_sec: 0.12,
                    gain: 0.7,
                },
                hihat: HihatParams {
                    hp_hz: 4500.0,
                    decay_sec: 0.04,
                    gain: 0.4,
                },
                clap: ClapParams {
                    band_hz: 900.0,
                    band_q: 1.5,
                    burst_spacing_sec: 0.014,
                    bursts: 3,
                    decay_sec: 0.13,
                    gain: 0.6,
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_kit_name_falls_back() {
        assert_eq!(DrumKit::from_name("no-such-kit"), DrumKit::Tr808);
    }

    #[test]
    fn kits_differ_in_timbre() {
        let a = KitParams::for_kit(DrumKit::Tr808);
        let b = KitParams::for_kit(DrumKit::Tr909);
        assert_ne!(a.kick.start_hz, b.kick.start_hz);
        assert_ne!(a.hihat.hp_hz, b.hihat.hp_hz);
    }
}
