pub mod kit;
pub mod voice;

pub use kit::{DrumKit, KitParams};
pub use voice::{DrumLane, DrumVoice, DRUM_LANES};
