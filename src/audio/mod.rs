pub mod guard;
pub mod output;
pub mod writer;

pub use guard::{OutputGuard, OutputGuardMeter, OutputGuardMode, PeakLimiterParams, SoftClipParams};
pub use output::AudioOutput;
pub use writer::WavOutput;
