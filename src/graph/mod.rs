pub mod analysis;
pub mod build;
pub mod convolver;
pub mod nodes;
pub mod params;

pub use build::{param, SignalGraph};
pub use nodes::Waveform;
pub use params::ParamId;
