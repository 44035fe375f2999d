pub mod audio;
pub mod config;
pub mod core;
pub mod drums;
pub mod engine;
pub mod graph;

pub use config::EngineConfig;
pub use engine::{Engine, EngineState, ModInput};
pub use graph::SignalGraph;
