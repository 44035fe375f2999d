pub mod arp;
pub mod gate;
pub mod modulation;
pub mod patterns;
pub mod scheduler;
pub mod session;
pub mod settings;
pub mod stacks;
pub mod state;

pub use modulation::ModInput;
pub use scheduler::{LookaheadScheduler, ScheduledEvent};
pub use session::{Command, Engine};
pub use state::EngineState;
