pub mod engine;
pub mod messages;
pub mod selector;
pub mod sequencer;
pub mod state;
pub mod types;
mod wait;

pub use engine::CycleDriver;
pub use sequencer::{CycleReport, NotificationSequencer};
pub use types::{Candidate, RunMode, SelectorConfig, SequencerConfig};
