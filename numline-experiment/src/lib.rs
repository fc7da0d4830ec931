pub mod config;
pub mod context;
pub mod controller;
pub mod interaction;
pub mod participant;
pub mod schedule;
pub mod sink;

pub use config::{BlockConfig, ExperimentConfig};
pub use context::ExperimentContext;
pub use controller::{PREPARE_PAUSE, SessionSummary, run_session};
pub use interaction::{Interaction, MarkerState, REMINDER_PAUSE, Step, TrialOutcome, run_trial};
pub use participant::{Participant, Sex};
pub use schedule::{BlockSchedule, schedule_block};
pub use sink::{CsvSink, MemorySink, ResultLog, ResultSink};
