use crate::config::ExperimentConfig;
use crate::participant::Participant;
use numline_core::{ConfigError, Layout};
use numline_timing::Timer;
use rand::Rng;

/// Everything a session needs, built once before the first frame.
pub struct ExperimentContext<T: Timer, R: Rng> {
    pub config: ExperimentConfig,
    pub layout: Layout,
    /// Identifier written into every record.
    pub participant: String,
    pub timer: T,
    pub rng: R,
}

impl<T: Timer, R: Rng> ExperimentContext<T, R> {
    /// Validates `config` and derives the stimulus layout from it.
    pub fn new(
        config: ExperimentConfig,
        participant: &Participant,
        timer: T,
        rng: R,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let layout = config.layout();
        Ok(Self {
            config,
            layout,
            participant: participant.identifier(),
            timer,
            rng,
        })
    }
}
