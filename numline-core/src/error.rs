use crate::input::Key;

/// Malformed or inconsistent configuration. Always raised before the first
/// block starts.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing configuration key `{key}`")]
    MissingKey { key: &'static str },

    #[error("configuration key `{key}` has {found} entries but NO_BLOCKS is {expected}")]
    BlockCountMismatch {
        key: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("invalid value for `{key}`: {reason}")]
    InvalidValue { key: &'static str, reason: String },

    #[error(
        "block {block}: cannot draw {requested} distinct whole numbers from a range of {available}"
    )]
    InfeasibleSampling {
        block: usize,
        requested: usize,
        available: usize,
    },

    #[error("cannot parse configuration: {0}")]
    Parse(String),

    #[error("cannot read configuration: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that end a session.
#[derive(Debug, thiserror::Error)]
pub enum ExperimentError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Experiment finished by user! {key} pressed.")]
    UserAbort { key: Key },

    #[error("cannot write results: {0}")]
    Sink(#[source] std::io::Error),

    #[error(transparent)]
    Presentation(#[from] anyhow::Error),
}

impl ExperimentError {
    pub fn is_user_abort(&self) -> bool {
        matches!(self, ExperimentError::UserAbort { .. })
    }
}

pub type Result<T, E = ExperimentError> = std::result::Result<T, E>;
