use std::path::PathBuf;
use thiserror::Error;

use super::backend::BackendError;
use super::config::ConfigError;
use super::wells::WellListError;
use crate::core::models::structure::StructureError;
use crate::families::UnknownFamily;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    UnknownFamily(#[from] UnknownFamily),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Invalid structure: {0}")]
    Structure(#[from] StructureError),

    #[error("Well list error: {0}")]
    Wells(#[from] WellListError),

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write table '{path}': {source}")]
    Table {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Malformed molecular data '{path}': {message}")]
    MolecularData { path: PathBuf, message: String },

    #[error("Optimization of the reactant well '{job}' failed")]
    ReactantFailed { job: String },

    #[error("Reactant well '{job}' finished without frequencies")]
    ReactantWithoutFrequencies { job: String },

    #[error("Internal logic error: {0}")]
    Internal(String),
}

/// Terminal reasons for a reaction instance to stop.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ReactionFailure {
    #[error("job '{job}' terminated with an error")]
    JobError { job: String },

    #[error("expected {expected} imaginary frequencies but found {found}")]
    WrongImaginaryFrequencyCount { expected: usize, found: usize },

    #[error("barrier of {barrier:.2} kcal/mol is above the threshold of {threshold:.2} kcal/mol")]
    BarrierTooHigh { barrier: f64, threshold: f64 },

    #[error("the reaction path does not connect the reactant to a distinct product")]
    AmbiguousReactionPath,

    #[error("the product changed identity more than {redirects} times during optimization")]
    ProductDiverged { redirects: usize },

    #[error("job '{job}' finished without the frequencies of its stationary point")]
    MissingFrequencies { job: String },

    #[error("invalid structure: {reason}")]
    InvalidStructure { reason: String },
}

/// A result that is not there yet; the instance retries on the next tick.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("artifact of job '{job}' is unavailable: {reason}")]
pub struct ArtifactUnavailable {
    pub job: String,
    pub reason: String,
}

impl From<BackendError> for ArtifactUnavailable {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Unavailable { job, reason } => Self { job, reason },
            other => Self {
                job: other.job().to_string(),
                reason: other.to_string(),
            },
        }
    }
}
