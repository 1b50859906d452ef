use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("No explored species to assemble a network from")]
    NoSpecies,

    #[error("Species '{0}' is not part of the network")]
    UnknownSpecies(String),

    #[error("'{0}' is a bimolecular product, not a well")]
    NotAWell(String),

    #[error("No molecular data for '{0}'")]
    MissingMolecularData(String),

    #[error("No atomic mass for element '{0}'")]
    UnknownElement(String),

    #[error("Temperature must be positive, got {0} K")]
    InvalidTemperature(f64),

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode the network as JSON: {0}")]
    Json(#[from] serde_json::Error),
}
