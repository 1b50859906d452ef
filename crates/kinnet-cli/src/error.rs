use kinnet::engine::error::EngineError;
use kinnet::engine::wells::WellListError;
use kinnet::workflows::network::NetworkWorkflowError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    KinnetCore(#[from] EngineError),

    #[error(transparent)]
    Wells(#[from] WellListError),

    #[error(transparent)]
    Network(#[from] NetworkWorkflowError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse file '{path}': {source}", path = path.display())]
    FileParsing {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid argument: {0}")]
    Argument(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
