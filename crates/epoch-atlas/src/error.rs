use epoch_atlas_lib::AtlasError;
use std::path::PathBuf;

/// Errors surfaced by the command-line front end
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Atlas(#[from] AtlasError),

    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid engine config {}: {source}", path.display())]
    Config {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Failed to render output: {0}")]
    Output(#[from] serde_json::Error),

    #[error("Failed to write output: {0}")]
    Write(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
