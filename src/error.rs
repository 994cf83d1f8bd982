use std::path::PathBuf;

use thiserror::Error;

/// Errors that stop a command before or outside the per-endpoint run.
///
/// Per-endpoint failures never surface here; they are recorded in the
/// run report instead.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("failed to access `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("history database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid corpus: {0}")]
    InvalidCorpus(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

impl ReplayError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ReplayError>;
