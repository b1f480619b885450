use std::path::PathBuf;

/// Core error type for the command bot.
///
/// Adapter crates map their transport errors into `External` so the dispatcher
/// can treat every collaborator failure the same way.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("locale error: {0}")]
    Locale(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid document: {path}: {reason}")]
    InvalidDocument { path: PathBuf, reason: String },

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
