//! Error types for the Cloudlift core crate.

use thiserror::Error;

/// Top-level error type for all Cloudlift operations.
#[derive(Debug, Error)]
pub enum CloudliftError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("directory API error ({status}): {code} - {message}")]
    DirectoryApi {
        status: u16,
        code: String,
        message: String,
    },

    #[error("sync error: {0}")]
    Sync(String),
}

impl CloudliftError {
    /// True for not-found-class failures (missing object, or a just-created
    /// object that is not yet visible to the directory).
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::DirectoryApi { status, code, .. } => {
                *status == 404 || code == "Request_ResourceNotFound"
            }
            _ => false,
        }
    }

    /// True when the directory rejected a write because the object (or the
    /// membership reference) already exists.
    pub fn is_already_exists(&self) -> bool {
        match self {
            Self::DirectoryApi {
                status, message, ..
            } => {
                *status == 409
                    || (*status == 400 && message.to_lowercase().contains("already exist"))
            }
            _ => false,
        }
    }
}

impl From<serde_json::Error> for CloudliftError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// A convenience Result alias that defaults to [`CloudliftError`].
pub type Result<T> = std::result::Result<T, CloudliftError>;
