//! Error types shared across Decksnap crates.

use std::path::PathBuf;

/// Top-level error type for Decksnap operations.
#[derive(Debug, thiserror::Error)]
pub enum DecksnapError {
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Thumbnail error: {message}")]
    Thumbnail { message: String },

    #[error("Render error: {message}")]
    Render { message: String },

    #[error("QR encoding error: {message}")]
    Qr { message: String },

    #[error("Input is not a PNG stream")]
    NotPng,

    #[error("Malformed container: {message}")]
    MalformedContainer { message: String },

    #[error("Metadata error: {message}")]
    Metadata { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using DecksnapError.
pub type DecksnapResult<T> = Result<T, DecksnapError>;

impl DecksnapError {
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: msg.into(),
        }
    }

    pub fn thumbnail(msg: impl Into<String>) -> Self {
        Self::Thumbnail {
            message: msg.into(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    pub fn qr(msg: impl Into<String>) -> Self {
        Self::Qr {
            message: msg.into(),
        }
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedContainer {
            message: msg.into(),
        }
    }

    pub fn metadata(msg: impl Into<String>) -> Self {
        Self::Metadata {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Whether this error came from request validation (nothing was drawn).
    pub fn is_invalid_request(&self) -> bool {
        matches!(self, Self::InvalidRequest { .. })
    }
}
