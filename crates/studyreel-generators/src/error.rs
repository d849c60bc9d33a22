//! Generator error types.

use thiserror::Error;

use studyreel_media::MediaError;

/// Result type for generator operations.
pub type GeneratorResult<T> = Result<T, GeneratorError>;

/// Errors raised by content generators.
#[derive(Debug, Error)]
pub enum GeneratorError {
    /// Provider rejected the request or returned something unusable
    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Timed out after {0} seconds")]
    Timeout(u64),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GeneratorError {
    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::Upstream(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this is a bounded-wait expiry.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Whether the failure came from local media tooling.
    pub fn is_media(&self) -> bool {
        matches!(self, Self::Media(_))
    }
}
