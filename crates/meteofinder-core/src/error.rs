use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MeteorError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported image {}: {reason}", path.display())]
    UnsupportedImage { path: PathBuf, reason: String },

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Remote verification failed: {0}")]
    Remote(#[from] RemoteError),

    #[error("Image format error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Pipeline error: {0}")]
    Pipeline(String),
}

impl MeteorError {
    /// Shorthand for an [`MeteorError::UnsupportedImage`] without a backing file.
    pub fn unsupported(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::UnsupportedImage {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Failure at the remote verification boundary.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RemoteError {
    #[error("verification service rejected the credentials: {0}")]
    Unauthorized(String),

    #[error("verification service is rate limiting: {0}")]
    RateLimited(String),

    #[error("verification request timed out after {0} seconds")]
    Timeout(u64),

    #[error("transient network failure: {0}")]
    Transient(String),

    #[error("verification failed: {0}")]
    Unknown(String),
}

impl RemoteError {
    /// Only transient network failures are worth a second attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }

    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Self::RateLimited(_))
    }
}

pub type Result<T> = std::result::Result<T, MeteorError>;
