use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KgError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Backend returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid identifier: {0}")]
    InvalidId(String),
}

impl KgError {
    /// Failures worth retrying later rather than reporting as bad input
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Unavailable(_) => true,
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Decode(_) | Self::InvalidResponse(_) | Self::InvalidId(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, KgError>;
