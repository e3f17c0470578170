use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to persist {path}: {message}")]
    Persist { path: PathBuf, message: String },

    #[error("Report error: {0}")]
    Report(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn persist(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Error::Persist {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

// Failure of a single page request. Stays inside the orchestrator's retry loop.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("HTTP {0}")]
    Http(StatusCode),

    #[error("malformed response: {0}")]
    Decode(String),

    #[error("transport error: {0}")]
    Network(String),

    #[error("cancelled")]
    Cancelled,
}

impl FetchError {
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Http(status) => {
                !matches!(*status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
            }
            FetchError::Cancelled => false,
            FetchError::Timeout | FetchError::Decode(_) | FetchError::Network(_) => true,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if err.is_decode() {
            FetchError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            FetchError::Http(status)
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_failures_are_not_retried() {
        assert!(!FetchError::Http(StatusCode::UNAUTHORIZED).is_retryable());
        assert!(!FetchError::Http(StatusCode::FORBIDDEN).is_retryable());
        assert!(!FetchError::Cancelled.is_retryable());
    }

    #[test]
    fn transient_failures_are_retried() {
        assert!(FetchError::Timeout.is_retryable());
        assert!(FetchError::Http(StatusCode::INTERNAL_SERVER_ERROR).is_retryable());
        assert!(FetchError::Http(StatusCode::BAD_GATEWAY).is_retryable());
        assert!(FetchError::Http(StatusCode::TOO_MANY_REQUESTS).is_retryable());
        assert!(FetchError::Decode("truncated body".into()).is_retryable());
        assert!(FetchError::Network("connection reset".into()).is_retryable());
    }
}
