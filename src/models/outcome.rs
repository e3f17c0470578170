use serde::{Deserialize, Serialize};

use crate::error::FetchError;
use crate::models::record::{FunctionRecord, RepoId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ErrorKind {
    Timeout,
    Http(u16),
    Decode,
    Network,
    Cancelled,
}

impl From<&FetchError> for ErrorKind {
    fn from(err: &FetchError) -> Self {
        match err {
            FetchError::Timeout => ErrorKind::Timeout,
            FetchError::Http(status) => ErrorKind::Http(status.as_u16()),
            FetchError::Decode(_) => ErrorKind::Decode,
            FetchError::Network(_) => ErrorKind::Network,
            FetchError::Cancelled => ErrorKind::Cancelled,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Timeout => write!(f, "Timeout"),
            ErrorKind::Http(status) => write!(f, "Http{}", status),
            ErrorKind::Decode => write!(f, "Decode"),
            ErrorKind::Network => write!(f, "Network"),
            ErrorKind::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl From<ErrorKind> for String {
    fn from(kind: ErrorKind) -> Self {
        kind.to_string()
    }
}

impl TryFrom<String> for ErrorKind {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        match value.as_str() {
            "Timeout" => Ok(ErrorKind::Timeout),
            "Decode" => Ok(ErrorKind::Decode),
            "Network" => Ok(ErrorKind::Network),
            "Cancelled" => Ok(ErrorKind::Cancelled),
            other => other
                .strip_prefix("Http")
                .and_then(|code| code.parse().ok())
                .map(ErrorKind::Http)
                .ok_or_else(|| format!("unknown error kind: {}", other)),
        }
    }
}

// Exactly one per requested repo id per run
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Success {
        repo_id: RepoId,
        records: Vec<FunctionRecord>,
        page_count: u32,
    },
    Failure {
        repo_id: RepoId,
        error_kind: ErrorKind,
        message: String,
        attempts_made: u32,
    },
}

impl FetchOutcome {
    pub fn failure(repo_id: &str, err: &FetchError, attempts_made: u32) -> Self {
        FetchOutcome::Failure {
            repo_id: repo_id.to_string(),
            error_kind: ErrorKind::from(err),
            message: err.to_string(),
            attempts_made,
        }
    }

    pub fn cancelled(repo_id: &str, attempts_made: u32) -> Self {
        Self::failure(repo_id, &FetchError::Cancelled, attempts_made)
    }

    pub fn repo_id(&self) -> &str {
        match self {
            FetchOutcome::Success { repo_id, .. } | FetchOutcome::Failure { repo_id, .. } => repo_id,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success { .. })
    }
}
