use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Unauthorized,
    Forbidden,
    NotFound,
    Validation,
    RateLimited,
    Internal,
    Unknown,
}

impl ErrorCode {
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            400 | 422 => Self::Validation,
            429 => Self::RateLimited,
            500..=599 => Self::Internal,
            _ => Self::Unknown,
        }
    }
}

/// Error document returned by the remote API alongside non-2xx statuses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation_url: Option<String>,
}

/// Any failure of a gateway call, network or API level.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("{code:?} ({status}): {human_message}")]
    Api {
        code: ErrorCode,
        status: u16,
        human_message: String,
    },
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("malformed response: {0}")]
    Decode(String),
}

impl FetchError {
    pub fn api(status: u16, human_message: impl Into<String>) -> Self {
        Self::Api {
            code: ErrorCode::from_status(status),
            status,
            human_message: human_message.into(),
        }
    }

    pub fn rate_limited(status: u16, human_message: impl Into<String>) -> Self {
        Self::Api {
            code: ErrorCode::RateLimited,
            status,
            human_message: human_message.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Api { code, .. } => *code,
            Self::Transport(_) | Self::Decode(_) => ErrorCode::Unknown,
        }
    }

    /// The single message a view shows for this failure.
    pub fn human_message(&self) -> String {
        match self {
            Self::Api { human_message, .. } => human_message.clone(),
            Self::Transport(detail) => format!("Network error: {detail}"),
            Self::Decode(detail) => format!("Unexpected response from the API: {detail}"),
        }
    }
}
