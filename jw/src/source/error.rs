//! Remote job source error types

use thiserror::Error;

/// Errors that can occur while querying the remote job source
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("API error {status} [{code}]: {message}")]
    Api { status: u16, code: String, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API key not found. Set the {0} environment variable.")]
    MissingApiKey(String),
}

impl SourceError {
    /// Check if retrying on the next poll cycle may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            SourceError::Api { status, .. } => matches!(*status, 408 | 429) || *status >= 500,
            SourceError::Network(_) => true,
            SourceError::InvalidResponse(_) => false,
            SourceError::Json(_) => false,
            SourceError::MissingApiKey(_) => false,
        }
    }

    /// Backend error code, if the source supplied one
    pub fn code(&self) -> Option<&str> {
        match self {
            SourceError::Api { code, .. } if !code.is_empty() => Some(code),
            _ => None,
        }
    }
}
