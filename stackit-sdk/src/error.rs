//! SDK error types

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SdkError {
    #[error("API returned status {status_code}: {message}")]
    Api { status_code: u16, message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to decode response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("timed out after {0:?} waiting for the operation to finish")]
    WaitTimeout(Duration),

    #[error("operation failed: {0}")]
    WaitFailed(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl SdkError {
    pub fn api(status_code: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status_code,
            message: message.into(),
        }
    }

    /// HTTP status of an API error
    pub fn status_code(&self) -> Option<u16> {
        match self {
            SdkError::Api { status_code, .. } => Some(*status_code),
            SdkError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// 404 Not Found or 410 Gone
    pub fn is_not_found(&self) -> bool {
        matches!(self.status_code(), Some(404 | 410))
    }

    /// Gateway errors that are worth retrying while polling
    pub fn is_transient(&self) -> bool {
        matches!(self.status_code(), Some(502..=504))
    }
}

pub type SdkResult<T> = Result<T, SdkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_status_codes() {
        assert!(SdkError::api(404, "missing").is_not_found());
        assert!(SdkError::api(410, "gone").is_not_found());
        assert!(!SdkError::api(403, "forbidden").is_not_found());
        assert!(SdkError::api(503, "unavailable").is_transient());
        assert!(!SdkError::api(500, "boom").is_transient());
        assert_eq!(SdkError::WaitFailed("x".into()).status_code(), None);
    }

    #[test]
    fn api_error_display() {
        let err = SdkError::api(409, "conflict");
        assert_eq!(err.to_string(), "API returned status 409: conflict");
    }
}
