//! Errors raised inside resource operations
//!
//! Every operation runs as a fallible function and converts its error into a
//! single diagnostic at the end (see [`crate::utils::finish`]).

use stackit_core::CoreError;
use stackit_sdk::SdkError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error(
        "Provider not configured. Expected a configured provider before this operation. Please report this issue to the provider developers."
    )]
    NotConfigured,

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("{context}: {}", describe(.source))]
    Api { context: String, source: SdkError },

    #[error("{0}")]
    Invalid(String),
}

impl ProviderError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }

    /// Status of the underlying API error, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ProviderError::Api { source, .. } => source.status_code(),
            _ => None,
        }
    }
}

/// Attach a context message to SDK results
pub trait ApiContext<T> {
    fn context(self, context: &str) -> ProviderResult<T>;
}

impl<T> ApiContext<T> for Result<T, SdkError> {
    fn context(self, context: &str) -> ProviderResult<T> {
        self.map_err(|source| ProviderError::Api {
            context: context.to_string(),
            source,
        })
    }
}

/// Status-specific explanation of an API error
pub fn describe(err: &SdkError) -> String {
    match err.status_code() {
        Some(401) => format!("{}. Check that the service account token is valid", err),
        Some(403) => format!(
            "{}. The service account is not allowed to perform this operation",
            err
        ),
        Some(404) => format!("{}. The resource was not found", err),
        _ => err.to_string(),
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;
