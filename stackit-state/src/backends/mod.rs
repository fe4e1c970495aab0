//! Backend implementations for state storage

mod local;

pub use local::LocalBackend;

use crate::backend::{BackendConfig, BackendError, BackendResult, StateBackend};

/// Create the backend named by `backend_type`
pub async fn create_backend(config: &BackendConfig) -> BackendResult<Box<dyn StateBackend>> {
    match config.backend_type.as_str() {
        "local" => Ok(Box::new(LocalBackend::from_config(config)?)),
        other => Err(BackendError::UnsupportedBackend(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn unsupported_backend() {
        let config = BackendConfig {
            backend_type: "s3".to_string(),
            attributes: BTreeMap::new(),
        };
        match create_backend(&config).await {
            Err(BackendError::UnsupportedBackend(name)) => assert_eq!(name, "s3"),
            other => panic!("expected UnsupportedBackend, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn local_backend_is_created() {
        assert!(create_backend(&BackendConfig::local()).await.is_ok());
    }
}
