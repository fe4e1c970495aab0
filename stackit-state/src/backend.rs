//! State backend trait and error types

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::lock::LockInfo;
use crate::state::StateFile;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("State is locked by {who} (lock ID: {lock_id}, operation: {operation})")]
    Locked {
        lock_id: String,
        who: String,
        operation: String,
    },

    #[error("Lock not found: {0}")]
    LockNotFound(String),

    #[error("Lock ID mismatch: expected {expected}, got {actual}")]
    LockMismatch { expected: String, actual: String },

    #[error("Unsupported backend type: {0}")]
    UnsupportedBackend(String),

    #[error("Backend configuration error: {0}")]
    Configuration(String),

    #[error("Invalid state file: {0}")]
    InvalidState(String),

    /// Refuses to overwrite a state that belongs to another history
    #[error("State lineage mismatch: expected {expected}, got {actual}")]
    LineageMismatch { expected: String, actual: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BackendError {
    pub fn locked(lock: &LockInfo) -> Self {
        Self::Locked {
            lock_id: lock.id.clone(),
            who: lock.who.clone(),
            operation: lock.operation.clone(),
        }
    }
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Storage for the state file and its lock
#[async_trait]
pub trait StateBackend: Send + Sync {
    /// `None` before the first write
    async fn read_state(&self) -> BackendResult<Option<StateFile>>;

    /// Callers increment the serial before writing
    async fn write_state(&self, state: &StateFile) -> BackendResult<()>;

    /// Fails while another unexpired lock is held
    async fn acquire_lock(&self, operation: &str) -> BackendResult<LockInfo>;

    async fn release_lock(&self, lock: &LockInfo) -> BackendResult<()>;

    async fn force_unlock(&self, lock_id: &str) -> BackendResult<()>;
}

/// The `backend` block of the host configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BackendConfig {
    #[serde(rename = "type")]
    pub backend_type: String,
    #[serde(flatten)]
    pub attributes: BTreeMap<String, Value>,
}

impl BackendConfig {
    pub fn local() -> Self {
        Self {
            backend_type: "local".to_string(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self::local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn locked_error_names_holder() {
        let lock = LockInfo::new("apply");
        let error = BackendError::locked(&lock);
        assert!(error.to_string().contains(&lock.who));
        assert!(error.to_string().contains("operation: apply"));
    }

    #[test]
    fn backend_block_deserializes() {
        let config: BackendConfig =
            serde_json::from_value(json!({"type": "local", "path": "infra.state.json"})).unwrap();
        assert_eq!(config.backend_type, "local");
        assert_eq!(config.get_string("path"), Some("infra.state.json"));
        assert_eq!(BackendConfig::default().backend_type, "local");
    }
}
