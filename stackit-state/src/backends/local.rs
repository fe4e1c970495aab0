//! Local file backend
//!
//! State is stored as pretty JSON (default: `stackit.state.json`) next to a
//! `.lock` file holding the current [`LockInfo`].

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::backend::{BackendConfig, BackendError, BackendResult, StateBackend};
use crate::lock::LockInfo;
use crate::state::StateFile;

pub struct LocalBackend {
    state_path: PathBuf,
    lock_path: PathBuf,
}

impl LocalBackend {
    pub const DEFAULT_STATE_FILE: &'static str = "stackit.state.json";

    pub fn new() -> Self {
        Self::with_path(PathBuf::from(Self::DEFAULT_STATE_FILE))
    }

    pub fn with_path(state_path: PathBuf) -> Self {
        let lock_path = state_path.with_extension("lock");
        Self { state_path, lock_path }
    }

    pub fn from_config(config: &BackendConfig) -> BackendResult<Self> {
        match config.attributes.get("path") {
            None => Ok(Self::new()),
            Some(value) => value
                .as_str()
                .filter(|p| !p.is_empty())
                .map(|p| Self::with_path(PathBuf::from(p)))
                .ok_or_else(|| BackendError::Configuration("path must be a non-empty string".to_string())),
        }
    }

    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    async fn read_lock(&self) -> BackendResult<Option<LockInfo>> {
        match fs::read_to_string(&self.lock_path).await {
            Ok(content) => Ok(Some(serde_json::from_str(&content).map_err(|e| {
                BackendError::InvalidState(format!("Failed to parse lock file: {}", e))
            })?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl Default for LocalBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StateBackend for LocalBackend {
    async fn read_state(&self) -> BackendResult<Option<StateFile>> {
        let content = match fs::read_to_string(&self.state_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let state = serde_json::from_str(&content)
            .map_err(|e| BackendError::InvalidState(format!("Failed to parse state file: {}", e)))?;
        Ok(Some(state))
    }

    async fn write_state(&self, state: &StateFile) -> BackendResult<()> {
        if let Some(existing) = self.read_state().await?
            && existing.lineage != state.lineage
        {
            return Err(BackendError::LineageMismatch {
                expected: existing.lineage,
                actual: state.lineage.clone(),
            });
        }

        // write to a sibling file first so a crash never leaves a truncated state
        let tmp_path = self.state_path.with_extension("json.tmp");
        fs::write(&tmp_path, serde_json::to_string_pretty(state)?).await?;
        fs::rename(&tmp_path, &self.state_path).await?;
        log::debug!("state serial {} written to {}", state.serial, self.state_path.display());
        Ok(())
    }

    async fn acquire_lock(&self, operation: &str) -> BackendResult<LockInfo> {
        if let Some(existing) = self.read_lock().await? {
            if !existing.is_expired() {
                return Err(BackendError::locked(&existing));
            }
            log::warn!("Removing expired lock {} held by {}", existing.id, existing.who);
            fs::remove_file(&self.lock_path).await?;
        }

        let lock = LockInfo::new(operation);
        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.lock_path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                // another process won the race
                return match self.read_lock().await? {
                    Some(holder) => Err(BackendError::locked(&holder)),
                    None => Err(e.into()),
                };
            }
            Err(e) => return Err(e.into()),
        };
        file.write_all(serde_json::to_string_pretty(&lock)?.as_bytes()).await?;
        file.flush().await?;
        Ok(lock)
    }

    async fn release_lock(&self, lock: &LockInfo) -> BackendResult<()> {
        let existing = self
            .read_lock()
            .await?
            .ok_or_else(|| BackendError::LockNotFound(lock.id.clone()))?;
        if existing.id != lock.id {
            return Err(BackendError::LockMismatch {
                expected: lock.id.clone(),
                actual: existing.id,
            });
        }
        fs::remove_file(&self.lock_path).await?;
        Ok(())
    }

    async fn force_unlock(&self, lock_id: &str) -> BackendResult<()> {
        let existing = self
            .read_lock()
            .await?
            .ok_or_else(|| BackendError::LockNotFound(lock_id.to_string()))?;
        if existing.id != lock_id {
            return Err(BackendError::LockMismatch {
                expected: lock_id.to_string(),
                actual: existing.id,
            });
        }
        fs::remove_file(&self.lock_path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;
    use stackit_core::plan::ResourceAddress;
    use tempfile::tempdir;

    use crate::state::ResourceState;

    #[tokio::test]
    async fn read_write_round_trip() {
        let dir = tempdir().unwrap();
        let backend = LocalBackend::with_path(dir.path().join("test.state.json"));
        assert!(backend.read_state().await.unwrap().is_none());

        let mut state = StateFile::new();
        state.upsert(ResourceState::managed(
            &ResourceAddress::new("stackit_resourcemanager_folder", "team"),
            json!({"id": "folder-123", "name": "team"}),
        ));
        state.increment_serial();
        backend.write_state(&state).await.unwrap();

        let read = backend.read_state().await.unwrap().unwrap();
        assert_eq!(read, state);
        let raw = std::fs::read_to_string(backend.state_path()).unwrap();
        assert!(raw.contains("\n  \"serial\": 1"));
    }

    #[tokio::test]
    async fn foreign_lineage_is_refused() {
        let dir = tempdir().unwrap();
        let backend = LocalBackend::with_path(dir.path().join("test.state.json"));
        backend.write_state(&StateFile::with_lineage("a".to_string())).await.unwrap();

        let result = backend.write_state(&StateFile::with_lineage("b".to_string())).await;
        assert!(matches!(result, Err(BackendError::LineageMismatch { .. })));
    }

    #[tokio::test]
    async fn corrupt_state_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.state.json");
        std::fs::write(&path, "{not json").unwrap();
        let result = LocalBackend::with_path(path).read_state().await;
        assert!(matches!(result, Err(BackendError::InvalidState(_))));
    }

    #[tokio::test]
    async fn locking() {
        let dir = tempdir().unwrap();
        let backend = LocalBackend::with_path(dir.path().join("test.state.json"));

        let lock = backend.acquire_lock("apply").await.unwrap();
        assert!(matches!(backend.acquire_lock("plan").await, Err(BackendError::Locked { .. })));

        let mut other = lock.clone();
        other.id = "other".to_string();
        assert!(matches!(backend.release_lock(&other).await, Err(BackendError::LockMismatch { .. })));

        backend.release_lock(&lock).await.unwrap();
        assert!(matches!(backend.release_lock(&lock).await, Err(BackendError::LockNotFound(_))));

        let lock = backend.acquire_lock("destroy").await.unwrap();
        backend.force_unlock(&lock.id).await.unwrap();
    }

    #[tokio::test]
    async fn expired_lock_is_taken_over() {
        let dir = tempdir().unwrap();
        let backend = LocalBackend::with_path(dir.path().join("test.state.json"));
        let stale = LockInfo::with_ttl("apply", Duration::seconds(-1));
        std::fs::write(&backend.lock_path, serde_json::to_string(&stale).unwrap()).unwrap();

        let lock = backend.acquire_lock("apply").await.unwrap();
        assert_ne!(lock.id, stale.id);
    }

    #[test]
    fn path_from_config() {
        let backend = LocalBackend::from_config(&BackendConfig::local()).unwrap();
        assert_eq!(backend.state_path(), Path::new("stackit.state.json"));

        let mut config = BackendConfig::local();
        config.attributes.insert("path".to_string(), json!("envs/prod.state.json"));
        let backend = LocalBackend::from_config(&config).unwrap();
        assert_eq!(backend.lock_path, PathBuf::from("envs/prod.state.lock"));

        config.attributes.insert("path".to_string(), json!(3));
        assert!(LocalBackend::from_config(&config).is_err());
    }
}
