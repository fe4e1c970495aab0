//! STACKIT State Management
//!
//! Persists what `stackit-tf` learned from the provider: one entry per
//! resource or data source block, keyed by `type.name`, together with the
//! composite id the provider reported.
//!
//! - **StateFile**: all stored resources plus serial and lineage
//! - **StateBackend**: storage for the state file and its lock
//! - **LockInfo**: who holds the state and until when
//!
//! ```ignore
//! use stackit_state::{create_backend, BackendConfig};
//!
//! let backend = create_backend(&BackendConfig::local()).await?;
//! let lock = backend.acquire_lock("apply").await?;
//! let mut state = backend.read_state().await?.unwrap_or_default();
//! // ... apply changes ...
//! state.increment_serial();
//! backend.write_state(&state).await?;
//! backend.release_lock(&lock).await?;
//! ```

pub mod backend;
pub mod backends;
pub mod lock;
pub mod state;

pub use backend::{BackendConfig, BackendError, BackendResult, StateBackend};
pub use backends::{LocalBackend, create_backend};
pub use lock::LockInfo;
pub use state::{ResourceMode, ResourceState, StateFile};
