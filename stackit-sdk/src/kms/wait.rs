//! Wait handlers for KMS resources

use super::{
    KEY_RING_STATE_ACTIVE, KEY_RING_STATE_CREATING, KEY_STATE_ACTIVE, KEY_STATE_CREATING, Key, KeyRing,
    KmsClient, WRAPPING_KEY_STATE_ACTIVE, WRAPPING_KEY_STATE_CREATING, WrappingKey,
};
use crate::error::{SdkError, SdkResult};
use crate::wait::AsyncActionHandler;

fn key_ring_created(key_ring: KeyRing, key_ring_id: &str) -> SdkResult<Option<KeyRing>> {
    match key_ring.state.as_deref() {
        Some(KEY_RING_STATE_ACTIVE) => Ok(Some(key_ring)),
        Some(KEY_RING_STATE_CREATING) | None => Ok(None),
        Some(other) => Err(SdkError::WaitFailed(format!(
            "key ring {} reached state {}",
            key_ring_id, other
        ))),
    }
}

fn key_created(key: Key, key_id: &str) -> SdkResult<Option<Key>> {
    match key.state.as_deref() {
        Some(KEY_STATE_CREATING) | None => Ok(None),
        Some(KEY_STATE_ACTIVE) => Ok(Some(key)),
        // Import-only keys stay without a version until material is imported
        Some(_) if key.import_only == Some(true) => Ok(Some(key)),
        Some(other) => Err(SdkError::WaitFailed(format!("key {} reached state {}", key_id, other))),
    }
}

fn wrapping_key_created(key: WrappingKey, wrapping_key_id: &str) -> SdkResult<Option<WrappingKey>> {
    match key.state.as_deref() {
        Some(WRAPPING_KEY_STATE_ACTIVE) => Ok(Some(key)),
        Some(WRAPPING_KEY_STATE_CREATING) | None => Ok(None),
        Some(other) => Err(SdkError::WaitFailed(format!(
            "wrapping key {} reached state {}",
            wrapping_key_id, other
        ))),
    }
}

/// Wait until a new key ring is active
pub fn create_key_ring_wait_handler<'a>(
    client: &'a KmsClient,
    project_id: &'a str,
    region: &'a str,
    key_ring_id: &'a str,
) -> AsyncActionHandler<'a, KeyRing> {
    AsyncActionHandler::new(move || {
        Box::pin(async move {
            let key_ring = client.get_key_ring(project_id, region, key_ring_id).await?;
            key_ring_created(key_ring, key_ring_id)
        })
    })
}

/// Wait until a new key has left the creating state
pub fn create_key_wait_handler<'a>(
    client: &'a KmsClient,
    project_id: &'a str,
    region: &'a str,
    key_ring_id: &'a str,
    key_id: &'a str,
) -> AsyncActionHandler<'a, Key> {
    AsyncActionHandler::new(move || {
        Box::pin(async move {
            let key = client.get_key(project_id, region, key_ring_id, key_id).await?;
            key_created(key, key_id)
        })
    })
}

/// Wait until a new wrapping key is active
pub fn create_wrapping_key_wait_handler<'a>(
    client: &'a KmsClient,
    project_id: &'a str,
    region: &'a str,
    key_ring_id: &'a str,
    wrapping_key_id: &'a str,
) -> AsyncActionHandler<'a, WrappingKey> {
    AsyncActionHandler::new(move || {
        Box::pin(async move {
            let key = client
                .get_wrapping_key(project_id, region, key_ring_id, wrapping_key_id)
                .await?;
            wrapping_key_created(key, wrapping_key_id)
        })
    })
}
