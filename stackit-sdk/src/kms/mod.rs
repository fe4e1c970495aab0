//! Key Management Service: key rings, keys and wrapping keys

mod model;
pub mod wait;

pub use model::*;

use crate::client::ApiClient;
use crate::config::Configuration;
use crate::error::SdkResult;

pub const SERVICE: &str = "kms";

#[derive(Debug, Clone)]
pub struct KmsClient {
    api: ApiClient,
}

impl KmsClient {
    pub fn new(config: Configuration) -> SdkResult<Self> {
        Ok(Self {
            api: ApiClient::new(config)?,
        })
    }

    fn key_rings_path(project_id: &str, region: &str) -> String {
        format!("/v1beta/projects/{}/regions/{}/keyrings", project_id, region)
    }

    fn key_ring_path(project_id: &str, region: &str, key_ring_id: &str) -> String {
        format!("{}/{}", Self::key_rings_path(project_id, region), key_ring_id)
    }

    // ========== Key rings ==========

    pub async fn create_key_ring(
        &self,
        project_id: &str,
        region: &str,
        payload: &CreateKeyRingPayload,
    ) -> SdkResult<KeyRing> {
        self.api
            .post(&Self::key_rings_path(project_id, region), payload)
            .await
    }

    pub async fn get_key_ring(&self, project_id: &str, region: &str, key_ring_id: &str) -> SdkResult<KeyRing> {
        self.api
            .get(&Self::key_ring_path(project_id, region, key_ring_id))
            .await
    }

    pub async fn delete_key_ring(&self, project_id: &str, region: &str, key_ring_id: &str) -> SdkResult<()> {
        self.api
            .delete(&Self::key_ring_path(project_id, region, key_ring_id))
            .await
    }

    // ========== Keys ==========

    pub async fn create_key(
        &self,
        project_id: &str,
        region: &str,
        key_ring_id: &str,
        payload: &CreateKeyPayload,
    ) -> SdkResult<Key> {
        let path = format!("{}/keys", Self::key_ring_path(project_id, region, key_ring_id));
        self.api.post(&path, payload).await
    }

    pub async fn get_key(&self, project_id: &str, region: &str, key_ring_id: &str, key_id: &str) -> SdkResult<Key> {
        let path = format!("{}/keys/{}", Self::key_ring_path(project_id, region, key_ring_id), key_id);
        self.api.get(&path).await
    }

    /// Schedules the key for deletion
    pub async fn delete_key(&self, project_id: &str, region: &str, key_ring_id: &str, key_id: &str) -> SdkResult<()> {
        let path = format!("{}/keys/{}", Self::key_ring_path(project_id, region, key_ring_id), key_id);
        self.api.delete(&path).await
    }

    // ========== Wrapping keys ==========

    pub async fn create_wrapping_key(
        &self,
        project_id: &str,
        region: &str,
        key_ring_id: &str,
        payload: &CreateWrappingKeyPayload,
    ) -> SdkResult<WrappingKey> {
        let path = format!("{}/wrappingkeys", Self::key_ring_path(project_id, region, key_ring_id));
        self.api.post(&path, payload).await
    }

    pub async fn get_wrapping_key(
        &self,
        project_id: &str,
        region: &str,
        key_ring_id: &str,
        wrapping_key_id: &str,
    ) -> SdkResult<WrappingKey> {
        let path = format!(
            "{}/wrappingkeys/{}",
            Self::key_ring_path(project_id, region, key_ring_id),
            wrapping_key_id
        );
        self.api.get(&path).await
    }

    pub async fn delete_wrapping_key(
        &self,
        project_id: &str,
        region: &str,
        key_ring_id: &str,
        wrapping_key_id: &str,
    ) -> SdkResult<()> {
        let path = format!(
            "{}/wrappingkeys/{}",
            Self::key_ring_path(project_id, region, key_ring_id),
            wrapping_key_id
        );
        self.api.delete(&path).await
    }
}
