//! Data Service Access: the shared API behind LogMe, OpenSearch and MariaDB
//!
//! The three services expose the same instance, credential and offering
//! endpoints; only the host differs.

mod model;
pub mod wait;

pub use model::*;

use serde_json::Value;

use crate::client::ApiClient;
use crate::config::Configuration;
use crate::error::SdkResult;

pub const LOGME: &str = "logme";
pub const OPENSEARCH: &str = "opensearch";
pub const MARIADB: &str = "mariadb";

#[derive(Debug, Clone)]
pub struct DsaClient {
    api: ApiClient,
}

impl DsaClient {
    pub fn new(config: Configuration) -> SdkResult<Self> {
        Ok(Self {
            api: ApiClient::new(config)?,
        })
    }

    /// Name of the service this client talks to
    pub fn service(&self) -> &str {
        &self.api.config().service
    }

    fn instances_path(project_id: &str) -> String {
        format!("/v1/projects/{}/instances", project_id)
    }

    fn instance_path(project_id: &str, instance_id: &str) -> String {
        format!("{}/{}", Self::instances_path(project_id), instance_id)
    }

    pub async fn list_offerings(&self, project_id: &str) -> SdkResult<ListOfferingsResponse> {
        self.api
            .get(&format!("/v1/projects/{}/offerings", project_id))
            .await
    }

    // ========== Instances ==========

    pub async fn create_instance(
        &self,
        project_id: &str,
        payload: &CreateInstancePayload,
    ) -> SdkResult<CreateInstanceResponse> {
        self.api.post(&Self::instances_path(project_id), payload).await
    }

    pub async fn get_instance(&self, project_id: &str, instance_id: &str) -> SdkResult<Instance> {
        self.api.get(&Self::instance_path(project_id, instance_id)).await
    }

    pub async fn partial_update_instance(
        &self,
        project_id: &str,
        instance_id: &str,
        payload: &PartialUpdateInstancePayload,
    ) -> SdkResult<()> {
        self.api
            .patch::<_, Value>(&Self::instance_path(project_id, instance_id), payload)
            .await?;
        Ok(())
    }

    pub async fn delete_instance(&self, project_id: &str, instance_id: &str) -> SdkResult<()> {
        self.api.delete(&Self::instance_path(project_id, instance_id)).await
    }

    // ========== Credentials ==========

    pub async fn create_credentials(&self, project_id: &str, instance_id: &str) -> SdkResult<CredentialsResponse> {
        let path = format!("{}/credentials", Self::instance_path(project_id, instance_id));
        self.api.post(&path, &serde_json::json!({})).await
    }

    pub async fn get_credentials(
        &self,
        project_id: &str,
        instance_id: &str,
        credentials_id: &str,
    ) -> SdkResult<CredentialsResponse> {
        let path = format!(
            "{}/credentials/{}",
            Self::instance_path(project_id, instance_id),
            credentials_id
        );
        self.api.get(&path).await
    }

    pub async fn delete_credentials(&self, project_id: &str, instance_id: &str, credentials_id: &str) -> SdkResult<()> {
        let path = format!(
            "{}/credentials/{}",
            Self::instance_path(project_id, instance_id),
            credentials_id
        );
        self.api.delete(&path).await
    }
}
