//! Argus monitoring: instances, plans and credentials

mod model;
pub mod wait;

pub use model::*;

use serde_json::Value;

use crate::client::ApiClient;
use crate::config::Configuration;
use crate::error::SdkResult;

pub const SERVICE: &str = "argus";

#[derive(Debug, Clone)]
pub struct ArgusClient {
    api: ApiClient,
}

impl ArgusClient {
    pub fn new(config: Configuration) -> SdkResult<Self> {
        Ok(Self {
            api: ApiClient::new(config)?,
        })
    }

    fn instance_path(project_id: &str, instance_id: &str) -> String {
        format!("/v1/projects/{}/instances/{}", project_id, instance_id)
    }

    pub async fn list_plans(&self, project_id: &str) -> SdkResult<PlansResponse> {
        self.api.get(&format!("/v1/projects/{}/plans", project_id)).await
    }

    // ========== Instances ==========

    pub async fn create_instance(
        &self,
        project_id: &str,
        payload: &CreateInstancePayload,
    ) -> SdkResult<CreateInstanceResponse> {
        self.api
            .post(&format!("/v1/projects/{}/instances", project_id), payload)
            .await
    }

    pub async fn get_instance(&self, project_id: &str, instance_id: &str) -> SdkResult<Instance> {
        self.api.get(&Self::instance_path(project_id, instance_id)).await
    }

    pub async fn update_instance(
        &self,
        project_id: &str,
        instance_id: &str,
        payload: &UpdateInstancePayload,
    ) -> SdkResult<()> {
        self.api
            .put::<_, Value>(&Self::instance_path(project_id, instance_id), payload)
            .await?;
        Ok(())
    }

    pub async fn delete_instance(&self, project_id: &str, instance_id: &str) -> SdkResult<()> {
        self.api.delete(&Self::instance_path(project_id, instance_id)).await
    }

    // ========== Credentials ==========

    pub async fn create_credentials(&self, project_id: &str, instance_id: &str) -> SdkResult<CreateCredentialsResponse> {
        let path = format!("{}/credentials", Self::instance_path(project_id, instance_id));
        self.api.post(&path, &serde_json::json!({})).await
    }

    pub async fn get_credentials(
        &self,
        project_id: &str,
        instance_id: &str,
        username: &str,
    ) -> SdkResult<CredentialsResponse> {
        let path = format!("{}/credentials/{}", Self::instance_path(project_id, instance_id), username);
        self.api.get(&path).await
    }

    pub async fn delete_credentials(&self, project_id: &str, instance_id: &str, username: &str) -> SdkResult<()> {
        let path = format!("{}/credentials/{}", Self::instance_path(project_id, instance_id), username);
        self.api.delete(&path).await
    }
}
