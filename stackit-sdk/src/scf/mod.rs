//! STACKIT Cloud Foundry: organizations and platforms

mod model;
pub mod wait;

pub use model::*;

use serde_json::Value;

use crate::client::ApiClient;
use crate::config::Configuration;
use crate::error::SdkResult;

pub const SERVICE: &str = "scf";

#[derive(Debug, Clone)]
pub struct ScfClient {
    api: ApiClient,
}

impl ScfClient {
    pub fn new(config: Configuration) -> SdkResult<Self> {
        Ok(Self {
            api: ApiClient::new(config)?,
        })
    }

    fn organizations_path(project_id: &str, region: &str) -> String {
        format!("/v1/projects/{}/regions/{}/organizations", project_id, region)
    }

    pub async fn create_organization(
        &self,
        project_id: &str,
        region: &str,
        payload: &CreateOrganizationPayload,
    ) -> SdkResult<OrganizationCreateResponse> {
        self.api
            .post(&Self::organizations_path(project_id, region), payload)
            .await
    }

    pub async fn get_organization(&self, project_id: &str, region: &str, org_id: &str) -> SdkResult<Organization> {
        let path = format!("{}/{}", Self::organizations_path(project_id, region), org_id);
        self.api.get(&path).await
    }

    pub async fn update_organization(
        &self,
        project_id: &str,
        region: &str,
        org_id: &str,
        payload: &UpdateOrganizationPayload,
    ) -> SdkResult<()> {
        let path = format!("{}/{}", Self::organizations_path(project_id, region), org_id);
        self.api.patch::<_, Value>(&path, payload).await?;
        Ok(())
    }

    pub async fn delete_organization(&self, project_id: &str, region: &str, org_id: &str) -> SdkResult<()> {
        let path = format!("{}/{}", Self::organizations_path(project_id, region), org_id);
        self.api.delete(&path).await
    }

    pub async fn get_platform(&self, project_id: &str, region: &str, platform_id: &str) -> SdkResult<Platform> {
        let path = format!(
            "/v1/projects/{}/regions/{}/platforms/{}",
            project_id, region, platform_id
        );
        self.api.get(&path).await
    }
}
