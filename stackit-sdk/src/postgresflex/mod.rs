//! PostgreSQL Flex: instances, flavors, users and databases

mod model;
pub mod wait;

pub use model::*;

use serde_json::Value;

use crate::client::ApiClient;
use crate::config::Configuration;
use crate::error::SdkResult;

pub const SERVICE: &str = "postgresflex";

#[derive(Debug, Clone)]
pub struct PostgresFlexClient {
    api: ApiClient,
}

impl PostgresFlexClient {
    pub fn new(config: Configuration) -> SdkResult<Self> {
        Ok(Self {
            api: ApiClient::new(config)?,
        })
    }

    fn base_path(project_id: &str, region: &str) -> String {
        format!("/v2/projects/{}/regions/{}", project_id, region)
    }

    fn instance_path(project_id: &str, region: &str, instance_id: &str) -> String {
        format!("{}/instances/{}", Self::base_path(project_id, region), instance_id)
    }

    pub async fn list_flavors(&self, project_id: &str, region: &str) -> SdkResult<ListFlavorsResponse> {
        let path = format!("{}/flavors", Self::base_path(project_id, region));
        self.api.get(&path).await
    }

    // ========== Instances ==========

    pub async fn create_instance(
        &self,
        project_id: &str,
        region: &str,
        payload: &CreateInstancePayload,
    ) -> SdkResult<CreateInstanceResponse> {
        let path = format!("{}/instances", Self::base_path(project_id, region));
        self.api.post(&path, payload).await
    }

    pub async fn get_instance(&self, project_id: &str, region: &str, instance_id: &str) -> SdkResult<InstanceResponse> {
        self.api
            .get(&Self::instance_path(project_id, region, instance_id))
            .await
    }

    pub async fn partial_update_instance(
        &self,
        project_id: &str,
        region: &str,
        instance_id: &str,
        payload: &PartialUpdateInstancePayload,
    ) -> SdkResult<()> {
        self.api
            .patch::<_, Value>(&Self::instance_path(project_id, region, instance_id), payload)
            .await?;
        Ok(())
    }

    /// Soft delete: the instance moves to `Deleted` and can still be restored
    pub async fn delete_instance(&self, project_id: &str, region: &str, instance_id: &str) -> SdkResult<()> {
        self.api
            .delete(&Self::instance_path(project_id, region, instance_id))
            .await
    }

    /// Removes a soft-deleted instance for good
    pub async fn force_delete_instance(&self, project_id: &str, region: &str, instance_id: &str) -> SdkResult<()> {
        let path = format!("{}/force", Self::instance_path(project_id, region, instance_id));
        self.api.delete(&path).await
    }

    // ========== Users ==========

    pub async fn create_user(
        &self,
        project_id: &str,
        region: &str,
        instance_id: &str,
        payload: &CreateUserPayload,
    ) -> SdkResult<CreateUserResponse> {
        let path = format!("{}/users", Self::instance_path(project_id, region, instance_id));
        self.api.post(&path, payload).await
    }

    pub async fn get_user(
        &self,
        project_id: &str,
        region: &str,
        instance_id: &str,
        user_id: &str,
    ) -> SdkResult<GetUserResponse> {
        let path = format!(
            "{}/users/{}",
            Self::instance_path(project_id, region, instance_id),
            user_id
        );
        self.api.get(&path).await
    }

    pub async fn partial_update_user(
        &self,
        project_id: &str,
        region: &str,
        instance_id: &str,
        user_id: &str,
        payload: &PartialUpdateUserPayload,
    ) -> SdkResult<()> {
        let path = format!(
            "{}/users/{}",
            Self::instance_path(project_id, region, instance_id),
            user_id
        );
        self.api.patch::<_, Value>(&path, payload).await?;
        Ok(())
    }

    pub async fn delete_user(&self, project_id: &str, region: &str, instance_id: &str, user_id: &str) -> SdkResult<()> {
        let path = format!(
            "{}/users/{}",
            Self::instance_path(project_id, region, instance_id),
            user_id
        );
        self.api.delete(&path).await
    }

    // ========== Databases ==========

    pub async fn create_database(
        &self,
        project_id: &str,
        region: &str,
        instance_id: &str,
        payload: &CreateDatabasePayload,
    ) -> SdkResult<CreateDatabaseResponse> {
        let path = format!("{}/databases", Self::instance_path(project_id, region, instance_id));
        self.api.post(&path, payload).await
    }

    pub async fn list_databases(
        &self,
        project_id: &str,
        region: &str,
        instance_id: &str,
    ) -> SdkResult<ListDatabasesResponse> {
        let path = format!("{}/databases", Self::instance_path(project_id, region, instance_id));
        self.api.get(&path).await
    }

    pub async fn delete_database(
        &self,
        project_id: &str,
        region: &str,
        instance_id: &str,
        database_id: &str,
    ) -> SdkResult<()> {
        let path = format!(
            "{}/databases/{}",
            Self::instance_path(project_id, region, instance_id),
            database_id
        );
        self.api.delete(&path).await
    }
}
