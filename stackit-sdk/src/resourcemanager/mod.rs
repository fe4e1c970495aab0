//! Resource Manager: projects and folders

mod model;
pub mod wait;

pub use model::*;

use crate::client::ApiClient;
use crate::config::Configuration;
use crate::error::SdkResult;

pub const SERVICE: &str = "resourcemanager";

#[derive(Debug, Clone)]
pub struct ResourceManagerClient {
    api: ApiClient,
}

impl ResourceManagerClient {
    pub fn new(config: Configuration) -> SdkResult<Self> {
        Ok(Self {
            api: ApiClient::new(config)?,
        })
    }

    // ========== Projects ==========

    pub async fn create_project(&self, payload: &CreateProjectPayload) -> SdkResult<Project> {
        self.api.post("/v2/projects", payload).await
    }

    /// `id` may be the project's container id or its UUID
    pub async fn get_project(&self, id: &str) -> SdkResult<Project> {
        self.api.get(&format!("/v2/projects/{}", id)).await
    }

    pub async fn partial_update_project(&self, id: &str, payload: &PartialUpdatePayload) -> SdkResult<Project> {
        self.api.patch(&format!("/v2/projects/{}", id), payload).await
    }

    pub async fn delete_project(&self, id: &str) -> SdkResult<()> {
        self.api.delete(&format!("/v2/projects/{}", id)).await
    }

    // ========== Folders ==========

    pub async fn create_folder(&self, payload: &CreateFolderPayload) -> SdkResult<Folder> {
        self.api.post("/v2/folders", payload).await
    }

    pub async fn get_folder(&self, id: &str) -> SdkResult<Folder> {
        self.api.get(&format!("/v2/folders/{}", id)).await
    }

    pub async fn partial_update_folder(&self, id: &str, payload: &PartialUpdatePayload) -> SdkResult<Folder> {
        self.api.patch(&format!("/v2/folders/{}", id), payload).await
    }

    pub async fn delete_folder(&self, id: &str) -> SdkResult<()> {
        self.api.delete(&format!("/v2/folders/{}", id)).await
    }
}
