//! Kubernetes Engine: clusters, provider options and kubeconfigs

mod model;
pub mod wait;

pub use model::*;

use crate::client::ApiClient;
use crate::config::Configuration;
use crate::error::SdkResult;

pub const SERVICE: &str = "ske";

#[derive(Debug, Clone)]
pub struct SkeClient {
    api: ApiClient,
}

impl SkeClient {
    pub fn new(config: Configuration) -> SdkResult<Self> {
        Ok(Self {
            api: ApiClient::new(config)?,
        })
    }

    fn cluster_path(project_id: &str, name: &str) -> String {
        format!("/v1/projects/{}/clusters/{}", project_id, name)
    }

    pub async fn list_provider_options(&self) -> SdkResult<ProviderOptions> {
        self.api.get("/v1/provider-options").await
    }

    /// Creates the cluster or replaces its whole specification
    pub async fn create_or_update_cluster(
        &self,
        project_id: &str,
        name: &str,
        payload: &CreateOrUpdateClusterPayload,
    ) -> SdkResult<Cluster> {
        self.api.put(&Self::cluster_path(project_id, name), payload).await
    }

    pub async fn get_cluster(&self, project_id: &str, name: &str) -> SdkResult<Cluster> {
        self.api.get(&Self::cluster_path(project_id, name)).await
    }

    pub async fn delete_cluster(&self, project_id: &str, name: &str) -> SdkResult<()> {
        self.api.delete(&Self::cluster_path(project_id, name)).await
    }

    pub async fn create_kubeconfig(
        &self,
        project_id: &str,
        cluster_name: &str,
        payload: &CreateKubeconfigPayload,
    ) -> SdkResult<Kubeconfig> {
        let path = format!("{}/kubeconfig", Self::cluster_path(project_id, cluster_name));
        self.api.post(&path, payload).await
    }
}
