//! STACKIT provider implementation
//!
//! Holds one instance of every resource and data source. `configure`
//! resolves the provider block and hands the result to each of them, after
//! which the host looks them up by type name.

use serde_json::Value;
use stackit_core::diagnostics::Diagnostics;
use stackit_core::resource::{DataSource, Resource};
use stackit_core::schema::ResourceSchema;
use stackit_core::{ProviderConfig, ProviderData};

use crate::resources::{data_sources, resources};

/// Prefix of every type name served by this provider
pub const TYPE_NAME: &str = "stackit";

pub struct StackitProvider {
    provider_data: Option<ProviderData>,
    resources: Vec<Box<dyn Resource>>,
    data_sources: Vec<Box<dyn DataSource>>,
}

impl Default for StackitProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl StackitProvider {
    pub fn new() -> Self {
        Self {
            provider_data: None,
            resources: resources(),
            data_sources: data_sources(),
        }
    }

    /// Schema of the provider block
    pub fn schema(&self) -> ResourceSchema {
        ProviderConfig::schema()
    }

    /// Resolve the provider block and configure every resource and data source
    pub fn configure(&mut self, config: &ProviderConfig) -> Diagnostics {
        let provider_data = ProviderData::resolve(config);
        self.configure_with(provider_data)
    }

    pub fn configure_with(&mut self, provider_data: ProviderData) -> Diagnostics {
        let mut diags = Diagnostics::new();
        if provider_data.service_account_token.is_none() {
            diags.log_and_add_warning(
                "Missing service account token",
                "Set service_account_token or STACKIT_SERVICE_ACCOUNT_TOKEN, API calls will be unauthenticated",
            );
        }
        for resource in &mut self.resources {
            resource.configure(&provider_data, &mut diags);
        }
        for data_source in &mut self.data_sources {
            data_source.configure(&provider_data, &mut diags);
        }
        log::debug!("provider configured for region {}", provider_data.region);
        self.provider_data = Some(provider_data);
        diags
    }

    pub fn provider_data(&self) -> Option<&ProviderData> {
        self.provider_data.as_ref()
    }

    pub fn resource(&self, type_name: &str) -> Option<&dyn Resource> {
        self.resources
            .iter()
            .find(|r| r.metadata(TYPE_NAME) == type_name)
            .map(|r| r.as_ref())
    }

    pub fn data_source(&self, type_name: &str) -> Option<&dyn DataSource> {
        self.data_sources
            .iter()
            .find(|d| d.metadata(TYPE_NAME) == type_name)
            .map(|d| d.as_ref())
    }

    pub fn resource_types(&self) -> Vec<String> {
        self.resources.iter().map(|r| r.metadata(TYPE_NAME)).collect()
    }

    pub fn data_source_types(&self) -> Vec<String> {
        self.data_sources.iter().map(|d| d.metadata(TYPE_NAME)).collect()
    }

    /// Validate a resource block, or a data source block when `data` is set
    pub fn validate_config(&self, type_name: &str, data: bool, config: &Value) -> Diagnostics {
        let mut diags = Diagnostics::new();
        let schema = if data {
            self.data_source(type_name).map(|d| d.schema())
        } else {
            self.resource(type_name).map(|r| r.schema())
        };
        let Some(schema) = schema else {
            let kind = if data { "data source" } else { "resource" };
            diags.add_error(format!("Unsupported {} type", kind), type_name);
            return diags;
        };
        if let Err(errors) = schema.validate(config) {
            for error in errors {
                diags.add_error(format!("Invalid {} configuration", type_name), error.to_string());
            }
        }
        diags
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stackit_core::resource::{ReadRequest, State};

    #[test]
    fn lookup_by_type_name() {
        let provider = StackitProvider::new();
        assert!(provider.resource("stackit_kms_key").is_some());
        assert!(provider.resource("stackit_scf_platform").is_none());
        assert!(provider.data_source("stackit_scf_platform").is_some());
        assert!(provider.resource_types().contains(&"stackit_mariadb_instance".to_string()));
    }

    #[test]
    fn validate_unknown_type() {
        let provider = StackitProvider::new();
        let diags = provider.validate_config("stackit_nope", false, &json!({}));
        assert!(diags.has_error());
    }

    #[test]
    fn validate_reports_schema_errors() {
        let provider = StackitProvider::new();
        let diags = provider.validate_config(
            "stackit_resourcemanager_folder",
            false,
            &json!({"name": "folder"}),
        );
        assert!(diags.has_error());
    }

    #[test]
    fn configure_warns_without_token() {
        let mut provider = StackitProvider::new();
        let diags = provider.configure_with(ProviderData::default());
        assert!(!diags.has_error());
        assert!(!diags.is_empty());
        assert_eq!(provider.provider_data().map(|d| d.region.as_str()), Some("eu01"));
    }

    #[tokio::test]
    async fn unconfigured_resource_reports_error() {
        let provider = StackitProvider::new();
        let resource = provider.resource("stackit_argus_instance").unwrap();
        let resp = resource
            .read(ReadRequest {
                state: State::new(json!({"project_id": "pid", "instance_id": "iid"})),
            })
            .await;
        assert!(resp.has_error());
    }
}
