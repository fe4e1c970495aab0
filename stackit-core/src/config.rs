//! Provider configuration
//!
//! The provider block is deserialised into [`ProviderConfig`] and resolved,
//! together with environment fallbacks, into [`ProviderData`] which every
//! resource receives in `configure`.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::schema::{AttributeSchema, AttributeType, ResourceSchema, Validator};
use crate::types::Attr;

/// Region used when neither the provider block nor the environment sets one
pub const DEFAULT_REGION: &str = "eu01";

/// Services whose endpoint can be overridden with `<service>_custom_endpoint`
pub const SERVICES: &[&str] = &[
    "argus",
    "kms",
    "logme",
    "mariadb",
    "opensearch",
    "postgresflex",
    "resourcemanager",
    "scf",
    "ske",
];

/// Provider block as written by the user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderConfig {
    pub region: Option<String>,
    pub service_account_token: Option<String>,
    /// Overrides the wait timeout of every asynchronous operation
    pub wait_timeout_secs: Option<u64>,
    pub argus_custom_endpoint: Option<String>,
    pub kms_custom_endpoint: Option<String>,
    pub logme_custom_endpoint: Option<String>,
    pub mariadb_custom_endpoint: Option<String>,
    pub opensearch_custom_endpoint: Option<String>,
    pub postgresflex_custom_endpoint: Option<String>,
    pub resourcemanager_custom_endpoint: Option<String>,
    pub scf_custom_endpoint: Option<String>,
    pub ske_custom_endpoint: Option<String>,
}

impl ProviderConfig {
    fn custom_endpoint(&self, service: &str) -> Option<&String> {
        match service {
            "argus" => self.argus_custom_endpoint.as_ref(),
            "kms" => self.kms_custom_endpoint.as_ref(),
            "logme" => self.logme_custom_endpoint.as_ref(),
            "mariadb" => self.mariadb_custom_endpoint.as_ref(),
            "opensearch" => self.opensearch_custom_endpoint.as_ref(),
            "postgresflex" => self.postgresflex_custom_endpoint.as_ref(),
            "resourcemanager" => self.resourcemanager_custom_endpoint.as_ref(),
            "scf" => self.scf_custom_endpoint.as_ref(),
            "ske" => self.ske_custom_endpoint.as_ref(),
            _ => None,
        }
    }

    /// Schema of the provider block
    pub fn schema() -> ResourceSchema {
        let mut schema = ResourceSchema::new("stackit")
            .with_description("Provider configuration")
            .attribute(
                AttributeSchema::new("region", AttributeType::String)
                    .with_description("Default region for regional resources"),
            )
            .attribute(
                AttributeSchema::new("service_account_token", AttributeType::String)
                    .sensitive()
                    .with_description("Token used for authentication"),
            )
            .attribute(
                AttributeSchema::new("wait_timeout_secs", AttributeType::Int)
                    .with_validator(Validator::IntAtLeast(1))
                    .with_description("Timeout applied to every wait handler"),
            );
        for service in SERVICES {
            schema = schema.attribute(
                AttributeSchema::new(format!("{}_custom_endpoint", service), AttributeType::String)
                    .with_description(format!("Custom endpoint for the {} service", service)),
            );
        }
        schema
    }
}

/// Resolved provider-wide configuration shared by all resources
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderData {
    pub region: String,
    pub service_account_token: Option<String>,
    pub wait_timeout: Option<Duration>,
    pub custom_endpoints: BTreeMap<String, String>,
    pub user_agent: String,
}

impl ProviderData {
    /// Resolve the provider block with environment fallbacks
    pub fn resolve(config: &ProviderConfig) -> Self {
        Self::resolve_with(config, |key| std::env::var(key).ok())
    }

    /// Resolve with a custom environment lookup
    pub fn resolve_with(config: &ProviderConfig, env: impl Fn(&str) -> Option<String>) -> Self {
        let region = config
            .region
            .clone()
            .or_else(|| env("STACKIT_REGION"))
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        let service_account_token = config
            .service_account_token
            .clone()
            .or_else(|| env("STACKIT_SERVICE_ACCOUNT_TOKEN"));

        let mut custom_endpoints = BTreeMap::new();
        for service in SERVICES {
            let env_key = format!("STACKIT_{}_CUSTOM_ENDPOINT", service.to_uppercase());
            if let Some(endpoint) = config.custom_endpoint(service).cloned().or_else(|| env(&env_key)) {
                custom_endpoints.insert(service.to_string(), endpoint);
            }
        }

        Self {
            region,
            service_account_token,
            wait_timeout: config.wait_timeout_secs.map(Duration::from_secs),
            custom_endpoints,
            user_agent: format!("stackit-tf/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// The model's region if set, the provider region otherwise
    pub fn region_for(&self, model_region: &Attr<String>) -> String {
        match model_region.as_str() {
            Some(r) if !r.is_empty() => r.to_string(),
            _ => self.region.clone(),
        }
    }

    pub fn custom_endpoint(&self, service: &str) -> Option<&str> {
        self.custom_endpoints.get(service).map(String::as_str)
    }

    /// Provider-wide override or the resource's own default
    pub fn wait_timeout_or(&self, default: Duration) -> Duration {
        self.wait_timeout.unwrap_or(default)
    }
}

impl Default for ProviderData {
    fn default() -> Self {
        Self::resolve_with(&ProviderConfig::default(), |_| None)
    }
}
