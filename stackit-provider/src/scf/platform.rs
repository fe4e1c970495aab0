//! `stackit_scf_platform` data source

use serde::{Deserialize, Serialize};
use stackit_core::ProviderData;
use stackit_core::diagnostics::Diagnostics;
use stackit_core::error::{CoreError, CoreResult};
use stackit_core::ids::build_id;
use stackit_core::resource::{BoxFuture, DataSource, ReadDataSourceRequest, Response};
use stackit_core::schema::{AttributeSchema, AttributeType, ResourceSchema, common};
use stackit_core::types::{Attr, StringAttr};
use stackit_sdk::scf::{self, Platform, ScfClient};

use crate::error::{ApiContext, ProviderError, ProviderResult};
use crate::utils::{configure_client, finish, is_gone, require_client};

pub const TYPE_NAME: &str = "stackit_scf_platform";
const ID_FIELDS: &[&str] = &["project_id", "region", "platform_id"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Model {
    pub id: StringAttr,
    pub platform_id: StringAttr,
    pub project_id: StringAttr,
    pub region: StringAttr,
    pub system_id: StringAttr,
    pub display_name: StringAttr,
    pub api_url: StringAttr,
    pub console_url: StringAttr,
}

fn computed(name: &str, description: &str) -> AttributeSchema {
    AttributeSchema::new(name, AttributeType::String)
        .computed()
        .with_description(description)
}

pub fn schema() -> ResourceSchema {
    ResourceSchema::new(TYPE_NAME)
        .with_description("STACKIT Cloud Foundry platform datasource schema.")
        .attribute(common::id(ID_FIELDS))
        .attribute(common::uuid_key("platform_id", "The unique id of the platform."))
        .attribute(common::project_id())
        .attribute(common::region())
        .attribute(computed("system_id", "The ID of the platform System."))
        .attribute(computed("display_name", "The name of the platform."))
        .attribute(computed("api_url", "The CF API Url of the platform."))
        .attribute(computed("console_url", "The Stratos URL of the platform."))
        .as_data_source(TYPE_NAME, ID_FIELDS)
}

pub fn map_fields(response: Option<&Platform>, model: Option<&mut Model>, region: &str) -> CoreResult<()> {
    let response = response.ok_or_else(|| CoreError::mapping("response input is nil"))?;
    let model = model.ok_or_else(|| CoreError::mapping("model input is nil"))?;

    let platform_id = match (&response.guid, model.platform_id.as_str()) {
        (Some(id), _) => id.clone(),
        (None, Some(id)) => id.to_string(),
        (None, None) => return Err(CoreError::mapping("platform id not present")),
    };
    let region = response.region.clone().unwrap_or_else(|| region.to_string());

    model.id = Attr::known(build_id(&[&model.project_id.value_string(), &region, &platform_id]));
    model.platform_id = Attr::known(platform_id);
    model.region = Attr::known(region);
    model.system_id = Attr::from_option(response.system_id.clone());
    model.display_name = Attr::from_option(response.display_name.clone());
    model.api_url = Attr::from_option(response.api_url.clone());
    model.console_url = Attr::from_option(response.console_url.clone());
    Ok(())
}

#[derive(Default)]
pub struct PlatformDataSource {
    client: Option<ScfClient>,
    provider_data: ProviderData,
}

impl PlatformDataSource {
    async fn read_platform(&self, req: ReadDataSourceRequest, resp: &mut Response) -> ProviderResult<()> {
        let client = require_client(&self.client)?;
        let mut model: Model = req.config.get()?;
        let project_id = model.project_id.value_string();
        let region = self.provider_data.region_for(&model.region);
        let platform_id = model.platform_id.value_string();

        let platform = match client
            .get_platform(&project_id, &region, &platform_id)
            .await
            .context("Calling API")
        {
            Ok(p) => p,
            Err(e) if is_gone(&e) => {
                return Err(ProviderError::invalid(format!(
                    "Platform with ID {} does not exist in project {}",
                    platform_id, project_id
                )));
            }
            Err(e) => return Err(e),
        };

        map_fields(Some(&platform), Some(&mut model), &region)?;
        resp.state.set(&model)?;
        Ok(())
    }
}

impl DataSource for PlatformDataSource {
    fn metadata(&self, provider_type_name: &str) -> String {
        format!("{}_scf_platform", provider_type_name)
    }

    fn schema(&self) -> ResourceSchema {
        schema()
    }

    fn configure(&mut self, provider_data: &ProviderData, diags: &mut Diagnostics) {
        self.client = configure_client(provider_data, scf::SERVICE, ScfClient::new, diags);
        self.provider_data = provider_data.clone();
    }

    fn read(&self, req: ReadDataSourceRequest) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            let mut resp = Response::default();
            let result = self.read_platform(req, &mut resp).await;
            finish(resp, result, "Error reading platform")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_fields_builds_id() {
        let mut model = Model {
            project_id: Attr::known("pid"),
            ..Default::default()
        };
        let response = Platform {
            guid: Some("plid".to_string()),
            system_id: Some("01.cf.eu01".to_string()),
            display_name: Some("eu01".to_string()),
            api_url: Some("https://api.system.01.cf.eu01.stackit.cloud".to_string()),
            ..Default::default()
        };
        map_fields(Some(&response), Some(&mut model), "eu01").unwrap();
        assert_eq!(model.id, Attr::known("pid,eu01,plid"));
        assert_eq!(model.system_id, Attr::known("01.cf.eu01"));
        assert!(model.console_url.is_null());
    }

    #[test]
    fn map_fields_rejects_missing_inputs() {
        let mut model = Model::default();
        assert!(map_fields(None, Some(&mut model), "eu01").is_err());
        assert!(map_fields(Some(&Platform::default()), None, "eu01").is_err());
        assert!(map_fields(Some(&Platform::default()), Some(&mut model), "eu01").is_err());
    }

    #[test]
    fn schema_keys_are_required() {
        let schema = schema();
        assert!(schema.get("platform_id").unwrap().is_required());
        assert!(schema.get("project_id").unwrap().is_required());
        assert!(!schema.get("region").unwrap().is_required());
        assert!(schema.get("api_url").unwrap().is_computed());
    }
}
