//! `stackit_scf_organization`

use serde::{Deserialize, Serialize};
use stackit_core::ProviderData;
use stackit_core::diagnostics::Diagnostics;
use stackit_core::error::{CoreError, CoreResult};
use stackit_core::ids::build_id;
use stackit_core::resource::{
    BoxFuture, CreateRequest, DataSource, DeleteRequest, ImportStateRequest, ReadDataSourceRequest,
    ReadRequest, Resource, Response, UpdateRequest, import_composite_id,
};
use stackit_core::schema::{AttributeSchema, AttributeType, ResourceSchema, Validator, common};
use stackit_core::types::{Attr, BoolAttr, StringAttr};
use stackit_sdk::scf::{
    self, CreateOrganizationPayload, Organization, ScfClient, UpdateOrganizationPayload,
};

use super::WAIT_TIMEOUT_MINUTES;
use crate::error::{ApiContext, ProviderResult};
use crate::utils::{
    configure_client, ensure_found, finish, is_gone, record_then_wait, require_client, wait_timeout,
};

pub const TYPE_NAME: &str = "stackit_scf_organization";
const ID_FIELDS: &[&str] = &["project_id", "region", "org_id"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Model {
    pub id: StringAttr,
    pub org_id: StringAttr,
    pub project_id: StringAttr,
    pub region: StringAttr,
    pub name: StringAttr,
    pub platform_id: StringAttr,
    pub quota_id: StringAttr,
    pub status: StringAttr,
    pub suspended: BoolAttr,
    pub created_at: StringAttr,
    pub updated_at: StringAttr,
}

pub fn schema() -> ResourceSchema {
    ResourceSchema::new(TYPE_NAME)
        .with_description("STACKIT Cloud Foundry organization resource schema.")
        .attribute(common::id(ID_FIELDS))
        .attribute(common::computed_id("org_id", "The ID of the Cloud Foundry Organization."))
        .attribute(common::project_id())
        .attribute(common::region())
        .attribute(
            AttributeSchema::new("name", AttributeType::String)
                .required()
                .with_validator(Validator::LengthBetween(1, 255))
                .with_description("The name of the organization."),
        )
        .attribute(
            AttributeSchema::new("platform_id", AttributeType::String)
                .optional_computed()
                .requires_replace()
                .with_validator(Validator::Uuid)
                .with_description("The ID of the platform the organization is deployed to."),
        )
        .attribute(
            AttributeSchema::new("quota_id", AttributeType::String)
                .optional_computed()
                .requires_replace()
                .with_validator(Validator::Uuid)
                .with_description("The ID of the quota assigned to the organization."),
        )
        .attribute(
            AttributeSchema::new("status", AttributeType::String)
                .computed()
                .with_description("The status of the organization."),
        )
        .attribute(
            AttributeSchema::new("suspended", AttributeType::Bool)
                .optional_computed()
                .with_description("A suspended organization can no longer be used."),
        )
        .attribute(
            AttributeSchema::new("created_at", AttributeType::String)
                .computed()
                .with_description("The time the organization was created."),
        )
        .attribute(
            AttributeSchema::new("updated_at", AttributeType::String)
                .computed()
                .with_description("The time the organization was last updated."),
        )
}

pub fn map_fields(response: Option<&Organization>, model: Option<&mut Model>, region: &str) -> CoreResult<()> {
    let response = response.ok_or_else(|| CoreError::mapping("response input is nil"))?;
    let model = model.ok_or_else(|| CoreError::mapping("model input is nil"))?;

    let org_id = match (&response.guid, model.org_id.as_str()) {
        (Some(id), _) => id.clone(),
        (None, Some(id)) => id.to_string(),
        (None, None) => return Err(CoreError::mapping("organization id not present")),
    };
    let project_id = response
        .project_id
        .clone()
        .unwrap_or_else(|| model.project_id.value_string());
    let region = response.region.clone().unwrap_or_else(|| region.to_string());

    model.id = Attr::known(build_id(&[&project_id, &region, &org_id]));
    model.org_id = Attr::known(org_id);
    model.project_id = Attr::known(project_id);
    model.region = Attr::known(region);
    model.name = Attr::from_option(response.name.clone());
    model.platform_id = Attr::from_option(response.platform_id.clone());
    model.quota_id = Attr::from_option(response.quota_id.clone());
    model.status = Attr::from_option(response.status.clone());
    model.suspended = Attr::from_option(response.suspended);
    model.created_at = Attr::from_option(response.created_at.map(|t| t.to_rfc3339()));
    model.updated_at = Attr::from_option(response.updated_at.map(|t| t.to_rfc3339()));
    Ok(())
}

pub fn to_create_payload(model: Option<&Model>) -> CoreResult<CreateOrganizationPayload> {
    let model = model.ok_or_else(|| CoreError::mapping("nil model"))?;
    Ok(CreateOrganizationPayload {
        name: model.name.to_option(),
        platform_id: model.platform_id.to_option(),
        quota_id: model.quota_id.to_option(),
        suspended: model.suspended.to_option(),
    })
}

pub fn to_update_payload(model: Option<&Model>) -> CoreResult<UpdateOrganizationPayload> {
    let model = model.ok_or_else(|| CoreError::mapping("nil model"))?;
    Ok(UpdateOrganizationPayload {
        name: model.name.to_option(),
        suspended: model.suspended.to_option(),
    })
}

#[derive(Default)]
pub struct OrganizationResource {
    client: Option<ScfClient>,
    provider_data: ProviderData,
}

impl OrganizationResource {
    async fn create_organization(&self, req: CreateRequest, resp: &mut Response) -> ProviderResult<()> {
        let client = require_client(&self.client)?;
        let mut model: Model = req.plan.get()?;
        let project_id = model.project_id.value_string();
        let region = self.provider_data.region_for(&model.region);

        let payload = to_create_payload(Some(&model))?;
        let created = client
            .create_organization(&project_id, &region, &payload)
            .await
            .context("Calling API")?;
        let org_id = created
            .guid
            .ok_or_else(|| CoreError::mapping("API response has no organization id"))?;

        let wait = scf::wait::create_organization_wait_handler(client, &project_id, &region, &org_id)
            .set_timeout(wait_timeout(&self.provider_data, WAIT_TIMEOUT_MINUTES))
            .wait();
        let org = record_then_wait(
            &mut resp.state,
            &[("project_id", project_id.as_str()), ("region", region.as_str()), ("org_id", org_id.as_str())],
            wait,
            "Waiting for organization creation",
        )
        .await?;

        map_fields(Some(&org), Some(&mut model), &region)?;
        resp.state.set(&model)?;
        log::info!("Organization {} created", org_id);
        Ok(())
    }

    async fn read_organization(&self, req: ReadRequest, resp: &mut Response) -> ProviderResult<()> {
        let client = require_client(&self.client)?;
        let mut model: Model = req.state.get()?;
        let project_id = model.project_id.value_string();
        let region = self.provider_data.region_for(&model.region);
        let org_id = model.org_id.value_string();

        let org = match client
            .get_organization(&project_id, &region, &org_id)
            .await
            .context("Calling API")
        {
            Ok(o) => o,
            Err(e) if is_gone(&e) => {
                resp.state.remove_resource();
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        map_fields(Some(&org), Some(&mut model), &region)?;
        resp.state.set(&model)?;
        Ok(())
    }

    async fn update_organization(&self, req: UpdateRequest, resp: &mut Response) -> ProviderResult<()> {
        let client = require_client(&self.client)?;
        let mut model: Model = req.plan.get()?;
        let project_id = model.project_id.value_string();
        let region = self.provider_data.region_for(&model.region);
        let org_id = model.org_id.value_string();

        let payload = to_update_payload(Some(&model))?;
        client
            .update_organization(&project_id, &region, &org_id, &payload)
            .await
            .context("Calling API")?;
        let org = client
            .get_organization(&project_id, &region, &org_id)
            .await
            .context("Calling API")?;

        map_fields(Some(&org), Some(&mut model), &region)?;
        resp.state.set(&model)?;
        log::info!("Organization {} updated", org_id);
        Ok(())
    }

    async fn delete_organization(&self, req: DeleteRequest) -> ProviderResult<()> {
        let client = require_client(&self.client)?;
        let model: Model = req.state.get()?;
        let project_id = model.project_id.value_string();
        let region = self.provider_data.region_for(&model.region);
        let org_id = model.org_id.value_string();

        match client
            .delete_organization(&project_id, &region, &org_id)
            .await
            .context("Calling API")
        {
            Err(e) if is_gone(&e) => return Ok(()),
            Err(e) => return Err(e),
            Ok(()) => {}
        }
        scf::wait::delete_organization_wait_handler(client, &project_id, &region, &org_id)
            .set_timeout(wait_timeout(&self.provider_data, WAIT_TIMEOUT_MINUTES))
            .wait()
            .await
            .context("Waiting for organization deletion")?;
        log::info!("Organization {} deleted", org_id);
        Ok(())
    }
}

impl Resource for OrganizationResource {
    fn metadata(&self, provider_type_name: &str) -> String {
        format!("{}_scf_organization", provider_type_name)
    }

    fn schema(&self) -> ResourceSchema {
        schema()
    }

    fn configure(&mut self, provider_data: &ProviderData, diags: &mut Diagnostics) {
        self.client = configure_client(provider_data, scf::SERVICE, ScfClient::new, diags);
        self.provider_data = provider_data.clone();
    }

    fn create(&self, req: CreateRequest) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            let mut resp = Response::default();
            let result = self.create_organization(req, &mut resp).await;
            finish(resp, result, "Error creating organization")
        })
    }

    fn read(&self, req: ReadRequest) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            let mut resp = Response::default();
            let result = self.read_organization(req, &mut resp).await;
            finish(resp, result, "Error reading organization")
        })
    }

    fn update(&self, req: UpdateRequest) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            let mut resp = Response::default();
            let result = self.update_organization(req, &mut resp).await;
            finish(resp, result, "Error updating organization")
        })
    }

    fn delete(&self, req: DeleteRequest) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            let result = self.delete_organization(req).await;
            finish(Response::default(), result, "Error deleting organization")
        })
    }

    fn import_state(&self, req: ImportStateRequest) -> Response {
        import_composite_id(&req.id, ID_FIELDS, "Error importing organization")
    }
}

#[derive(Default)]
pub struct OrganizationDataSource {
    resource: OrganizationResource,
}

impl DataSource for OrganizationDataSource {
    fn metadata(&self, provider_type_name: &str) -> String {
        format!("{}_scf_organization", provider_type_name)
    }

    fn schema(&self) -> ResourceSchema {
        schema().as_data_source(TYPE_NAME, ID_FIELDS)
    }

    fn configure(&mut self, provider_data: &ProviderData, diags: &mut Diagnostics) {
        self.resource.configure(provider_data, diags);
    }

    fn read(&self, req: ReadDataSourceRequest) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            let mut resp = Response::default();
            let result = self
                .resource
                .read_organization(ReadRequest { state: req.config }, &mut resp)
                .await
                .and_then(|_| ensure_found(&resp.state, "Organization"));
            finish(resp, result, "Error reading organization")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROJECT_ID: &str = "0b7a1ad6-8e0a-4d8f-9b6a-1a2b3c4d5e6f";

    #[test]
    fn map_fields_falls_back_to_model_and_region() {
        let mut model = Model {
            project_id: Attr::known(PROJECT_ID),
            org_id: Attr::known("oid"),
            ..Default::default()
        };
        map_fields(Some(&Organization::default()), Some(&mut model), "eu01").unwrap();
        assert_eq!(model.id, Attr::known(format!("{},eu01,oid", PROJECT_ID)));
        assert_eq!(model.region, Attr::known("eu01"));
        assert!(model.suspended.is_null());
    }

    #[test]
    fn map_fields_prefers_response_values() {
        let mut model = Model {
            project_id: Attr::known(PROJECT_ID),
            ..Default::default()
        };
        let response = Organization {
            guid: Some("oid".to_string()),
            name: Some("org".to_string()),
            region: Some("eu02".to_string()),
            status: Some(scf::ORG_STATUS_CREATED.to_string()),
            suspended: Some(false),
            ..Default::default()
        };
        map_fields(Some(&response), Some(&mut model), "eu01").unwrap();
        assert_eq!(model.id, Attr::known(format!("{},eu02,oid", PROJECT_ID)));
        assert_eq!(model.suspended, Attr::Known(false));
        assert_eq!(model.status, Attr::known("created"));
    }

    #[test]
    fn map_fields_without_id_fails() {
        let mut model = Model::default();
        let err = map_fields(Some(&Organization::default()), Some(&mut model), "eu01").unwrap_err();
        assert!(err.to_string().contains("organization id not present"));
    }

    #[test]
    fn payloads_skip_nulls() {
        let model = Model {
            name: Attr::known("org"),
            suspended: Attr::Unknown,
            ..Default::default()
        };
        let create = to_create_payload(Some(&model)).unwrap();
        assert_eq!(create.name.as_deref(), Some("org"));
        assert!(create.platform_id.is_none());
        assert!(create.suspended.is_none());

        let update = to_update_payload(Some(&model)).unwrap();
        assert!(update.suspended.is_none());
        assert!(to_update_payload(None).is_err());
    }

    #[test]
    fn import_requires_three_parts() {
        let resource = OrganizationResource::default();
        let resp = resource.import_state(ImportStateRequest {
            id: format!("{},eu01,oid", PROJECT_ID),
        });
        assert!(!resp.has_error());
        assert_eq!(resp.state.get_string("org_id"), Some("oid"));

        let resp = resource.import_state(ImportStateRequest {
            id: format!("{},oid", PROJECT_ID),
        });
        assert!(resp.has_error());
    }
}
