//! `stackit_resourcemanager_project`

use serde::{Deserialize, Serialize};
use stackit_core::ProviderData;
use stackit_core::diagnostics::Diagnostics;
use stackit_core::error::{CoreError, CoreResult};
use stackit_core::resource::{
    BoxFuture, CreateRequest, DataSource, DeleteRequest, ImportStateRequest, ReadDataSourceRequest,
    ReadRequest, Resource, Response, UpdateRequest, import_composite_id,
};
use stackit_core::schema::{ResourceSchema, common};
use stackit_core::types::{Attr, MapAttr, StringAttr};
use stackit_sdk::resourcemanager::{
    self, CreateProjectPayload, Member, PartialUpdatePayload, Project, ResourceManagerClient,
};

use super::{WAIT_TIMEOUT_MINUTES, labels_from_api, parent_from_api};
use crate::error::{ApiContext, ProviderError, ProviderResult};
use crate::utils::{configure_client, ensure_found, finish, require_client, wait_timeout};

pub const TYPE_NAME: &str = "stackit_resourcemanager_project";
const ID_FIELDS: &[&str] = &["container_id"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Model {
    pub id: StringAttr,
    pub project_id: StringAttr,
    pub container_id: StringAttr,
    pub container_parent_id: StringAttr,
    pub name: StringAttr,
    pub labels: MapAttr<String>,
    pub owner_email: StringAttr,
    pub creation_time: StringAttr,
    pub update_time: StringAttr,
}

pub fn schema() -> ResourceSchema {
    ResourceSchema::new(TYPE_NAME)
        .with_description("Resource Manager project resource schema.")
        .attribute(common::id(ID_FIELDS))
        .attribute(common::computed_id("project_id", "Project UUID identifier. This is the ID that can be used in most of the other resources to identify the project."))
        .attribute(common::computed_id("container_id", "Project container ID. Globally unique, user-friendly identifier."))
        .attribute(super::container_parent_id("project"))
        .attribute(super::name("project"))
        .attribute(super::labels())
        .attribute(super::owner_email())
        .attribute(super::timestamp("creation_time", "Date-time at which the project was created."))
        .attribute(super::timestamp("update_time", "Date-time at which the project was last modified."))
}

pub fn map_fields(response: Option<&Project>, model: Option<&mut Model>) -> CoreResult<()> {
    let response = response.ok_or_else(|| CoreError::mapping("response input is nil"))?;
    let model = model.ok_or_else(|| CoreError::mapping("model input is nil"))?;

    let container_id = match (&response.container_id, model.container_id.as_str()) {
        (Some(id), _) => id.clone(),
        (None, Some(id)) => id.to_string(),
        (None, None) => return Err(CoreError::mapping("container id not present")),
    };

    model.id = Attr::known(container_id.as_str());
    model.container_id = Attr::known(container_id);
    model.project_id = Attr::from_option(response.project_id.clone());
    model.container_parent_id = parent_from_api(&model.container_parent_id, response.parent.as_ref());
    model.name = Attr::from_option(response.name.clone());
    model.labels = labels_from_api(&model.labels, response.labels.as_ref());
    model.creation_time = Attr::from_option(response.creation_time.map(|t| t.to_rfc3339()));
    model.update_time = Attr::from_option(response.update_time.map(|t| t.to_rfc3339()));
    Ok(())
}

pub fn to_create_payload(model: Option<&Model>) -> CoreResult<CreateProjectPayload> {
    let model = model.ok_or_else(|| CoreError::mapping("nil model"))?;
    let owner = model
        .owner_email
        .to_option()
        .ok_or_else(|| CoreError::mapping("new project requires owner_email"))?;
    Ok(CreateProjectPayload {
        container_parent_id: model.container_parent_id.to_option(),
        name: model.name.to_option(),
        labels: model.labels.to_option(),
        members: vec![Member::owner(owner)],
    })
}

pub fn to_update_payload(model: Option<&Model>) -> CoreResult<PartialUpdatePayload> {
    let model = model.ok_or_else(|| CoreError::mapping("nil model"))?;
    Ok(PartialUpdatePayload {
        container_parent_id: model.container_parent_id.to_option(),
        name: model.name.to_option(),
        labels: model.labels.to_option(),
    })
}

/// Deleted projects answer 403 as well as 404/410
fn is_project_gone(err: &ProviderError) -> bool {
    matches!(err.status_code(), Some(403 | 404 | 410))
}

#[derive(Default)]
pub struct ProjectResource {
    client: Option<ResourceManagerClient>,
    provider_data: ProviderData,
}

impl ProjectResource {
    async fn create_project(&self, req: CreateRequest, resp: &mut Response) -> ProviderResult<()> {
        let client = require_client(&self.client)?;
        let mut model: Model = req.plan.get()?;

        let payload = to_create_payload(Some(&model))?;
        let created = client.create_project(&payload).await.context("Calling API")?;
        let container_id = created
            .container_id
            .ok_or_else(|| CoreError::mapping("API response has no container id"))?;

        let project = resourcemanager::wait::create_project_wait_handler(client, &container_id)
            .set_timeout(wait_timeout(&self.provider_data, WAIT_TIMEOUT_MINUTES))
            .wait()
            .await
            .context("Waiting for project creation")?;

        map_fields(Some(&project), Some(&mut model))?;
        resp.state.set(&model)?;
        log::info!("Project {} created", container_id);
        Ok(())
    }

    async fn read_project(&self, req: ReadRequest, resp: &mut Response) -> ProviderResult<()> {
        let client = require_client(&self.client)?;
        let mut model: Model = req.state.get()?;
        // Data sources may look a project up by either identifier
        let lookup = model
            .container_id
            .to_option()
            .or_else(|| model.project_id.to_option())
            .unwrap_or_default();

        let project = match client.get_project(&lookup).await.context("Calling API") {
            Ok(p) => p,
            Err(e) if is_project_gone(&e) => {
                resp.state.remove_resource();
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        map_fields(Some(&project), Some(&mut model))?;
        resp.state.set(&model)?;
        Ok(())
    }

    async fn update_project(&self, req: UpdateRequest, resp: &mut Response) -> ProviderResult<()> {
        let client = require_client(&self.client)?;
        let mut model: Model = req.plan.get()?;
        let container_id = model.container_id.value_string();

        let payload = to_update_payload(Some(&model))?;
        client
            .partial_update_project(&container_id, &payload)
            .await
            .context("Calling API")?;
        // The PATCH response omits the parent, fetch the project again
        let project = client.get_project(&container_id).await.context("Calling API")?;

        map_fields(Some(&project), Some(&mut model))?;
        resp.state.set(&model)?;
        log::info!("Project {} updated", container_id);
        Ok(())
    }

    async fn delete_project(&self, req: DeleteRequest) -> ProviderResult<()> {
        let client = require_client(&self.client)?;
        let model: Model = req.state.get()?;
        let container_id = model.container_id.value_string();

        match client.delete_project(&container_id).await.context("Calling API") {
            Err(e) if is_project_gone(&e) => return Ok(()),
            Err(e) => return Err(e),
            Ok(()) => {}
        }
        resourcemanager::wait::delete_project_wait_handler(client, &container_id)
            .set_timeout(wait_timeout(&self.provider_data, WAIT_TIMEOUT_MINUTES))
            .wait()
            .await
            .context("Waiting for project deletion")?;
        log::info!("Project {} deleted", container_id);
        Ok(())
    }
}

impl Resource for ProjectResource {
    fn metadata(&self, provider_type_name: &str) -> String {
        format!("{}_resourcemanager_project", provider_type_name)
    }

    fn schema(&self) -> ResourceSchema {
        schema()
    }

    fn configure(&mut self, provider_data: &ProviderData, diags: &mut Diagnostics) {
        self.client = configure_client(provider_data, resourcemanager::SERVICE, ResourceManagerClient::new, diags);
        self.provider_data = provider_data.clone();
    }

    fn create(&self, req: CreateRequest) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            let mut resp = Response::default();
            let result = self.create_project(req, &mut resp).await;
            finish(resp, result, "Error creating project")
        })
    }

    fn read(&self, req: ReadRequest) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            let mut resp = Response::default();
            let result = self.read_project(req, &mut resp).await;
            finish(resp, result, "Error reading project")
        })
    }

    fn update(&self, req: UpdateRequest) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            let mut resp = Response::default();
            let result = self.update_project(req, &mut resp).await;
            finish(resp, result, "Error updating project")
        })
    }

    fn delete(&self, req: DeleteRequest) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            let result = self.delete_project(req).await;
            finish(Response::default(), result, "Error deleting project")
        })
    }

    fn import_state(&self, req: ImportStateRequest) -> Response {
        import_composite_id(&req.id, ID_FIELDS, "Error importing project")
    }
}

#[derive(Default)]
pub struct ProjectDataSource {
    resource: ProjectResource,
}

impl DataSource for ProjectDataSource {
    fn metadata(&self, provider_type_name: &str) -> String {
        format!("{}_resourcemanager_project", provider_type_name)
    }

    fn schema(&self) -> ResourceSchema {
        let mut schema = schema().as_data_source(TYPE_NAME, &["container_id", "project_id"]);
        // Either identifier is enough
        for attribute in schema.attributes.iter_mut() {
            if attribute.name == "container_id" || attribute.name == "project_id" {
                attribute.mode = stackit_core::schema::AttributeMode::OptionalComputed;
            }
        }
        schema.attributes.retain(|a| a.name != "owner_email");
        schema
    }

    fn configure(&mut self, provider_data: &ProviderData, diags: &mut Diagnostics) {
        self.resource.configure(provider_data, diags);
    }

    fn read(&self, req: ReadDataSourceRequest) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            let mut resp = Response::default();
            let has_lookup = ["container_id", "project_id"]
                .iter()
                .any(|key| req.config.get_string(key).is_some());
            let result = if has_lookup {
                self.resource
                    .read_project(ReadRequest { state: req.config }, &mut resp)
                    .await
                    .and_then(|_| ensure_found(&resp.state, "Project"))
            } else {
                Err(ProviderError::invalid("either container_id or project_id must be set"))
            };
            finish(resp, result, "Error reading project")
        })
    }
}
