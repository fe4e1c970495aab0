//! `stackit_resourcemanager_folder`

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
    self, CreateFolderPayload, Folder, Member, PartialUpdatePayload, ResourceManagerClient,
};

use super::{labels_from_api, parent_from_api};
use crate::error::{ApiContext, ProviderResult};
use crate::utils::{configure_client, ensure_found, finish, is_gone, require_client};

pub const TYPE_NAME: &str = "stackit_resourcemanager_folder";
const ID_FIELDS: &[&str] = &["container_id"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Model {
    pub id: StringAttr,
    pub folder_id: StringAttr,
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
        .with_description("Resource Manager folder resource schema.")
        .attribute(common::id(ID_FIELDS))
        .attribute(common::computed_id("folder_id", "Folder UUID identifier."))
        .attribute(common::computed_id("container_id", "Folder container ID. Globally unique, user-friendly identifier."))
        .attribute(super::container_parent_id("folder"))
        .attribute(super::name("folder"))
        .attribute(super::labels())
        .attribute(super::owner_email())
        .attribute(super::timestamp("creation_time", "Date-time at which the folder was created."))
        .attribute(super::timestamp("update_time", "Date-time at which the folder was last modified."))
}

pub fn map_fields(response: Option<&Folder>, model: Option<&mut Model>) -> CoreResult<()> {
    let response = response.ok_or_else(|| CoreError::mapping("response input is nil"))?;
    let model = model.ok_or_else(|| CoreError::mapping("model input is nil"))?;

    let container_id = match (&response.container_id, model.container_id.as_str()) {
        (Some(id), _) => id.clone(),
        (None, Some(id)) => id.to_string(),
        (None, None) => return Err(CoreError::mapping("container id not present")),
    };

    model.id = Attr::known(container_id.as_str());
    model.container_id = Attr::known(container_id);
    model.folder_id = Attr::from_option(response.folder_id.clone());
    model.container_parent_id = parent_from_api(&model.container_parent_id, response.parent.as_ref());
    model.name = Attr::from_option(response.name.clone());
    model.labels = labels_from_api(&model.labels, response.labels.as_ref());
    model.creation_time = Attr::from_option(response.creation_time.map(|t| t.to_rfc3339()));
    model.update_time = Attr::from_option(response.update_time.map(|t| t.to_rfc3339()));
    Ok(())
}

pub fn to_create_payload(model: Option<&Model>) -> CoreResult<CreateFolderPayload> {
    let model = model.ok_or_else(|| CoreError::mapping("nil model"))?;
    let owner = model
        .owner_email
        .to_option()
        .ok_or_else(|| CoreError::mapping("new folder requires owner_email"))?;
    Ok(CreateFolderPayload {
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

#[derive(Default)]
pub struct FolderResource {
    client: Option<ResourceManagerClient>,
}

impl FolderResource {
    async fn create_folder(&self, req: CreateRequest, resp: &mut Response) -> ProviderResult<()> {
        let client = require_client(&self.client)?;
        let mut model: Model = req.plan.get()?;

        let payload = to_create_payload(Some(&model))?;
        let created = client.create_folder(&payload).await.context("Calling API")?;
        let container_id = created
            .container_id
            .ok_or_else(|| CoreError::mapping("API response has no container id"))?;
        // Folders are usable right away, only the parent is missing from the create response
        let folder = client.get_folder(&container_id).await.context("Calling API")?;

        map_fields(Some(&folder), Some(&mut model))?;
        resp.state.set(&model)?;
        log::info!("Folder {} created", container_id);
        Ok(())
    }

    async fn read_folder(&self, req: ReadRequest, resp: &mut Response) -> ProviderResult<()> {
        let client = require_client(&self.client)?;
        let mut model: Model = req.state.get()?;
        let container_id = model.container_id.value_string();

        let folder = match client.get_folder(&container_id).await.context("Calling API") {
            Ok(f) => f,
            Err(e) if is_gone(&e) => {
                resp.state.remove_resource();
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        map_fields(Some(&folder), Some(&mut model))?;
        resp.state.set(&model)?;
        Ok(())
    }

    async fn update_folder(&self, req: UpdateRequest, resp: &mut Response) -> ProviderResult<()> {
        let client = require_client(&self.client)?;
        let mut model: Model = req.plan.get()?;
        let container_id = model.container_id.value_string();

        let payload = to_update_payload(Some(&model))?;
        client
            .partial_update_folder(&container_id, &payload)
            .await
            .context("Calling API")?;
        let folder = client.get_folder(&container_id).await.context("Calling API")?;

        map_fields(Some(&folder), Some(&mut model))?;
        resp.state.set(&model)?;
        log::info!("Folder {} updated", container_id);
        Ok(())
    }

    async fn delete_folder(&self, req: DeleteRequest) -> ProviderResult<()> {
        let client = require_client(&self.client)?;
        let model: Model = req.state.get()?;
        let container_id = model.container_id.value_string();

        if let Err(e) = client.delete_folder(&container_id).await.context("Calling API")
            && !is_gone(&e)
        {
            return Err(e);
        }
        log::info!("Folder {} deleted", container_id);
        Ok(())
    }
}

impl Resource for FolderResource {
    fn metadata(&self, provider_type_name: &str) -> String {
        format!("{}_resourcemanager_folder", provider_type_name)
    }

    fn schema(&self) -> ResourceSchema {
        schema()
    }

    fn configure(&mut self, provider_data: &ProviderData, diags: &mut Diagnostics) {
        self.client = configure_client(provider_data, resourcemanager::SERVICE, ResourceManagerClient::new, diags);
    }

    fn create(&self, req: CreateRequest) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            let mut resp = Response::default();
            let result = self.create_folder(req, &mut resp).await;
            finish(resp, result, "Error creating folder")
        })
    }

    fn read(&self, req: ReadRequest) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            let mut resp = Response::default();
            let result = self.read_folder(req, &mut resp).await;
            finish(resp, result, "Error reading folder")
        })
    }

    fn update(&self, req: UpdateRequest) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            let mut resp = Response::default();
            let result = self.update_folder(req, &mut resp).await;
            finish(resp, result, "Error updating folder")
        })
    }

    fn delete(&self, req: DeleteRequest) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            let result = self.delete_folder(req).await;
            finish(Response::default(), result, "Error deleting folder")
        })
    }

    fn import_state(&self, req: ImportStateRequest) -> Response {
        import_composite_id(&req.id, ID_FIELDS, "Error importing folder")
    }
}

#[derive(Default)]
pub struct FolderDataSource {
    resource: FolderResource,
}

impl DataSource for FolderDataSource {
    fn metadata(&self, provider_type_name: &str) -> String {
        format!("{}_resourcemanager_folder", provider_type_name)
    }

    fn schema(&self) -> ResourceSchema {
        let mut schema = schema().as_data_source(TYPE_NAME, ID_FIELDS);
        schema.attributes.retain(|a| a.name != "owner_email");
        schema
    }

    fn configure(&mut self, provider_data: &ProviderData, diags: &mut Diagnostics) {
        self.resource.configure(provider_data, diags);
    }

    fn read(&self, req: ReadDataSourceRequest) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            let mut resp = Response::default();
            let result = self
                .resource
                .read_folder(ReadRequest { state: req.config }, &mut resp)
                .await
                .and_then(|_| ensure_found(&resp.state, "Folder"));
            finish(resp, result, "Error reading folder")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackit_core::State;
    use stackit_sdk::resourcemanager::Parent;

    #[test]
    fn map_fields_requires_container_id() {
        let mut model = Model::default();
        assert!(map_fields(Some(&Folder::default()), Some(&mut model)).is_err());
        assert!(map_fields(None, Some(&mut model)).is_err());
        assert!(map_fields(Some(&Folder::default()), None).is_err());

        let mut model = Model {
            container_id: Attr::known("f-abc"),
            ..Default::default()
        };
        map_fields(Some(&Folder::default()), Some(&mut model)).unwrap();
        assert_eq!(model.id, Attr::known("f-abc"));
        assert!(model.name.is_null());
        assert!(model.container_parent_id.is_null());
    }

    #[test]
    fn map_fields_copies_response() {
        let mut model = Model {
            container_parent_id: Attr::known("org-container"),
            ..Default::default()
        };
        let response = Folder {
            container_id: Some("f-abc".to_string()),
            folder_id: Some("uuid".to_string()),
            name: Some("team".to_string()),
            parent: Some(Parent {
                id: Some("org-uuid".to_string()),
                container_id: Some("org-container".to_string()),
            }),
            ..Default::default()
        };
        map_fields(Some(&response), Some(&mut model)).unwrap();
        assert_eq!(model.folder_id, Attr::known("uuid"));
        assert_eq!(model.name, Attr::known("team"));
        assert_eq!(model.container_parent_id, Attr::known("org-container"));
    }

    #[test]
    fn create_payload_requires_owner_email() {
        assert!(to_create_payload(None).is_err());
        let model = Model {
            name: Attr::known("team"),
            container_parent_id: Attr::known("parent"),
            ..Default::default()
        };
        assert!(to_create_payload(Some(&model)).is_err());

        let model = Model {
            owner_email: Attr::known("me@example.com"),
            ..model
        };
        let payload = to_create_payload(Some(&model)).unwrap();
        assert_eq!(payload.name.as_deref(), Some("team"));
        assert_eq!(payload.members, vec![Member::owner("me@example.com")]);
    }

    #[test]
    fn import_by_container_id() {
        let resp = FolderResource::default().import_state(ImportStateRequest {
            id: "f-abc".to_string(),
        });
        assert!(!resp.has_error());
        assert_eq!(resp.state.get_string("container_id"), Some("f-abc"));
    }

    #[tokio::test]
    async fn unconfigured_read_reports_error() {
        let resource = FolderResource::default();
        let state = State::from_model(&Model {
            container_id: Attr::known("f-abc"),
            ..Default::default()
        })
        .unwrap();
        let resp = resource.read(ReadRequest { state }).await;
        assert!(resp.has_error());
    }
}
