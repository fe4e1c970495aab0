//! `stackit_argus_credential`

use serde::{Deserialize, Serialize};
use stackit_core::ProviderData;
use stackit_core::diagnostics::Diagnostics;
use stackit_core::error::{CoreError, CoreResult};
use stackit_core::ids::build_id;
use stackit_core::resource::{
    BoxFuture, CreateRequest, DeleteRequest, ImportStateRequest, ReadRequest, Resource, Response,
    UpdateRequest,
};
use stackit_core::schema::{AttributeSchema, AttributeType, ResourceSchema, common};
use stackit_core::types::{Attr, StringAttr};
use stackit_sdk::argus::{self, ArgusClient, Credentials};

use crate::error::{ApiContext, ProviderResult};
use crate::utils::{configure_client, finish, is_gone, require_client, update_not_supported};

pub const TYPE_NAME: &str = "stackit_argus_credential";
const ID_FIELDS: &[&str] = &["project_id", "instance_id", "username"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Model {
    pub id: StringAttr,
    pub project_id: StringAttr,
    pub instance_id: StringAttr,
    pub username: StringAttr,
    pub password: StringAttr,
}

pub fn schema() -> ResourceSchema {
    ResourceSchema::new(TYPE_NAME)
        .with_description("Argus credential resource schema.")
        .attribute(common::id(ID_FIELDS))
        .attribute(common::project_id())
        .attribute(common::uuid_key("instance_id", "The Argus instance ID the credential belongs to."))
        .attribute(
            AttributeSchema::new("username", AttributeType::String)
                .computed()
                .with_description("Credential username"),
        )
        .attribute(
            AttributeSchema::new("password", AttributeType::String)
                .computed()
                .sensitive()
                .with_description("Credential password"),
        )
}

pub fn map_fields(response: Option<&Credentials>, model: Option<&mut Model>) -> CoreResult<()> {
    let response = response.ok_or_else(|| CoreError::mapping("response input is nil"))?;
    let model = model.ok_or_else(|| CoreError::mapping("model input is nil"))?;

    let username = response
        .username
        .clone()
        .ok_or_else(|| CoreError::mapping("username not present"))?;

    model.id = Attr::known(build_id(&[
        &model.project_id.value_string(),
        &model.instance_id.value_string(),
        &username,
    ]));
    model.username = Attr::known(username);
    model.password = Attr::from_option(response.password.clone());
    Ok(())
}

#[derive(Default)]
pub struct CredentialResource {
    client: Option<ArgusClient>,
}

impl CredentialResource {
    async fn create_credential(&self, req: CreateRequest, resp: &mut Response) -> ProviderResult<()> {
        let client = require_client(&self.client)?;
        let mut model: Model = req.plan.get()?;

        let created = client
            .create_credentials(&model.project_id.value_string(), &model.instance_id.value_string())
            .await
            .context("Calling API")?;

        map_fields(created.credentials.as_ref(), Some(&mut model))?;
        resp.state.set(&model)?;
        log::info!("Argus credential {} created", model.username.value_string());
        Ok(())
    }

    /// The password is never returned again, only existence is checked
    async fn read_credential(&self, req: ReadRequest, resp: &mut Response) -> ProviderResult<()> {
        let client = require_client(&self.client)?;
        let model: Model = req.state.get()?;

        match client
            .get_credentials(
                &model.project_id.value_string(),
                &model.instance_id.value_string(),
                &model.username.value_string(),
            )
            .await
            .context("Calling API")
        {
            Ok(_) => resp.state.set(&model)?,
            Err(e) if is_gone(&e) => resp.state.remove_resource(),
            Err(e) => return Err(e),
        }
        Ok(())
    }

    async fn delete_credential(&self, req: DeleteRequest) -> ProviderResult<()> {
        let client = require_client(&self.client)?;
        let model: Model = req.state.get()?;
        let username = model.username.value_string();

        if let Err(e) = client
            .delete_credentials(
                &model.project_id.value_string(),
                &model.instance_id.value_string(),
                &username,
            )
            .await
            .context("Calling API")
            && !is_gone(&e)
        {
            return Err(e);
        }
        log::info!("Argus credential {} deleted", username);
        Ok(())
    }
}

impl Resource for CredentialResource {
    fn metadata(&self, provider_type_name: &str) -> String {
        format!("{}_argus_credential", provider_type_name)
    }

    fn schema(&self) -> ResourceSchema {
        schema()
    }

    fn configure(&mut self, provider_data: &ProviderData, diags: &mut Diagnostics) {
        self.client = configure_client(provider_data, argus::SERVICE, ArgusClient::new, diags);
    }

    fn create(&self, req: CreateRequest) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            let mut resp = Response::default();
            let result = self.create_credential(req, &mut resp).await;
            finish(resp, result, "Error creating credential")
        })
    }

    fn read(&self, req: ReadRequest) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            let mut resp = Response::default();
            let result = self.read_credential(req, &mut resp).await;
            finish(resp, result, "Error reading credential")
        })
    }

    fn update(&self, _req: UpdateRequest) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            finish(Response::default(), Err(update_not_supported("credential")), "Error updating credential")
        })
    }

    fn delete(&self, req: DeleteRequest) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            let result = self.delete_credential(req).await;
            finish(Response::default(), result, "Error deleting credential")
        })
    }

    fn import_state(&self, _req: ImportStateRequest) -> Response {
        let mut resp = Response::default();
        resp.diagnostics.log_and_add_error(
            "Error importing credential",
            "Argus credentials cannot be imported, the password is only returned on creation",
        );
        resp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_fields_builds_id_from_username() {
        let mut model = Model {
            project_id: Attr::known("pid"),
            instance_id: Attr::known("iid"),
            ..Default::default()
        };
        let response = Credentials {
            username: Some("user".to_string()),
            password: Some("secret".to_string()),
        };
        map_fields(Some(&response), Some(&mut model)).unwrap();
        assert_eq!(model.id, Attr::known("pid,iid,user"));
        assert_eq!(model.password, Attr::known("secret"));
    }

    #[test]
    fn map_fields_requires_username() {
        let mut model = Model::default();
        assert!(map_fields(Some(&Credentials::default()), Some(&mut model)).is_err());
        assert!(map_fields(None, Some(&mut model)).is_err());
    }

    #[test]
    fn import_is_rejected() {
        let resp = CredentialResource::default().import_state(ImportStateRequest {
            id: "pid,iid,user".to_string(),
        });
        assert!(resp.has_error());
    }
}
