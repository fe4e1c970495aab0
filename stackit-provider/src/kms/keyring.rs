//! `stackit_kms_keyring`

use serde::{Deserialize, Serialize};
use stackit_core::diagnostics::Diagnostics;
use stackit_core::error::{CoreError, CoreResult};
use stackit_core::ids::build_id;
use stackit_core::resource::{
    BoxFuture, CreateRequest, DataSource, DeleteRequest, ImportStateRequest, ReadDataSourceRequest,
    ReadRequest, Resource, Response, UpdateRequest, import_composite_id,
};
use stackit_core::schema::{ResourceSchema, common};
use stackit_core::types::{Attr, StringAttr};
use stackit_core::ProviderData;
use stackit_sdk::kms::{self, CreateKeyRingPayload, KeyRing, KmsClient};

use crate::error::{ApiContext, ProviderResult};
use crate::utils::{
    configure_client, ensure_found, finish, is_gone, require_client, update_not_supported, wait_timeout,
};

pub const TYPE_NAME: &str = "stackit_kms_keyring";
const ID_FIELDS: &[&str] = &["project_id", "region", "keyring_id"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Model {
    pub id: StringAttr,
    pub keyring_id: StringAttr,
    pub project_id: StringAttr,
    pub region: StringAttr,
    pub display_name: StringAttr,
    pub description: StringAttr,
}

pub fn schema() -> ResourceSchema {
    ResourceSchema::new(TYPE_NAME)
        .with_description("KMS Keyring resource schema.")
        .attribute(common::id(ID_FIELDS))
        .attribute(common::computed_id("keyring_id", "An auto generated unique id which identifies the keyring."))
        .attribute(common::project_id())
        .attribute(common::region())
        .attribute(super::display_name("keyring"))
        .attribute(super::description("keyring"))
}

pub fn map_fields(response: Option<&KeyRing>, model: Option<&mut Model>, region: &str) -> CoreResult<()> {
    let response = response.ok_or_else(|| CoreError::mapping("response input is nil"))?;
    let model = model.ok_or_else(|| CoreError::mapping("model input is nil"))?;

    let keyring_id = match (&response.id, model.keyring_id.as_str()) {
        (Some(id), _) => id.clone(),
        (None, Some(id)) => id.to_string(),
        (None, None) => return Err(CoreError::mapping("keyring id not present")),
    };

    model.id = Attr::known(build_id(&[&model.project_id.value_string(), region, &keyring_id]));
    model.keyring_id = Attr::known(keyring_id);
    model.region = Attr::known(region);
    model.display_name = Attr::from_option(response.display_name.clone());
    model.description = Attr::from_option(response.description.clone());
    Ok(())
}

pub fn to_create_payload(model: Option<&Model>) -> CoreResult<CreateKeyRingPayload> {
    let model = model.ok_or_else(|| CoreError::mapping("nil model"))?;
    Ok(CreateKeyRingPayload {
        display_name: model.display_name.to_option(),
        description: model.description.to_option(),
    })
}

#[derive(Default)]
pub struct KeyRingResource {
    client: Option<KmsClient>,
    provider_data: ProviderData,
}

impl KeyRingResource {
    async fn create_key_ring(&self, req: CreateRequest, resp: &mut Response) -> ProviderResult<()> {
        let client = require_client(&self.client)?;
        let mut model: Model = req.plan.get()?;
        let project_id = model.project_id.value_string();
        let region = self.provider_data.region_for(&model.region);

        let payload = to_create_payload(Some(&model))?;
        let created = client
            .create_key_ring(&project_id, &region, &payload)
            .await
            .context("Calling API")?;
        let keyring_id = created
            .id
            .ok_or_else(|| CoreError::mapping("API response has no keyring id"))?;

        let keyring = kms::wait::create_key_ring_wait_handler(client, &project_id, &region, &keyring_id)
            .set_timeout(wait_timeout(&self.provider_data, super::WAIT_TIMEOUT_MINUTES))
            .wait()
            .await
            .context("Waiting for key ring creation")?;

        map_fields(Some(&keyring), Some(&mut model), &region)?;
        resp.state.set(&model)?;
        log::info!("Key ring {} created", keyring_id);
        Ok(())
    }

    async fn read_key_ring(&self, req: ReadRequest, resp: &mut Response) -> ProviderResult<()> {
        let client = require_client(&self.client)?;
        let mut model: Model = req.state.get()?;
        let project_id = model.project_id.value_string();
        let region = self.provider_data.region_for(&model.region);
        let keyring_id = model.keyring_id.value_string();

        let keyring = match client.get_key_ring(&project_id, &region, &keyring_id).await.context("Calling API") {
            Ok(k) => k,
            Err(e) if is_gone(&e) => {
                resp.state.remove_resource();
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        map_fields(Some(&keyring), Some(&mut model), &region)?;
        resp.state.set(&model)?;
        log::info!("Key ring {} read", keyring_id);
        Ok(())
    }

    async fn delete_key_ring(&self, req: DeleteRequest) -> ProviderResult<()> {
        let client = require_client(&self.client)?;
        let model: Model = req.state.get()?;
        let region = self.provider_data.region_for(&model.region);
        let keyring_id = model.keyring_id.value_string();

        if let Err(e) = client
            .delete_key_ring(&model.project_id.value_string(), &region, &keyring_id)
            .await
            .context("Calling API")
            && !is_gone(&e)
        {
            return Err(e);
        }
        log::info!("Key ring {} deleted", keyring_id);
        Ok(())
    }
}

impl Resource for KeyRingResource {
    fn metadata(&self, provider_type_name: &str) -> String {
        format!("{}_kms_keyring", provider_type_name)
    }

    fn schema(&self) -> ResourceSchema {
        schema()
    }

    fn configure(&mut self, provider_data: &ProviderData, diags: &mut Diagnostics) {
        self.client = configure_client(provider_data, kms::SERVICE, KmsClient::new, diags);
        self.provider_data = provider_data.clone();
    }

    fn create(&self, req: CreateRequest) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            let mut resp = Response::default();
            let result = self.create_key_ring(req, &mut resp).await;
            finish(resp, result, "Error creating key ring")
        })
    }

    fn read(&self, req: ReadRequest) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            let mut resp = Response::default();
            let result = self.read_key_ring(req, &mut resp).await;
            finish(resp, result, "Error reading key ring")
        })
    }

    fn update(&self, _req: UpdateRequest) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            finish(Response::default(), Err(update_not_supported("key ring")), "Error updating key ring")
        })
    }

    fn delete(&self, req: DeleteRequest) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            let result = self.delete_key_ring(req).await;
            finish(Response::default(), result, "Error deleting key ring")
        })
    }

    fn import_state(&self, req: ImportStateRequest) -> Response {
        let resp = import_composite_id(&req.id, ID_FIELDS, "Error importing key ring");
        if !resp.has_error() {
            log::info!("Key ring state imported");
        }
        resp
    }
}

#[derive(Default)]
pub struct KeyRingDataSource {
    resource: KeyRingResource,
}

impl DataSource for KeyRingDataSource {
    fn metadata(&self, provider_type_name: &str) -> String {
        format!("{}_kms_keyring", provider_type_name)
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
                .read_key_ring(ReadRequest { state: req.config }, &mut resp)
                .await
                .and_then(|_| ensure_found(&resp.state, "Key ring"));
            finish(resp, result, "Error reading key ring")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackit_core::resource::State;

    fn model() -> Model {
        Model {
            project_id: Attr::known("pid"),
            ..Default::default()
        }
    }

    #[test]
    fn map_fields_builds_id() {
        let mut model = model();
        let response = KeyRing {
            id: Some("krid".to_string()),
            display_name: Some("ring".to_string()),
            ..Default::default()
        };
        map_fields(Some(&response), Some(&mut model), "eu01").unwrap();
        assert_eq!(model.id, Attr::known("pid,eu01,krid"));
        assert_eq!(model.keyring_id, Attr::known("krid"));
        assert_eq!(model.display_name, Attr::known("ring"));
        assert!(model.description.is_null());
    }

    #[test]
    fn map_fields_falls_back_to_model_id() {
        let mut model = Model {
            keyring_id: Attr::known("krid"),
            ..model()
        };
        map_fields(Some(&KeyRing::default()), Some(&mut model), "eu01").unwrap();
        assert_eq!(model.id, Attr::known("pid,eu01,krid"));
    }

    #[test]
    fn map_fields_rejects_missing_input() {
        let mut model = model();
        assert!(map_fields(None, Some(&mut model), "eu01").is_err());
        assert!(map_fields(Some(&KeyRing::default()), None, "eu01").is_err());
        assert!(map_fields(Some(&KeyRing::default()), Some(&mut model), "eu01").is_err());
    }

    #[test]
    fn create_payload_maps_nulls_to_none() {
        let model = Model {
            display_name: Attr::known("ring"),
            description: Attr::Unknown,
            ..model()
        };
        let payload = to_create_payload(Some(&model)).unwrap();
        assert_eq!(payload.display_name.as_deref(), Some("ring"));
        assert!(payload.description.is_none());
        assert!(to_create_payload(None).is_err());
    }

    #[test]
    fn import_parses_three_parts() {
        let resource = KeyRingResource::default();
        let resp = resource.import_state(ImportStateRequest {
            id: "pid,eu01,krid".to_string(),
        });
        assert!(!resp.has_error());
        assert_eq!(resp.state.get_string("keyring_id"), Some("krid"));
        assert_eq!(resp.state.get_string("region"), Some("eu01"));

        let resp = resource.import_state(ImportStateRequest {
            id: "pid,krid".to_string(),
        });
        assert!(resp.has_error());
    }

    #[tokio::test]
    async fn update_is_rejected() {
        let resource = KeyRingResource::default();
        let resp = resource.update(UpdateRequest::default()).await;
        assert!(resp.has_error());
    }

    #[tokio::test]
    async fn unconfigured_resource_reports_error() {
        let resource = KeyRingResource::default();
        let state = State::from_model(&model()).unwrap();
        let resp = resource.read(ReadRequest { state }).await;
        assert!(resp.has_error());
    }
}
