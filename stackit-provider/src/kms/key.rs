//! `stackit_kms_key`

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
use stackit_sdk::kms::{self, CreateKeyPayload, Key, KmsClient};

use crate::error::{ApiContext, ProviderResult};
use crate::utils::{
    configure_client, ensure_found, finish, is_gone, require_client, update_not_supported, wait_timeout,
};

pub const TYPE_NAME: &str = "stackit_kms_key";
const ID_FIELDS: &[&str] = &["project_id", "region", "keyring_id", "key_id"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Model {
    pub id: StringAttr,
    pub key_id: StringAttr,
    pub keyring_id: StringAttr,
    pub project_id: StringAttr,
    pub region: StringAttr,
    pub display_name: StringAttr,
    pub description: StringAttr,
    pub algorithm: StringAttr,
    pub purpose: StringAttr,
    pub protection: StringAttr,
    pub access_scope: StringAttr,
    pub import_only: BoolAttr,
}

pub fn schema() -> ResourceSchema {
    ResourceSchema::new(TYPE_NAME)
        .with_description("KMS Key resource schema.")
        .attribute(common::id(ID_FIELDS))
        .attribute(common::computed_id("key_id", "The ID of the key."))
        .attribute(common::uuid_key("keyring_id", "The ID of the associated keyring."))
        .attribute(common::project_id())
        .attribute(common::region())
        .attribute(super::display_name("key"))
        .attribute(super::description("key"))
        .attribute(
            AttributeSchema::new("algorithm", AttributeType::String)
                .required()
                .requires_replace()
                .with_validator(Validator::one_of(kms::ALGORITHMS))
                .with_description("The encryption algorithm that the key will use to encrypt data."),
        )
        .attribute(
            AttributeSchema::new("purpose", AttributeType::String)
                .required()
                .requires_replace()
                .with_validator(Validator::one_of(kms::PURPOSES))
                .with_description("The purpose for which the key will be used."),
        )
        .attribute(
            AttributeSchema::new("protection", AttributeType::String)
                .required()
                .requires_replace()
                .with_validator(Validator::one_of(kms::PROTECTIONS))
                .with_description("The underlying system that is responsible for protecting the key material."),
        )
        .attribute(
            AttributeSchema::new("access_scope", AttributeType::String)
                .optional_computed()
                .requires_replace()
                .with_validator(Validator::one_of(kms::ACCESS_SCOPES))
                .with_description("The access scope of the key. Default is `PUBLIC`."),
        )
        .attribute(
            AttributeSchema::new("import_only", AttributeType::Bool)
                .optional_computed()
                .requires_replace()
                .with_description("States whether versions can be created or only imported."),
        )
}

pub fn map_fields(response: Option<&Key>, model: Option<&mut Model>, region: &str) -> CoreResult<()> {
    let response = response.ok_or_else(|| CoreError::mapping("response input is nil"))?;
    let model = model.ok_or_else(|| CoreError::mapping("model input is nil"))?;

    let key_id = match (&response.id, model.key_id.as_str()) {
        (Some(id), _) => id.clone(),
        (None, Some(id)) => id.to_string(),
        (None, None) => return Err(CoreError::mapping("key id not present")),
    };
    // The API echoes the key ring, older responses omit it
    if let Some(keyring_id) = &response.key_ring_id {
        model.keyring_id = Attr::known(keyring_id.as_str());
    }

    model.id = Attr::known(build_id(&[
        &model.project_id.value_string(),
        region,
        &model.keyring_id.value_string(),
        &key_id,
    ]));
    model.key_id = Attr::known(key_id);
    model.region = Attr::known(region);
    model.display_name = Attr::from_option(response.display_name.clone());
    model.description = Attr::from_option(response.description.clone());
    model.algorithm = Attr::from_option(response.algorithm.clone());
    model.purpose = Attr::from_option(response.purpose.clone());
    model.protection = Attr::from_option(response.protection.clone());
    model.access_scope = Attr::from_option(response.access_scope.clone());
    model.import_only = Attr::from_option(response.import_only);
    Ok(())
}

pub fn to_create_payload(model: Option<&Model>) -> CoreResult<CreateKeyPayload> {
    let model = model.ok_or_else(|| CoreError::mapping("nil model"))?;
    Ok(CreateKeyPayload {
        display_name: model.display_name.to_option(),
        description: model.description.to_option(),
        algorithm: model.algorithm.to_option(),
        purpose: model.purpose.to_option(),
        protection: model.protection.to_option(),
        access_scope: model.access_scope.to_option(),
        import_only: model.import_only.to_option(),
    })
}

/// Keys are never deleted right away; scheduled keys count as gone
fn is_deleted(key: &Key) -> bool {
    matches!(
        key.state.as_deref(),
        Some(kms::KEY_STATE_DELETED | kms::KEY_STATE_DELETION_SCHEDULED)
    )
}

#[derive(Default)]
pub struct KeyResource {
    client: Option<KmsClient>,
    provider_data: ProviderData,
}

impl KeyResource {
    async fn create_key(&self, req: CreateRequest, resp: &mut Response) -> ProviderResult<()> {
        let client = require_client(&self.client)?;
        let mut model: Model = req.plan.get()?;
        let project_id = model.project_id.value_string();
        let keyring_id = model.keyring_id.value_string();
        let region = self.provider_data.region_for(&model.region);

        let payload = to_create_payload(Some(&model))?;
        let created = client
            .create_key(&project_id, &region, &keyring_id, &payload)
            .await
            .context("Calling API")?;
        let key_id = created
            .id
            .ok_or_else(|| CoreError::mapping("API response has no key id"))?;

        let key = kms::wait::create_key_wait_handler(client, &project_id, &region, &keyring_id, &key_id)
            .set_timeout(wait_timeout(&self.provider_data, super::WAIT_TIMEOUT_MINUTES))
            .wait()
            .await
            .context("Waiting for key creation")?;

        map_fields(Some(&key), Some(&mut model), &region)?;
        resp.state.set(&model)?;
        log::info!("Key {} created", key_id);
        Ok(())
    }

    async fn read_key(&self, req: ReadRequest, resp: &mut Response) -> ProviderResult<()> {
        let client = require_client(&self.client)?;
        let mut model: Model = req.state.get()?;
        let region = self.provider_data.region_for(&model.region);
        let key_id = model.key_id.value_string();

        let key = match client
            .get_key(
                &model.project_id.value_string(),
                &region,
                &model.keyring_id.value_string(),
                &key_id,
            )
            .await
            .context("Calling API")
        {
            Ok(k) if is_deleted(&k) => {
                resp.state.remove_resource();
                return Ok(());
            }
            Ok(k) => k,
            Err(e) if is_gone(&e) => {
                resp.state.remove_resource();
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        map_fields(Some(&key), Some(&mut model), &region)?;
        resp.state.set(&model)?;
        log::info!("Key {} read", key_id);
        Ok(())
    }

    async fn delete_key(&self, req: DeleteRequest) -> ProviderResult<()> {
        let client = require_client(&self.client)?;
        let model: Model = req.state.get()?;
        let region = self.provider_data.region_for(&model.region);
        let key_id = model.key_id.value_string();

        if let Err(e) = client
            .delete_key(
                &model.project_id.value_string(),
                &region,
                &model.keyring_id.value_string(),
                &key_id,
            )
            .await
            .context("Calling API")
            && !is_gone(&e)
        {
            return Err(e);
        }
        // Deletion is only scheduled; nothing to wait for
        log::info!("Key {} scheduled for deletion", key_id);
        Ok(())
    }
}

impl Resource for KeyResource {
    fn metadata(&self, provider_type_name: &str) -> String {
        format!("{}_kms_key", provider_type_name)
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
            let result = self.create_key(req, &mut resp).await;
            finish(resp, result, "Error creating key")
        })
    }

    fn read(&self, req: ReadRequest) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            let mut resp = Response::default();
            let result = self.read_key(req, &mut resp).await;
            finish(resp, result, "Error reading key")
        })
    }

    fn update(&self, _req: UpdateRequest) -> BoxFuture<'_, Response> {
        Box::pin(async move { finish(Response::default(), Err(update_not_supported("key")), "Error updating key") })
    }

    fn delete(&self, req: DeleteRequest) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            let result = self.delete_key(req).await;
            finish(Response::default(), result, "Error deleting key")
        })
    }

    fn import_state(&self, req: ImportStateRequest) -> Response {
        import_composite_id(&req.id, ID_FIELDS, "Error importing key")
    }
}

#[derive(Default)]
pub struct KeyDataSource {
    resource: KeyResource,
}

impl DataSource for KeyDataSource {
    fn metadata(&self, provider_type_name: &str) -> String {
        format!("{}_kms_key", provider_type_name)
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
                .read_key(ReadRequest { state: req.config }, &mut resp)
                .await
                .and_then(|_| ensure_found(&resp.state, "Key"));
            finish(resp, result, "Error reading key")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_fields_builds_four_part_id() {
        let mut model = Model {
            project_id: Attr::known("pid"),
            keyring_id: Attr::known("krid"),
            region: Attr::known("eu01"),
            ..Default::default()
        };
        let response = Key {
            id: Some("kid".to_string()),
            display_name: Some("name".to_string()),
            ..Default::default()
        };
        map_fields(Some(&response), Some(&mut model), "eu01").unwrap();
        assert_eq!(model.id, Attr::known("pid,eu01,krid,kid"));
        assert_eq!(model.key_id, Attr::known("kid"));
        assert_eq!(model.display_name, Attr::known("name"));
        assert!(model.algorithm.is_null());
        assert!(model.import_only.is_null());
    }

    #[test]
    fn map_fields_requires_key_id() {
        let mut model = Model::default();
        assert!(map_fields(Some(&Key::default()), Some(&mut model), "eu01").is_err());
        assert!(map_fields(None, Some(&mut model), "eu01").is_err());
        assert!(map_fields(Some(&Key::default()), None, "eu01").is_err());
    }

    #[test]
    fn create_payload_copies_fields() {
        let model = Model {
            display_name: Attr::known("name"),
            algorithm: Attr::known("aes_256_gcm"),
            purpose: Attr::known("symmetric_encrypt_decrypt"),
            protection: Attr::known("software"),
            import_only: Attr::Known(true),
            ..Default::default()
        };
        let payload = to_create_payload(Some(&model)).unwrap();
        assert_eq!(payload.algorithm.as_deref(), Some("aes_256_gcm"));
        assert_eq!(payload.import_only, Some(true));
        assert!(payload.description.is_none());
        assert!(payload.access_scope.is_none());
    }

    #[test]
    fn scheduled_keys_count_as_deleted() {
        let key = |state: &str| Key {
            state: Some(state.to_string()),
            ..Default::default()
        };
        assert!(is_deleted(&key("deleted")));
        assert!(is_deleted(&key("deletion_scheduled")));
        assert!(!is_deleted(&key("active")));
        assert!(!is_deleted(&Key::default()));
    }

    #[test]
    fn import_key() {
        let resp = KeyResource::default().import_state(ImportStateRequest {
            id: "pid,eu01,krid,kid".to_string(),
        });
        assert!(!resp.has_error());
        assert_eq!(resp.state.get_string("project_id"), Some("pid"));
        assert_eq!(resp.state.get_string("key_id"), Some("kid"));
    }

    #[test]
    fn algorithm_is_validated() {
        let config = serde_json::json!({
            "project_id": "6e4a8a52-4ad9-4d36-a6d4-3a8fa2c1b0a1",
            "keyring_id": "1b1f4a4f-52a5-4b83-9bb9-e2f0c4d5e6f7",
            "display_name": "key",
            "algorithm": "des",
            "purpose": "symmetric_encrypt_decrypt",
            "protection": "software"
        });
        let errors = schema().validate(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
    }
}
