//! `stackit_kms_wrapping_key`

use serde::{Deserialize, Serialize};
use stackit_core::ProviderData;
use stackit_core::diagnostics::Diagnostics;
use stackit_core::error::{CoreError, CoreResult};
use stackit_core::ids::build_id;
use stackit_core::resource::{
    BoxFuture, CreateRequest, DeleteRequest, ImportStateRequest, ReadRequest, Resource, Response,
    UpdateRequest, import_composite_id,
};
use stackit_core::schema::{AttributeSchema, AttributeType, ResourceSchema, Validator, common};
use stackit_core::types::{Attr, StringAttr};
use stackit_sdk::kms::{self, CreateWrappingKeyPayload, KmsClient, WrappingKey};

use crate::error::{ApiContext, ProviderResult};
use crate::utils::{configure_client, finish, is_gone, require_client, update_not_supported, wait_timeout};

pub const TYPE_NAME: &str = "stackit_kms_wrapping_key";
const ID_FIELDS: &[&str] = &["project_id", "region", "keyring_id", "wrapping_key_id"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Model {
    pub id: StringAttr,
    pub wrapping_key_id: StringAttr,
    pub keyring_id: StringAttr,
    pub project_id: StringAttr,
    pub region: StringAttr,
    pub display_name: StringAttr,
    pub description: StringAttr,
    pub algorithm: StringAttr,
    pub purpose: StringAttr,
    pub protection: StringAttr,
    pub access_scope: StringAttr,
    pub public_key: StringAttr,
    pub created_at: StringAttr,
    pub expires_at: StringAttr,
}

pub fn schema() -> ResourceSchema {
    ResourceSchema::new(TYPE_NAME)
        .with_description("KMS wrapping key resource schema.")
        .attribute(common::id(ID_FIELDS))
        .attribute(common::computed_id("wrapping_key_id", "The ID of the wrapping key."))
        .attribute(common::uuid_key("keyring_id", "The ID of the associated keyring."))
        .attribute(common::project_id())
        .attribute(common::region())
        .attribute(super::display_name("wrapping key"))
        .attribute(super::description("wrapping key"))
        .attribute(
            AttributeSchema::new("algorithm", AttributeType::String)
                .required()
                .requires_replace()
                .with_validator(Validator::one_of(kms::WRAPPING_ALGORITHMS))
                .with_description("The wrapping algorithm used to wrap the key to import."),
        )
        .attribute(
            AttributeSchema::new("purpose", AttributeType::String)
                .required()
                .requires_replace()
                .with_validator(Validator::one_of(kms::WRAPPING_PURPOSES))
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
            AttributeSchema::new("public_key", AttributeType::String)
                .computed()
                .with_description("The public key of the wrapping key."),
        )
        .attribute(
            AttributeSchema::new("created_at", AttributeType::String)
                .computed()
                .with_description("The date and time the creation of the wrapping key was triggered."),
        )
        .attribute(
            AttributeSchema::new("expires_at", AttributeType::String)
                .computed()
                .with_description("The date and time the wrapping key will expire."),
        )
}

pub fn map_fields(response: Option<&WrappingKey>, model: Option<&mut Model>, region: &str) -> CoreResult<()> {
    let response = response.ok_or_else(|| CoreError::mapping("response input is nil"))?;
    let model = model.ok_or_else(|| CoreError::mapping("model input is nil"))?;

    let wrapping_key_id = match (&response.id, model.wrapping_key_id.as_str()) {
        (Some(id), _) => id.clone(),
        (None, Some(id)) => id.to_string(),
        (None, None) => return Err(CoreError::mapping("wrapping key id not present")),
    };
    if let Some(keyring_id) = &response.key_ring_id {
        model.keyring_id = Attr::known(keyring_id.as_str());
    }

    model.id = Attr::known(build_id(&[
        &model.project_id.value_string(),
        region,
        &model.keyring_id.value_string(),
        &wrapping_key_id,
    ]));
    model.wrapping_key_id = Attr::known(wrapping_key_id);
    model.region = Attr::known(region);
    model.display_name = Attr::from_option(response.display_name.clone());
    model.description = Attr::from_option(response.description.clone());
    model.algorithm = Attr::from_option(response.algorithm.clone());
    model.purpose = Attr::from_option(response.purpose.clone());
    model.protection = Attr::from_option(response.protection.clone());
    model.access_scope = Attr::from_option(response.access_scope.clone());
    model.public_key = Attr::from_option(response.public_key.clone());
    model.created_at = Attr::from_option(response.created_at.map(|t| t.to_rfc3339()));
    model.expires_at = Attr::from_option(response.expires_at.map(|t| t.to_rfc3339()));
    Ok(())
}

pub fn to_create_payload(model: Option<&Model>) -> CoreResult<CreateWrappingKeyPayload> {
    let model = model.ok_or_else(|| CoreError::mapping("nil model"))?;
    Ok(CreateWrappingKeyPayload {
        display_name: model.display_name.to_option(),
        description: model.description.to_option(),
        algorithm: model.algorithm.to_option(),
        purpose: model.purpose.to_option(),
        protection: model.protection.to_option(),
        access_scope: model.access_scope.to_option(),
    })
}

#[derive(Default)]
pub struct WrappingKeyResource {
    client: Option<KmsClient>,
    provider_data: ProviderData,
}

impl WrappingKeyResource {
    async fn create_wrapping_key(&self, req: CreateRequest, resp: &mut Response) -> ProviderResult<()> {
        let client = require_client(&self.client)?;
        let mut model: Model = req.plan.get()?;
        let project_id = model.project_id.value_string();
        let keyring_id = model.keyring_id.value_string();
        let region = self.provider_data.region_for(&model.region);

        let payload = to_create_payload(Some(&model))?;
        let created = client
            .create_wrapping_key(&project_id, &region, &keyring_id, &payload)
            .await
            .context("Calling API")?;
        let wrapping_key_id = created
            .id
            .ok_or_else(|| CoreError::mapping("API response has no wrapping key id"))?;

        let wrapping_key =
            kms::wait::create_wrapping_key_wait_handler(client, &project_id, &region, &keyring_id, &wrapping_key_id)
                .set_timeout(wait_timeout(&self.provider_data, super::WAIT_TIMEOUT_MINUTES))
                .wait()
                .await
                .context("Waiting for wrapping key creation")?;

        map_fields(Some(&wrapping_key), Some(&mut model), &region)?;
        resp.state.set(&model)?;
        log::info!("Wrapping key {} created", wrapping_key_id);
        Ok(())
    }

    async fn read_wrapping_key(&self, req: ReadRequest, resp: &mut Response) -> ProviderResult<()> {
        let client = require_client(&self.client)?;
        let mut model: Model = req.state.get()?;
        let region = self.provider_data.region_for(&model.region);

        let wrapping_key = match client
            .get_wrapping_key(
                &model.project_id.value_string(),
                &region,
                &model.keyring_id.value_string(),
                &model.wrapping_key_id.value_string(),
            )
            .await
            .context("Calling API")
        {
            Ok(k) => k,
            Err(e) if is_gone(&e) => {
                resp.state.remove_resource();
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        map_fields(Some(&wrapping_key), Some(&mut model), &region)?;
        resp.state.set(&model)?;
        Ok(())
    }

    async fn delete_wrapping_key(&self, req: DeleteRequest) -> ProviderResult<()> {
        let client = require_client(&self.client)?;
        let model: Model = req.state.get()?;
        let region = self.provider_data.region_for(&model.region);

        if let Err(e) = client
            .delete_wrapping_key(
                &model.project_id.value_string(),
                &region,
                &model.keyring_id.value_string(),
                &model.wrapping_key_id.value_string(),
            )
            .await
            .context("Calling API")
            && !is_gone(&e)
        {
            return Err(e);
        }
        log::info!("Wrapping key {} deleted", model.wrapping_key_id.value_string());
        Ok(())
    }
}

impl Resource for WrappingKeyResource {
    fn metadata(&self, provider_type_name: &str) -> String {
        format!("{}_kms_wrapping_key", provider_type_name)
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
            let result = self.create_wrapping_key(req, &mut resp).await;
            finish(resp, result, "Error creating wrapping key")
        })
    }

    fn read(&self, req: ReadRequest) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            let mut resp = Response::default();
            let result = self.read_wrapping_key(req, &mut resp).await;
            finish(resp, result, "Error reading wrapping key")
        })
    }

    fn update(&self, _req: UpdateRequest) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            finish(
                Response::default(),
                Err(update_not_supported("wrapping key")),
                "Error updating wrapping key",
            )
        })
    }

    fn delete(&self, req: DeleteRequest) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            let result = self.delete_wrapping_key(req).await;
            finish(Response::default(), result, "Error deleting wrapping key")
        })
    }

    fn import_state(&self, req: ImportStateRequest) -> Response {
        import_composite_id(&req.id, ID_FIELDS, "Error importing wrapping key")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn map_fields_formats_timestamps() {
        let mut model = Model {
            project_id: Attr::known("pid"),
            ..Default::default()
        };
        let response = WrappingKey {
            id: Some("wid".to_string()),
            key_ring_id: Some("krid".to_string()),
            public_key: Some("-----BEGIN PUBLIC KEY-----".to_string()),
            expires_at: Some(Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap()),
            ..Default::default()
        };
        map_fields(Some(&response), Some(&mut model), "eu01").unwrap();
        assert_eq!(model.id, Attr::known("pid,eu01,krid,wid"));
        assert_eq!(model.keyring_id, Attr::known("krid"));
        assert_eq!(model.expires_at, Attr::known("2026-01-02T03:04:05+00:00"));
        assert!(model.created_at.is_null());
    }

    #[test]
    fn create_payload_requires_model() {
        assert!(to_create_payload(None).is_err());
        let payload = to_create_payload(Some(&Model::default())).unwrap();
        assert_eq!(payload, CreateWrappingKeyPayload::default());
    }
}
