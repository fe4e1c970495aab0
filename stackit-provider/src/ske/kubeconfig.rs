//! `stackit_ske_kubeconfig`
//!
//! Kubeconfigs cannot be read back from the API. The resource lives only in
//! state and is recreated once it is (about to be) expired and `refresh` is set.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use stackit_core::ProviderData;
use stackit_core::diagnostics::Diagnostics;
use stackit_core::error::{CoreError, CoreResult};
use stackit_core::ids::build_id;
use stackit_core::resource::{
    BoxFuture, CreateRequest, DeleteRequest, ImportStateRequest, ReadRequest, Resource, Response,
    UpdateRequest,
};
use stackit_core::schema::{AttributeSchema, AttributeType, ResourceSchema, Validator, common};
use stackit_core::types::{Attr, BoolAttr, IntAttr, StringAttr};
use stackit_sdk::ske::{self, CreateKubeconfigPayload, Kubeconfig, SkeClient};

use crate::error::{ApiContext, ProviderResult};
use crate::utils::{configure_client, finish, require_client, update_not_supported};

pub const TYPE_NAME: &str = "stackit_ske_kubeconfig";
const ID_FIELDS: &[&str] = &["project_id", "cluster_name", "kube_config_id"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Model {
    pub id: StringAttr,
    pub project_id: StringAttr,
    pub cluster_name: StringAttr,
    pub kube_config_id: StringAttr,
    pub kube_config: StringAttr,
    pub expiration: IntAttr,
    pub refresh: BoolAttr,
    pub refresh_before: IntAttr,
    pub expires_at: StringAttr,
    pub creation_time: StringAttr,
}

pub fn schema() -> ResourceSchema {
    ResourceSchema::new(TYPE_NAME)
        .with_description("SKE Cluster kubeconfig resource schema. Must have a region specified in the provider configuration.")
        .attribute(common::id(ID_FIELDS))
        .attribute(common::project_id())
        .attribute(
            AttributeSchema::new("cluster_name", AttributeType::String)
                .required()
                .requires_replace()
                .with_validator(Validator::NoSeparator)
                .with_description("Name of the SKE cluster."),
        )
        .attribute(common::computed_id("kube_config_id", "Internally generated UUID to identify a kubeconfig resource in Terraform, since the SKE API doesnt return a kubeconfig identifier"))
        .attribute(
            AttributeSchema::new("kube_config", AttributeType::String)
                .computed()
                .sensitive()
                .with_description("Raw short-lived admin kubeconfig."),
        )
        .attribute(
            AttributeSchema::new("expiration", AttributeType::Int)
                .optional_computed()
                .requires_replace()
                .with_validator(Validator::IntAtLeast(600))
                .with_description("Expiration time of the kubeconfig, in seconds. Defaults to `3600`"),
        )
        .attribute(
            AttributeSchema::new("refresh", AttributeType::Bool)
                .requires_replace()
                .with_description("If set to true, the provider will check if the kubeconfig has expired and will generate a new valid one in-place"),
        )
        .attribute(
            AttributeSchema::new("refresh_before", AttributeType::Int)
                .requires_replace()
                .with_validator(Validator::IntAtLeast(1))
                .with_description("Number of seconds before expiration to trigger refresh of the kubeconfig at. Only used if refresh is set to true."),
        )
        .attribute(
            AttributeSchema::new("expires_at", AttributeType::String)
                .computed()
                .with_description("Timestamp when the kubeconfig expires"),
        )
        .attribute(
            AttributeSchema::new("creation_time", AttributeType::String)
                .computed()
                .with_description("Date-time when the kubeconfig was created"),
        )
}

pub fn map_fields(response: Option<&Kubeconfig>, model: Option<&mut Model>, now: DateTime<Utc>) -> CoreResult<()> {
    let response = response.ok_or_else(|| CoreError::mapping("response input is nil"))?;
    let model = model.ok_or_else(|| CoreError::mapping("model input is nil"))?;

    let kube_config_id = model
        .kube_config_id
        .to_option()
        .ok_or_else(|| CoreError::mapping("kube_config_id not present"))?;
    let kube_config = response
        .kubeconfig
        .clone()
        .ok_or_else(|| CoreError::mapping("response has no kubeconfig"))?;

    model.id = Attr::known(build_id(&[
        &model.project_id.value_string(),
        &model.cluster_name.value_string(),
        &kube_config_id,
    ]));
    model.kube_config = Attr::known(kube_config);
    model.expires_at = Attr::from_option(response.expiration_timestamp.map(|t| t.to_rfc3339()));
    model.creation_time = Attr::known(now.to_rfc3339());
    Ok(())
}

pub fn to_create_payload(model: Option<&Model>) -> CoreResult<CreateKubeconfigPayload> {
    let model = model.ok_or_else(|| CoreError::mapping("nil model"))?;
    Ok(CreateKubeconfigPayload {
        expiration_seconds: model.expiration.to_option().map(|e| e.to_string()),
    })
}

/// The kubeconfig must be recreated: `refresh` is set and `now` lies past
/// `expires_at - refresh_before`
pub fn needs_refresh(model: &Model, now: DateTime<Utc>) -> CoreResult<bool> {
    if model.refresh.value() != Some(&true) {
        return Ok(false);
    }
    let Some(expires_at) = model.expires_at.as_str() else {
        return Ok(false);
    };
    let expires_at = DateTime::parse_from_rfc3339(expires_at)
        .map_err(|e| CoreError::mapping(format!("parsing expiration timestamp '{}': {}", expires_at, e)))?
        .with_timezone(&Utc);
    let refresh_before = Duration::seconds(model.refresh_before.to_option().unwrap_or(0));
    Ok(now >= expires_at - refresh_before)
}

#[derive(Default)]
pub struct KubeconfigResource {
    client: Option<SkeClient>,
}

impl KubeconfigResource {
    async fn create_kubeconfig(&self, req: CreateRequest, resp: &mut Response) -> ProviderResult<()> {
        let client = require_client(&self.client)?;
        let mut model: Model = req.plan.get()?;
        let project_id = model.project_id.value_string();
        let cluster_name = model.cluster_name.value_string();
        model.kube_config_id = Attr::known(uuid::Uuid::new_v4().to_string());

        let payload = to_create_payload(Some(&model))?;
        let kubeconfig = client
            .create_kubeconfig(&project_id, &cluster_name, &payload)
            .await
            .context("Calling API")?;

        map_fields(Some(&kubeconfig), Some(&mut model), Utc::now())?;
        resp.state.set(&model)?;
        log::info!("Kubeconfig for cluster {} created", cluster_name);
        Ok(())
    }

    fn read_kubeconfig(&self, req: ReadRequest, resp: &mut Response) -> ProviderResult<()> {
        let model: Model = req.state.get()?;
        if needs_refresh(&model, Utc::now())? {
            log::info!(
                "Kubeconfig {} expires at {}, scheduling recreation",
                model.kube_config_id.value_string(),
                model.expires_at.value_string()
            );
            resp.state.remove_resource();
            return Ok(());
        }
        resp.state.set(&model)?;
        Ok(())
    }
}

impl Resource for KubeconfigResource {
    fn metadata(&self, provider_type_name: &str) -> String {
        format!("{}_ske_kubeconfig", provider_type_name)
    }

    fn schema(&self) -> ResourceSchema {
        schema()
    }

    fn configure(&mut self, provider_data: &ProviderData, diags: &mut Diagnostics) {
        self.client = configure_client(provider_data, ske::SERVICE, SkeClient::new, diags);
    }

    fn create(&self, req: CreateRequest) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            let mut resp = Response::default();
            let result = self.create_kubeconfig(req, &mut resp).await;
            finish(resp, result, "Error creating kubeconfig")
        })
    }

    fn read(&self, req: ReadRequest) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            let mut resp = Response::default();
            let result = self.read_kubeconfig(req, &mut resp);
            finish(resp, result, "Error reading kubeconfig")
        })
    }

    fn update(&self, _req: UpdateRequest) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            finish(Response::default(), Err(update_not_supported("kubeconfig")), "Error updating kubeconfig")
        })
    }

    fn delete(&self, req: DeleteRequest) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            if let Some(id) = req.state.get_string("kube_config_id") {
                log::info!("Kubeconfig {} removed from state", id);
            }
            Response::default()
        })
    }

    fn import_state(&self, _req: ImportStateRequest) -> Response {
        let mut resp = Response::default();
        resp.diagnostics.log_and_add_error(
            "Error importing kubeconfig",
            "Kubeconfigs cannot be imported, they are only known at creation time",
        );
        resp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackit_core::State;

    fn created(now: DateTime<Utc>) -> Model {
        let mut model = Model {
            project_id: Attr::known("pid"),
            cluster_name: Attr::known("demo"),
            kube_config_id: Attr::known("kcid"),
            refresh: Attr::Known(true),
            ..Default::default()
        };
        let response = Kubeconfig {
            kubeconfig: Some("apiVersion: v1".to_string()),
            expiration_timestamp: Some(now + Duration::hours(1)),
        };
        map_fields(Some(&response), Some(&mut model), now).unwrap();
        model
    }

    #[test]
    fn map_fields_builds_id() {
        let model = created(Utc::now());
        assert_eq!(model.id, Attr::known("pid,demo,kcid"));
        assert_eq!(model.kube_config, Attr::known("apiVersion: v1"));
        assert!(model.expires_at.is_known());
    }

    #[test]
    fn map_fields_requires_kubeconfig() {
        let mut model = Model {
            kube_config_id: Attr::known("kcid"),
            ..Default::default()
        };
        assert!(map_fields(Some(&Kubeconfig::default()), Some(&mut model), Utc::now()).is_err());
        assert!(map_fields(None, Some(&mut model), Utc::now()).is_err());
    }

    #[test]
    fn expiration_is_sent_as_string() {
        let model = Model {
            expiration: Attr::Known(7200),
            ..Default::default()
        };
        let payload = to_create_payload(Some(&model)).unwrap();
        assert_eq!(payload.expiration_seconds.as_deref(), Some("7200"));
        assert!(to_create_payload(Some(&Model::default())).unwrap().expiration_seconds.is_none());
    }

    #[test]
    fn refresh_window() {
        let now = Utc::now();
        let mut model = created(now);
        assert!(!needs_refresh(&model, now).unwrap());
        assert!(needs_refresh(&model, now + Duration::hours(2)).unwrap());

        model.refresh_before = Attr::Known(3600);
        assert!(needs_refresh(&model, now + Duration::minutes(1)).unwrap());

        model.refresh = Attr::Known(false);
        assert!(!needs_refresh(&model, now + Duration::hours(2)).unwrap());
    }

    #[tokio::test]
    async fn read_drops_expired_kubeconfig() {
        let mut model = created(Utc::now() - Duration::hours(2));
        let resource = KubeconfigResource::default();

        let resp = resource
            .read(ReadRequest {
                state: State::from_model(&model).unwrap(),
            })
            .await;
        assert!(!resp.has_error());
        assert!(resp.state.is_empty());

        model.refresh = Attr::Null;
        let resp = resource
            .read(ReadRequest {
                state: State::from_model(&model).unwrap(),
            })
            .await;
        assert!(!resp.state.is_empty());
    }

    #[tokio::test]
    async fn update_and_import_are_rejected() {
        let resource = KubeconfigResource::default();
        let resp = resource
            .update(UpdateRequest::default()).await;
        assert!(resp.has_error());
        let resp = resource.import_state(ImportStateRequest {
            id: "pid,demo,kcid".to_string(),
        });
        assert!(resp.has_error());
    }
}
