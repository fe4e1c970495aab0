//! `stackit_argus_instance`

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
use stackit_core::types::{Attr, BoolAttr, MapAttr, StringAttr};
use stackit_sdk::argus::{self, ArgusClient, CreateInstancePayload, Instance, UpdateInstancePayload};

use super::{WAIT_TIMEOUT_MINUTES, resolve_plan_id};
use crate::error::{ApiContext, ProviderResult};
use crate::utils::{
    configure_client, ensure_found, finish, is_gone, record_then_wait, require_client, wait_timeout,
};

pub const TYPE_NAME: &str = "stackit_argus_instance";
const ID_FIELDS: &[&str] = &["project_id", "instance_id"];

const URL_ATTRIBUTES: &[(&str, &str)] = &[
    ("dashboard_url", "Specifies Argus instance dashboard URL."),
    ("grafana_url", "Specifies Grafana URL."),
    ("metrics_url", "Specifies metrics URL."),
    ("metrics_push_url", "Specifies URL for pushing metrics."),
    ("targets_url", "Specifies Targets URL."),
    ("alerting_url", "Specifies Alerting URL."),
    ("logs_url", "Specifies Logs URL."),
    ("logs_push_url", "Specifies URL for pushing logs."),
    ("jaeger_traces_url", "Specifies Jaeger traces URL."),
    ("otlp_traces_url", "Specifies OTLP traces URL."),
    ("zipkin_spans_url", "Specifies Zipkin spans URL."),
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Model {
    pub id: StringAttr,
    pub instance_id: StringAttr,
    pub project_id: StringAttr,
    pub name: StringAttr,
    pub plan_name: StringAttr,
    pub plan_id: StringAttr,
    pub parameters: MapAttr<String>,
    pub is_updatable: BoolAttr,
    pub grafana_public_read_access: BoolAttr,
    pub dashboard_url: StringAttr,
    pub grafana_url: StringAttr,
    pub metrics_url: StringAttr,
    pub metrics_push_url: StringAttr,
    pub targets_url: StringAttr,
    pub alerting_url: StringAttr,
    pub logs_url: StringAttr,
    pub logs_push_url: StringAttr,
    pub jaeger_traces_url: StringAttr,
    pub otlp_traces_url: StringAttr,
    pub zipkin_spans_url: StringAttr,
}

pub fn schema() -> ResourceSchema {
    let mut schema = ResourceSchema::new(TYPE_NAME)
        .with_description("Argus instance resource schema.")
        .attribute(common::id(ID_FIELDS))
        .attribute(common::computed_id("instance_id", "The Argus instance ID."))
        .attribute(common::project_id())
        .attribute(
            AttributeSchema::new("name", AttributeType::String)
                .required()
                .with_validator(Validator::LengthBetween(1, 300))
                .with_description("The name of the Argus instance."),
        )
        .attribute(
            AttributeSchema::new("plan_name", AttributeType::String)
                .required()
                .with_validator(Validator::LengthBetween(1, 200))
                .with_description("Specifies the Argus plan. E.g. `Monitoring-Medium-EU01`."),
        )
        .attribute(common::computed_id("plan_id", "The Argus plan ID."))
        .attribute(
            AttributeSchema::new("parameters", AttributeType::map_of(AttributeType::String))
                .with_description("Additional parameters."),
        )
        .attribute(
            AttributeSchema::new("is_updatable", AttributeType::Bool)
                .computed()
                .with_description("Specifies if the instance can be updated."),
        )
        .attribute(
            AttributeSchema::new("grafana_public_read_access", AttributeType::Bool)
                .computed()
                .with_description("If true, anyone can access Grafana dashboards without logging in."),
        );
    for (name, description) in URL_ATTRIBUTES {
        schema = schema.attribute(
            AttributeSchema::new(*name, AttributeType::String)
                .computed()
                .with_description(*description),
        );
    }
    schema
}

pub fn map_fields(response: Option<&Instance>, model: Option<&mut Model>) -> CoreResult<()> {
    let response = response.ok_or_else(|| CoreError::mapping("response input is nil"))?;
    let model = model.ok_or_else(|| CoreError::mapping("model input is nil"))?;

    let instance_id = match (&response.id, model.instance_id.as_str()) {
        (Some(id), _) => id.clone(),
        (None, Some(id)) => id.to_string(),
        (None, None) => return Err(CoreError::mapping("instance id not present")),
    };

    model.id = Attr::known(build_id(&[&model.project_id.value_string(), &instance_id]));
    model.instance_id = Attr::known(instance_id);
    model.name = Attr::from_option(response.name.clone());
    model.plan_name = Attr::from_option(response.plan_name.clone());
    model.plan_id = Attr::from_option(response.plan_id.clone());
    model.parameters = match &response.parameters {
        Some(p) if !p.is_empty() => Attr::Known(p.clone()),
        _ => Attr::Null,
    };
    model.is_updatable = Attr::from_option(response.is_updatable);
    model.dashboard_url = Attr::from_option(response.dashboard_url.clone());

    let urls = response.instance.clone().unwrap_or_default();
    model.grafana_public_read_access = Attr::from_option(urls.grafana_public_read_access);
    model.grafana_url = Attr::from_option(urls.grafana_url);
    model.metrics_url = Attr::from_option(urls.metrics_url);
    model.metrics_push_url = Attr::from_option(urls.metrics_push_url);
    model.targets_url = Attr::from_option(urls.targets_url);
    model.alerting_url = Attr::from_option(urls.alerting_url);
    model.logs_url = Attr::from_option(urls.logs_url);
    model.logs_push_url = Attr::from_option(urls.logs_push_url);
    model.jaeger_traces_url = Attr::from_option(urls.jaeger_traces_url);
    model.otlp_traces_url = Attr::from_option(urls.otlp_traces_url);
    model.zipkin_spans_url = Attr::from_option(urls.zipkin_spans_url);
    Ok(())
}

pub fn to_create_payload(model: Option<&Model>, plan_id: &str) -> CoreResult<CreateInstancePayload> {
    let model = model.ok_or_else(|| CoreError::mapping("nil model"))?;
    Ok(CreateInstancePayload {
        name: model.name.to_option(),
        plan_id: Some(plan_id.to_string()),
        parameter: model.parameters.to_option(),
    })
}

pub fn to_update_payload(model: Option<&Model>, plan_id: &str) -> CoreResult<UpdateInstancePayload> {
    let model = model.ok_or_else(|| CoreError::mapping("nil model"))?;
    Ok(UpdateInstancePayload {
        name: model.name.to_option(),
        plan_id: Some(plan_id.to_string()),
        parameter: model.parameters.to_option(),
    })
}

#[derive(Default)]
pub struct InstanceResource {
    client: Option<ArgusClient>,
    provider_data: ProviderData,
}

impl InstanceResource {
    async fn load_plan_id(&self, client: &ArgusClient, model: &Model) -> ProviderResult<String> {
        let plans = client
            .list_plans(&model.project_id.value_string())
            .await
            .context("Loading plans")?;
        resolve_plan_id(&plans.plans, &model.plan_name.value_string())
    }

    async fn create_instance(&self, req: CreateRequest, resp: &mut Response) -> ProviderResult<()> {
        let client = require_client(&self.client)?;
        let mut model: Model = req.plan.get()?;
        let project_id = model.project_id.value_string();

        let plan_id = self.load_plan_id(client, &model).await?;
        let payload = to_create_payload(Some(&model), &plan_id)?;
        let created = client
            .create_instance(&project_id, &payload)
            .await
            .context("Calling API")?;
        let instance_id = created
            .instance_id
            .ok_or_else(|| CoreError::mapping("API response has no instance id"))?;

        let wait = argus::wait::create_instance_wait_handler(client, &project_id, &instance_id)
            .set_timeout(wait_timeout(&self.provider_data, WAIT_TIMEOUT_MINUTES))
            .wait();
        let instance = record_then_wait(
            &mut resp.state,
            &[("project_id", project_id.as_str()), ("instance_id", instance_id.as_str())],
            wait,
            "Waiting for instance creation",
        )
        .await?;

        map_fields(Some(&instance), Some(&mut model))?;
        resp.state.set(&model)?;
        log::info!("Argus instance {} created", instance_id);
        Ok(())
    }

    async fn read_instance(&self, req: ReadRequest, resp: &mut Response) -> ProviderResult<()> {
        let client = require_client(&self.client)?;
        let mut model: Model = req.state.get()?;
        let project_id = model.project_id.value_string();
        let instance_id = model.instance_id.value_string();

        let instance = match client.get_instance(&project_id, &instance_id).await.context("Calling API") {
            Ok(i) if i.status.as_deref() == Some(argus::STATUS_DELETE_SUCCEEDED) => {
                resp.state.remove_resource();
                return Ok(());
            }
            Ok(i) => i,
            Err(e) if is_gone(&e) => {
                resp.state.remove_resource();
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        map_fields(Some(&instance), Some(&mut model))?;
        resp.state.set(&model)?;
        Ok(())
    }

    async fn update_instance(&self, req: UpdateRequest, resp: &mut Response) -> ProviderResult<()> {
        let client = require_client(&self.client)?;
        let mut model: Model = req.plan.get()?;
        let project_id = model.project_id.value_string();
        let instance_id = model.instance_id.value_string();

        let plan_id = self.load_plan_id(client, &model).await?;
        let payload = to_update_payload(Some(&model), &plan_id)?;
        client
            .update_instance(&project_id, &instance_id, &payload)
            .await
            .context("Calling API")?;

        let instance = argus::wait::update_instance_wait_handler(client, &project_id, &instance_id)
            .set_timeout(wait_timeout(&self.provider_data, WAIT_TIMEOUT_MINUTES))
            .wait()
            .await
            .context("Waiting for instance update")?;

        map_fields(Some(&instance), Some(&mut model))?;
        resp.state.set(&model)?;
        log::info!("Argus instance {} updated", instance_id);
        Ok(())
    }

    async fn delete_instance(&self, req: DeleteRequest) -> ProviderResult<()> {
        let client = require_client(&self.client)?;
        let model: Model = req.state.get()?;
        let project_id = model.project_id.value_string();
        let instance_id = model.instance_id.value_string();

        match client.delete_instance(&project_id, &instance_id).await.context("Calling API") {
            Err(e) if is_gone(&e) => return Ok(()),
            Err(e) => return Err(e),
            Ok(()) => {}
        }
        argus::wait::delete_instance_wait_handler(client, &project_id, &instance_id)
            .set_timeout(wait_timeout(&self.provider_data, WAIT_TIMEOUT_MINUTES))
            .wait()
            .await
            .context("Waiting for instance deletion")?;
        log::info!("Argus instance {} deleted", instance_id);
        Ok(())
    }
}

impl Resource for InstanceResource {
    fn metadata(&self, provider_type_name: &str) -> String {
        format!("{}_argus_instance", provider_type_name)
    }

    fn schema(&self) -> ResourceSchema {
        schema()
    }

    fn configure(&mut self, provider_data: &ProviderData, diags: &mut Diagnostics) {
        self.client = configure_client(provider_data, argus::SERVICE, ArgusClient::new, diags);
        self.provider_data = provider_data.clone();
    }

    fn create(&self, req: CreateRequest) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            let mut resp = Response::default();
            let result = self.create_instance(req, &mut resp).await;
            finish(resp, result, "Error creating instance")
        })
    }

    fn read(&self, req: ReadRequest) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            let mut resp = Response::default();
            let result = self.read_instance(req, &mut resp).await;
            finish(resp, result, "Error reading instance")
        })
    }

    fn update(&self, req: UpdateRequest) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            let mut resp = Response::default();
            let result = self.update_instance(req, &mut resp).await;
            finish(resp, result, "Error updating instance")
        })
    }

    fn delete(&self, req: DeleteRequest) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            let result = self.delete_instance(req).await;
            finish(Response::default(), result, "Error deleting instance")
        })
    }

    fn import_state(&self, req: ImportStateRequest) -> Response {
        import_composite_id(&req.id, ID_FIELDS, "Error importing instance")
    }
}

#[derive(Default)]
pub struct InstanceDataSource {
    resource: InstanceResource,
}

impl DataSource for InstanceDataSource {
    fn metadata(&self, provider_type_name: &str) -> String {
        format!("{}_argus_instance", provider_type_name)
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
                .read_instance(ReadRequest { state: req.config }, &mut resp)
                .await
                .and_then(|_| ensure_found(&resp.state, "Instance"));
            finish(resp, result, "Error reading instance")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use stackit_sdk::argus::InstanceSensitiveData;

    #[test]
    fn map_fields_copies_urls() {
        let mut model = Model {
            project_id: Attr::known("pid"),
            ..Default::default()
        };
        let response = Instance {
            id: Some("iid".to_string()),
            name: Some("monitoring".to_string()),
            plan_id: Some("plan-1".to_string()),
            plan_name: Some("Monitoring-Medium-EU01".to_string()),
            instance: Some(InstanceSensitiveData {
                grafana_url: Some("https://grafana".to_string()),
                metrics_url: Some("https://metrics".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        map_fields(Some(&response), Some(&mut model)).unwrap();
        assert_eq!(model.id, Attr::known("pid,iid"));
        assert_eq!(model.plan_id, Attr::known("plan-1"));
        assert_eq!(model.grafana_url, Attr::known("https://grafana"));
        assert!(model.logs_url.is_null());
        assert!(model.parameters.is_null());
    }

    #[test]
    fn map_fields_rejects_missing_id() {
        let mut model = Model::default();
        assert!(map_fields(Some(&Instance::default()), Some(&mut model)).is_err());
        assert!(map_fields(None, Some(&mut model)).is_err());
        assert!(map_fields(Some(&Instance::default()), None).is_err());
    }

    #[test]
    fn payloads_carry_plan_id_and_parameters() {
        let model = Model {
            name: Attr::known("monitoring"),
            parameters: Attr::Known(BTreeMap::from([("sgw_acl".to_string(), "10.0.0.0/8".to_string())])),
            ..Default::default()
        };
        let create = to_create_payload(Some(&model), "plan-1").unwrap();
        assert_eq!(create.plan_id.as_deref(), Some("plan-1"));
        assert_eq!(create.parameter.unwrap().len(), 1);

        let update = to_update_payload(Some(&Model::default()), "plan-2").unwrap();
        assert!(update.name.is_none());
        assert!(update.parameter.is_none());
        assert!(to_update_payload(None, "plan-2").is_err());
    }

    #[test]
    fn schema_marks_urls_computed() {
        let schema = schema();
        for (name, _) in URL_ATTRIBUTES {
            assert!(schema.get(name).unwrap().is_computed(), "{}", name);
        }
        assert!(schema.get("plan_name").unwrap().is_required());
    }
}
