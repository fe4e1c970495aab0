//! `stackit_<service>_instance` for LogMe, OpenSearch and MariaDB

use std::marker::PhantomData;

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
use stackit_core::types::{Attr, BoolAttr, IntAttr, ListAttr, StringAttr};
use stackit_sdk::dsa::{
    self, CreateInstancePayload, DsaClient, Instance, InstanceParameters, PartialUpdateInstancePayload,
};

use super::{DsaService, WAIT_TIMEOUT_MINUTES, plan_name_and_version, resolve_plan_id};
use crate::error::{ApiContext, ProviderResult};
use crate::utils::{
    configure_client, ensure_found, finish, is_gone, record_then_wait, require_client, wait_timeout,
};

const ID_FIELDS: &[&str] = &["project_id", "instance_id"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    pub sgw_acl: StringAttr,
    pub enable_monitoring: BoolAttr,
    pub graphite: StringAttr,
    pub max_disk_threshold: IntAttr,
    pub metrics_frequency: IntAttr,
    pub metrics_prefix: StringAttr,
    pub monitoring_instance_id: StringAttr,
    pub syslog: ListAttr<String>,
}

impl Parameters {
    fn from_api(parameters: &InstanceParameters) -> Self {
        Self {
            sgw_acl: Attr::from_option(parameters.sgw_acl.clone()),
            enable_monitoring: Attr::from_option(parameters.enable_monitoring),
            graphite: Attr::from_option(parameters.graphite.clone()),
            max_disk_threshold: Attr::from_option(parameters.max_disk_threshold),
            metrics_frequency: Attr::from_option(parameters.metrics_frequency),
            metrics_prefix: Attr::from_option(parameters.metrics_prefix.clone()),
            monitoring_instance_id: Attr::from_option(parameters.monitoring_instance_id.clone()),
            syslog: Attr::from_option(parameters.syslog.clone()),
        }
    }

    fn to_api(&self) -> InstanceParameters {
        InstanceParameters {
            sgw_acl: self.sgw_acl.to_option(),
            enable_monitoring: self.enable_monitoring.to_option(),
            graphite: self.graphite.to_option(),
            max_disk_threshold: self.max_disk_threshold.to_option(),
            metrics_frequency: self.metrics_frequency.to_option(),
            metrics_prefix: self.metrics_prefix.to_option(),
            monitoring_instance_id: self.monitoring_instance_id.to_option(),
            syslog: self.syslog.to_option(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Model {
    pub id: StringAttr,
    pub instance_id: StringAttr,
    pub project_id: StringAttr,
    pub name: StringAttr,
    pub version: StringAttr,
    pub plan_name: StringAttr,
    pub plan_id: StringAttr,
    pub parameters: Attr<Parameters>,
    pub dashboard_url: StringAttr,
    pub image_url: StringAttr,
    pub cf_guid: StringAttr,
    pub cf_space_guid: StringAttr,
    pub cf_organization_guid: StringAttr,
}

fn parameters_schema() -> AttributeType {
    AttributeType::Object(vec![
        AttributeSchema::new("sgw_acl", AttributeType::String)
            .optional_computed()
            .with_description("Comma separated list of IP networks in CIDR notation which are allowed to access this instance."),
        AttributeSchema::new("enable_monitoring", AttributeType::Bool)
            .optional_computed()
            .with_description("Enable monitoring."),
        AttributeSchema::new("graphite", AttributeType::String)
            .optional_computed()
            .with_description("Graphite server URL (host and port). If set, monitoring with Graphite will be enabled."),
        AttributeSchema::new("max_disk_threshold", AttributeType::Int)
            .optional_computed()
            .with_validator(Validator::IntBetween(0, 100))
            .with_description("The maximum disk threshold in MB."),
        AttributeSchema::new("metrics_frequency", AttributeType::Int)
            .optional_computed()
            .with_description("The frequency of metrics in seconds."),
        AttributeSchema::new("metrics_prefix", AttributeType::String)
            .optional_computed()
            .with_description("The prefix for the metrics."),
        AttributeSchema::new("monitoring_instance_id", AttributeType::String)
            .optional_computed()
            .with_validator(Validator::Uuid)
            .with_description("The ID of the STACKIT monitoring instance."),
        AttributeSchema::new("syslog", AttributeType::list_of(AttributeType::String))
            .optional_computed()
            .with_description("List of syslog servers to send logs to."),
    ])
}

pub fn schema<S: DsaService>() -> ResourceSchema {
    let computed = |name: &str, description: &str| {
        AttributeSchema::new(name, AttributeType::String)
            .computed()
            .with_description(description)
    };
    ResourceSchema::new(S::instance_type_name())
        .with_description(format!("{} instance resource schema.", S::DISPLAY_NAME))
        .attribute(common::id(ID_FIELDS))
        .attribute(common::computed_id("instance_id", "ID of the instance."))
        .attribute(common::project_id())
        .attribute(
            AttributeSchema::new("name", AttributeType::String)
                .required()
                .requires_replace()
                .with_validator(Validator::LengthAtLeast(1))
                .with_description("Instance name."),
        )
        .attribute(
            AttributeSchema::new("version", AttributeType::String)
                .required()
                .with_description("The service version."),
        )
        .attribute(
            AttributeSchema::new("plan_name", AttributeType::String)
                .required()
                .with_validator(Validator::LengthAtLeast(1))
                .with_description("The selected plan name."),
        )
        .attribute(computed("plan_id", "The selected plan ID."))
        .attribute(
            AttributeSchema::new("parameters", parameters_schema())
                .optional_computed()
                .with_description("Instance parameters."),
        )
        .attribute(computed("dashboard_url", "Dashboard URL of the instance."))
        .attribute(computed("image_url", "Image URL of the instance."))
        .attribute(computed("cf_guid", "Cloud Foundry GUID of the instance."))
        .attribute(computed("cf_space_guid", "Cloud Foundry space GUID of the instance."))
        .attribute(computed("cf_organization_guid", "Cloud Foundry organization GUID of the instance."))
}

pub fn map_fields(response: Option<&Instance>, model: Option<&mut Model>) -> CoreResult<()> {
    let response = response.ok_or_else(|| CoreError::mapping("response input is nil"))?;
    let model = model.ok_or_else(|| CoreError::mapping("model input is nil"))?;

    let instance_id = match (&response.instance_id, model.instance_id.as_str()) {
        (Some(id), _) => id.clone(),
        (None, Some(id)) => id.to_string(),
        (None, None) => return Err(CoreError::mapping("instance id not present")),
    };

    model.id = Attr::known(build_id(&[&model.project_id.value_string(), &instance_id]));
    model.instance_id = Attr::known(instance_id);
    model.name = Attr::from_option(response.name.clone());
    model.plan_id = Attr::from_option(response.plan_id.clone());
    model.dashboard_url = Attr::from_option(response.dashboard_url.clone());
    model.image_url = Attr::from_option(response.image_url.clone());
    model.cf_guid = Attr::from_option(response.cf_guid.clone());
    model.cf_space_guid = Attr::from_option(response.cf_space_guid.clone());
    model.cf_organization_guid = Attr::from_option(response.cf_organization_guid.clone());
    model.parameters = match &response.parameters {
        Some(parameters) if !parameters.is_empty() => Attr::Known(Parameters::from_api(parameters)),
        _ => Attr::Null,
    };
    Ok(())
}

pub fn to_create_payload(model: Option<&Model>, plan_id: &str) -> CoreResult<CreateInstancePayload> {
    let model = model.ok_or_else(|| CoreError::mapping("nil model"))?;
    Ok(CreateInstancePayload {
        instance_name: model.name.to_option(),
        plan_id: Some(plan_id.to_string()),
        parameters: model.parameters.value().map(Parameters::to_api),
    })
}

pub fn to_update_payload(model: Option<&Model>, plan_id: &str) -> CoreResult<PartialUpdateInstancePayload> {
    let model = model.ok_or_else(|| CoreError::mapping("nil model"))?;
    Ok(PartialUpdateInstancePayload {
        plan_id: Some(plan_id.to_string()),
        parameters: model.parameters.value().map(Parameters::to_api),
    })
}

pub struct InstanceResource<S> {
    client: Option<DsaClient>,
    provider_data: ProviderData,
    service: PhantomData<S>,
}

impl<S: DsaService> Default for InstanceResource<S> {
    fn default() -> Self {
        Self {
            client: None,
            provider_data: ProviderData::default(),
            service: PhantomData,
        }
    }
}

impl<S: DsaService> InstanceResource<S> {
    async fn plan_id(&self, client: &DsaClient, model: &Model) -> ProviderResult<String> {
        let offerings = client
            .list_offerings(&model.project_id.value_string())
            .await
            .context("Getting offerings")?;
        resolve_plan_id(&offerings, &model.version.value_string(), &model.plan_name.value_string())
    }

    /// Fill `version` and `plan_name` from the plan id reported by the API
    async fn load_plan_name_and_version(&self, client: &DsaClient, model: &mut Model) -> ProviderResult<()> {
        let Some(plan_id) = model.plan_id.to_option() else {
            return Ok(());
        };
        let offerings = client
            .list_offerings(&model.project_id.value_string())
            .await
            .context("Getting offerings")?;
        match plan_name_and_version(&offerings, &plan_id) {
            Some((plan_name, version)) => {
                model.plan_name = Attr::known(plan_name);
                model.version = Attr::known(version);
            }
            None => log::warn!("plan {} not found in {} offerings", plan_id, S::NAME),
        }
        Ok(())
    }

    async fn create_instance(&self, req: CreateRequest, resp: &mut Response) -> ProviderResult<()> {
        let client = require_client(&self.client)?;
        let mut model: Model = req.plan.get()?;
        let project_id = model.project_id.value_string();

        let plan_id = self.plan_id(client, &model).await?;
        let payload = to_create_payload(Some(&model), &plan_id)?;
        let created = client
            .create_instance(&project_id, &payload)
            .await
            .context("Calling API")?;
        let instance_id = created
            .instance_id
            .ok_or_else(|| CoreError::mapping("API response has no instance id"))?;

        let id = build_id(&[&project_id, &instance_id]);
        model.instance_id = Attr::known(instance_id.as_str());
        model.id = Attr::known(id.as_str());

        let wait = dsa::wait::create_or_update_instance_wait_handler(client, &project_id, &instance_id)
            .set_timeout(wait_timeout(&self.provider_data, WAIT_TIMEOUT_MINUTES))
            .wait();
        let instance = record_then_wait(
            &mut resp.state,
            &[("id", id.as_str()), ("project_id", project_id.as_str()), ("instance_id", instance_id.as_str())],
            wait,
            "Waiting for instance creation",
        )
        .await?;

        map_fields(Some(&instance), Some(&mut model))?;
        resp.state.set(&model)?;
        log::info!("{} instance {} created", S::DISPLAY_NAME, instance_id);
        Ok(())
    }

    async fn read_instance(&self, req: ReadRequest, resp: &mut Response) -> ProviderResult<()> {
        let client = require_client(&self.client)?;
        let mut model: Model = req.state.get()?;

        let instance = match client
            .get_instance(&model.project_id.value_string(), &model.instance_id.value_string())
            .await
            .context("Calling API")
        {
            Ok(i) => i,
            Err(e) if is_gone(&e) => {
                resp.state.remove_resource();
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        map_fields(Some(&instance), Some(&mut model))?;
        self.load_plan_name_and_version(client, &mut model).await?;
        resp.state.set(&model)?;
        Ok(())
    }

    async fn update_instance(&self, req: UpdateRequest, resp: &mut Response) -> ProviderResult<()> {
        let client = require_client(&self.client)?;
        let mut model: Model = req.plan.get()?;
        let project_id = model.project_id.value_string();
        let instance_id = model.instance_id.value_string();

        let plan_id = self.plan_id(client, &model).await?;
        let payload = to_update_payload(Some(&model), &plan_id)?;
        client
            .partial_update_instance(&project_id, &instance_id, &payload)
            .await
            .context("Calling API")?;

        let instance = dsa::wait::create_or_update_instance_wait_handler(client, &project_id, &instance_id)
            .set_timeout(wait_timeout(&self.provider_data, WAIT_TIMEOUT_MINUTES))
            .wait()
            .await
            .context("Waiting for instance update")?;

        map_fields(Some(&instance), Some(&mut model))?;
        resp.state.set(&model)?;
        log::info!("{} instance {} updated", S::DISPLAY_NAME, instance_id);
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
        dsa::wait::delete_instance_wait_handler(client, &project_id, &instance_id)
            .set_timeout(wait_timeout(&self.provider_data, WAIT_TIMEOUT_MINUTES))
            .wait()
            .await
            .context("Waiting for instance deletion")?;
        log::info!("{} instance {} deleted", S::DISPLAY_NAME, instance_id);
        Ok(())
    }
}

impl<S: DsaService> Resource for InstanceResource<S> {
    fn metadata(&self, provider_type_name: &str) -> String {
        format!("{}_{}_instance", provider_type_name, S::NAME)
    }

    fn schema(&self) -> ResourceSchema {
        schema::<S>()
    }

    fn configure(&mut self, provider_data: &ProviderData, diags: &mut Diagnostics) {
        self.client = configure_client(provider_data, S::NAME, DsaClient::new, diags);
        self.provider_data = provider_data.clone();
    }

    fn create(&self, req: CreateRequest) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            let mut resp = Response::default();
            let result = self.create_instance(req, &mut resp).await;
            finish(resp, result, &format!("Error creating {} instance", S::DISPLAY_NAME))
        })
    }

    fn read(&self, req: ReadRequest) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            let mut resp = Response::default();
            let result = self.read_instance(req, &mut resp).await;
            finish(resp, result, &format!("Error reading {} instance", S::DISPLAY_NAME))
        })
    }

    fn update(&self, req: UpdateRequest) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            let mut resp = Response::default();
            let result = self.update_instance(req, &mut resp).await;
            finish(resp, result, &format!("Error updating {} instance", S::DISPLAY_NAME))
        })
    }

    fn delete(&self, req: DeleteRequest) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            let result = self.delete_instance(req).await;
            finish(
                Response::default(),
                result,
                &format!("Error deleting {} instance", S::DISPLAY_NAME),
            )
        })
    }

    fn import_state(&self, req: ImportStateRequest) -> Response {
        import_composite_id(
            &req.id,
            ID_FIELDS,
            &format!("Error importing {} instance", S::DISPLAY_NAME),
        )
    }
}

pub struct InstanceDataSource<S> {
    resource: InstanceResource<S>,
}

impl<S: DsaService> Default for InstanceDataSource<S> {
    fn default() -> Self {
        Self {
            resource: InstanceResource::default(),
        }
    }
}

impl<S: DsaService> DataSource for InstanceDataSource<S> {
    fn metadata(&self, provider_type_name: &str) -> String {
        format!("{}_{}_instance", provider_type_name, S::NAME)
    }

    fn schema(&self) -> ResourceSchema {
        schema::<S>().as_data_source(S::instance_type_name(), ID_FIELDS)
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
            finish(resp, result, &format!("Error reading {} instance", S::DISPLAY_NAME))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsa::{LogMe, MariaDb};
    use stackit_sdk::dsa::LastOperation;

    #[test]
    fn map_fields_full_response() {
        let mut model = Model {
            project_id: Attr::known("pid"),
            ..Default::default()
        };
        let response = Instance {
            instance_id: Some("iid".to_string()),
            name: Some("logs".to_string()),
            plan_id: Some("plan".to_string()),
            cf_guid: Some("cf".to_string()),
            parameters: Some(InstanceParameters {
                sgw_acl: Some("192.168.0.0/24".to_string()),
                syslog: Some(vec!["syslog.example.com:514".to_string()]),
                ..Default::default()
            }),
            last_operation: Some(LastOperation::default()),
            ..Default::default()
        };
        map_fields(Some(&response), Some(&mut model)).unwrap();
        assert_eq!(model.id, Attr::known("pid,iid"));
        assert_eq!(model.plan_id, Attr::known("plan"));
        let parameters = model.parameters.value().unwrap();
        assert_eq!(parameters.sgw_acl, Attr::known("192.168.0.0/24"));
        assert!(parameters.graphite.is_null());
        assert!(model.dashboard_url.is_null());
    }

    #[test]
    fn map_fields_without_parameters() {
        let mut model = Model {
            project_id: Attr::known("pid"),
            instance_id: Attr::known("iid"),
            ..Default::default()
        };
        map_fields(Some(&Instance::default()), Some(&mut model)).unwrap();
        assert_eq!(model.id, Attr::known("pid,iid"));
        assert!(model.parameters.is_null());
    }

    #[test]
    fn map_fields_errors() {
        assert!(map_fields(None, Some(&mut Model::default())).is_err());
        assert!(map_fields(Some(&Instance::default()), None).is_err());
        assert!(map_fields(Some(&Instance::default()), Some(&mut Model::default())).is_err());
    }

    #[test]
    fn payloads_carry_plan_and_parameters() {
        let model = Model {
            name: Attr::known("logs"),
            parameters: Attr::Known(Parameters {
                enable_monitoring: Attr::Known(true),
                ..Default::default()
            }),
            ..Default::default()
        };
        let create = to_create_payload(Some(&model), "plan").unwrap();
        assert_eq!(create.instance_name.as_deref(), Some("logs"));
        assert_eq!(create.plan_id.as_deref(), Some("plan"));
        assert_eq!(create.parameters.unwrap().enable_monitoring, Some(true));

        let update = to_update_payload(Some(&Model::default()), "plan").unwrap();
        assert!(update.parameters.is_none());
        assert!(to_update_payload(None, "plan").is_err());
    }

    #[test]
    fn import_two_part_id() {
        let resource = InstanceResource::<LogMe>::default();
        let resp = resource.import_state(ImportStateRequest {
            id: "pid,iid".to_string(),
        });
        assert!(!resp.has_error());
        assert_eq!(resp.state.get_string("project_id"), Some("pid"));
        assert_eq!(resp.state.get_string("instance_id"), Some("iid"));

        for bad in ["pid", "pid,", ",iid", "pid,iid,extra"] {
            let resp = resource.import_state(ImportStateRequest { id: bad.to_string() });
            assert!(resp.has_error(), "{} should be rejected", bad);
        }
    }

    #[test]
    fn metadata_per_service() {
        assert_eq!(InstanceResource::<MariaDb>::default().metadata("stackit"), "stackit_mariadb_instance");
        let ds = InstanceDataSource::<LogMe>::default();
        let schema = ds.schema();
        assert!(schema.get("instance_id").unwrap().is_required());
        assert!(schema.get("name").unwrap().is_computed());
    }
}
