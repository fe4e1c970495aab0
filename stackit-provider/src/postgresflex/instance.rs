//! `stackit_postgresflex_instance`

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
use stackit_core::types::{Attr, IntAttr, ListAttr, StringAttr, string_list};
use stackit_sdk::postgresflex::{
    self, Acl, CreateInstancePayload, Flavor, Instance, PartialUpdateInstancePayload, PostgresFlexClient,
    Storage,
};

use super::{WAIT_TIMEOUT_MINUTES, resolve_flavor};
use crate::error::{ApiContext, ProviderError, ProviderResult};
use crate::utils::{
    configure_client, ensure_found, finish, is_gone, record_then_wait, require_client, wait_timeout,
};

pub const TYPE_NAME: &str = "stackit_postgresflex_instance";
const ID_FIELDS: &[&str] = &["project_id", "region", "instance_id"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlavorModel {
    pub id: StringAttr,
    pub description: StringAttr,
    pub cpu: IntAttr,
    pub ram: IntAttr,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageModel {
    pub class: StringAttr,
    pub size: IntAttr,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Model {
    pub id: StringAttr,
    pub instance_id: StringAttr,
    pub project_id: StringAttr,
    pub region: StringAttr,
    pub name: StringAttr,
    pub acl: ListAttr<String>,
    pub backup_schedule: StringAttr,
    pub flavor: Attr<FlavorModel>,
    pub replicas: IntAttr,
    pub storage: Attr<StorageModel>,
    pub version: StringAttr,
}

impl Model {
    /// Requested `(cpu, ram)` of the flavor block
    fn flavor_spec(&self) -> ProviderResult<(i64, i64)> {
        let flavor = self
            .flavor
            .value()
            .ok_or_else(|| ProviderError::invalid("flavor is not set"))?;
        match (flavor.cpu.value(), flavor.ram.value()) {
            (Some(cpu), Some(ram)) => Ok((*cpu, *ram)),
            _ => Err(ProviderError::invalid("flavor.cpu and flavor.ram must be set")),
        }
    }
}

pub fn schema() -> ResourceSchema {
    let flavor = AttributeType::Object(vec![
        AttributeSchema::new("id", AttributeType::String).computed(),
        AttributeSchema::new("description", AttributeType::String).computed(),
        AttributeSchema::new("cpu", AttributeType::Int).required(),
        AttributeSchema::new("ram", AttributeType::Int).required(),
    ]);
    let storage = AttributeType::Object(vec![
        AttributeSchema::new("class", AttributeType::String).required(),
        AttributeSchema::new("size", AttributeType::Int).required(),
    ]);

    ResourceSchema::new(TYPE_NAME)
        .with_description("Postgres Flex instance resource schema.")
        .attribute(common::id(ID_FIELDS))
        .attribute(common::computed_id("instance_id", "ID of the PostgresFlex instance."))
        .attribute(common::project_id())
        .attribute(common::region())
        .attribute(
            AttributeSchema::new("name", AttributeType::String)
                .required()
                .with_validator(Validator::pattern(
                    r"^[a-z]([-a-z0-9]*[a-z0-9])?$",
                    "must start with a letter, must have lower case letters, numbers or hyphens, and no hyphen at the end",
                ))
                .with_description("Instance name."),
        )
        .attribute(
            AttributeSchema::new("acl", AttributeType::list_of(AttributeType::String))
                .required()
                .with_description("The Access Control List (ACL) for the PostgresFlex instance."),
        )
        .attribute(
            AttributeSchema::new("backup_schedule", AttributeType::String)
                .required()
                .with_description("Backup schedule in cron syntax."),
        )
        .attribute(
            AttributeSchema::new("flavor", flavor)
                .required()
                .with_description("Compute resources of the instance, resolved to a flavor by `cpu` and `ram`."),
        )
        .attribute(
            AttributeSchema::new("replicas", AttributeType::Int)
                .required()
                .with_validator(Validator::IntAtLeast(1)),
        )
        .attribute(
            AttributeSchema::new("storage", storage)
                .required()
                .requires_replace(),
        )
        .attribute(AttributeSchema::new("version", AttributeType::String).required())
}

pub fn map_fields(response: Option<&Instance>, model: Option<&mut Model>, region: &str) -> CoreResult<()> {
    let response = response.ok_or_else(|| CoreError::mapping("response input is nil"))?;
    let model = model.ok_or_else(|| CoreError::mapping("model input is nil"))?;

    let instance_id = match (&response.id, model.instance_id.as_str()) {
        (Some(id), _) => id.clone(),
        (None, Some(id)) => id.to_string(),
        (None, None) => return Err(CoreError::mapping("instance id not present")),
    };

    let prior_flavor = model.flavor.to_option().unwrap_or_default();
    let flavor = match &response.flavor {
        Some(f) => FlavorModel {
            id: Attr::from_option(f.id.clone()),
            description: Attr::from_option(f.description.clone()),
            cpu: f.cpu.map(Attr::Known).unwrap_or(prior_flavor.cpu),
            ram: f.memory.map(Attr::Known).unwrap_or(prior_flavor.ram),
        },
        None => prior_flavor,
    };

    model.id = Attr::known(build_id(&[&model.project_id.value_string(), region, &instance_id]));
    model.instance_id = Attr::known(instance_id);
    model.region = Attr::known(region);
    model.name = Attr::from_option(response.name.clone());
    model.acl = Attr::Known(response.acl.as_ref().map(|a| a.items.clone()).unwrap_or_default());
    model.backup_schedule = Attr::from_option(response.backup_schedule.clone());
    model.flavor = Attr::Known(flavor);
    model.replicas = Attr::from_option(response.replicas);
    model.storage = Attr::from_option(response.storage.as_ref().map(|s| StorageModel {
        class: Attr::from_option(s.class.clone()),
        size: Attr::from_option(s.size),
    }));
    model.version = Attr::from_option(response.version.clone());
    Ok(())
}

fn storage_to_api(model: &Model) -> Option<Storage> {
    model.storage.value().map(|s| Storage {
        class: s.class.to_option(),
        size: s.size.to_option(),
    })
}

pub fn to_create_payload(model: Option<&Model>, flavor: &Flavor) -> CoreResult<CreateInstancePayload> {
    let model = model.ok_or_else(|| CoreError::mapping("nil model"))?;
    Ok(CreateInstancePayload {
        name: model.name.to_option(),
        acl: Some(Acl {
            items: string_list(&model.acl),
        }),
        backup_schedule: model.backup_schedule.to_option(),
        flavor_id: flavor.id.clone(),
        replicas: model.replicas.to_option(),
        storage: storage_to_api(model),
        version: model.version.to_option(),
    })
}

pub fn to_update_payload(model: Option<&Model>, flavor: &Flavor) -> CoreResult<PartialUpdateInstancePayload> {
    let model = model.ok_or_else(|| CoreError::mapping("nil model"))?;
    Ok(PartialUpdateInstancePayload {
        name: model.name.to_option(),
        acl: model.acl.value().map(|items| Acl { items: items.clone() }),
        backup_schedule: model.backup_schedule.to_option(),
        flavor_id: flavor.id.clone(),
        replicas: model.replicas.to_option(),
        storage: storage_to_api(model),
        version: model.version.to_option(),
    })
}

#[derive(Default)]
pub struct InstanceResource {
    client: Option<PostgresFlexClient>,
    provider_data: ProviderData,
}

impl InstanceResource {
    async fn load_flavor(&self, client: &PostgresFlexClient, model: &Model, region: &str) -> ProviderResult<Flavor> {
        let (cpu, ram) = model.flavor_spec()?;
        let flavors = client
            .list_flavors(&model.project_id.value_string(), region)
            .await
            .context("Loading flavors")?;
        resolve_flavor(&flavors.flavors, cpu, ram)
    }

    async fn create_instance(&self, req: CreateRequest, resp: &mut Response) -> ProviderResult<()> {
        let client = require_client(&self.client)?;
        let mut model: Model = req.plan.get()?;
        let project_id = model.project_id.value_string();
        let region = self.provider_data.region_for(&model.region);

        let flavor = self.load_flavor(client, &model, &region).await?;
        let payload = to_create_payload(Some(&model), &flavor)?;
        let created = client
            .create_instance(&project_id, &region, &payload)
            .await
            .context("Calling API")?;
        let instance_id = created
            .id
            .ok_or_else(|| CoreError::mapping("API response has no instance id"))?;

        let wait = postgresflex::wait::create_or_update_instance_wait_handler(client, &project_id, &region, &instance_id)
            .set_timeout(wait_timeout(&self.provider_data, WAIT_TIMEOUT_MINUTES))
            .wait();
        let instance = record_then_wait(
            &mut resp.state,
            &[("project_id", project_id.as_str()), ("region", region.as_str()), ("instance_id", instance_id.as_str())],
            wait,
            "Waiting for instance creation",
        )
        .await?;

        map_fields(Some(&instance), Some(&mut model), &region)?;
        resp.state.set(&model)?;
        log::info!("Postgres Flex instance {} created", instance_id);
        Ok(())
    }

    async fn read_instance(&self, req: ReadRequest, resp: &mut Response) -> ProviderResult<()> {
        let client = require_client(&self.client)?;
        let mut model: Model = req.state.get()?;
        let project_id = model.project_id.value_string();
        let region = self.provider_data.region_for(&model.region);
        let instance_id = model.instance_id.value_string();

        let response = match client
            .get_instance(&project_id, &region, &instance_id)
            .await
            .context("Calling API")
        {
            Ok(r) => r,
            Err(e) if is_gone(&e) => {
                resp.state.remove_resource();
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        // Soft-deleted instances still answer, but are gone for us
        let Some(instance) = response
            .item
            .filter(|i| i.status.as_deref() != Some(postgresflex::INSTANCE_STATE_DELETED))
        else {
            resp.state.remove_resource();
            return Ok(());
        };

        map_fields(Some(&instance), Some(&mut model), &region)?;
        resp.state.set(&model)?;
        Ok(())
    }

    async fn update_instance(&self, req: UpdateRequest, resp: &mut Response) -> ProviderResult<()> {
        let client = require_client(&self.client)?;
        let mut model: Model = req.plan.get()?;
        let project_id = model.project_id.value_string();
        let region = self.provider_data.region_for(&model.region);
        let instance_id = model.instance_id.value_string();

        let flavor = self.load_flavor(client, &model, &region).await?;
        let payload = to_update_payload(Some(&model), &flavor)?;
        client
            .partial_update_instance(&project_id, &region, &instance_id, &payload)
            .await
            .context("Calling API")?;

        let instance = postgresflex::wait::create_or_update_instance_wait_handler(client, &project_id, &region, &instance_id)
            .set_timeout(wait_timeout(&self.provider_data, WAIT_TIMEOUT_MINUTES))
            .wait()
            .await
            .context("Waiting for instance update")?;

        map_fields(Some(&instance), Some(&mut model), &region)?;
        resp.state.set(&model)?;
        log::info!("Postgres Flex instance {} updated", instance_id);
        Ok(())
    }

    async fn delete_instance(&self, req: DeleteRequest) -> ProviderResult<()> {
        let client = require_client(&self.client)?;
        let model: Model = req.state.get()?;
        let project_id = model.project_id.value_string();
        let region = self.provider_data.region_for(&model.region);
        let instance_id = model.instance_id.value_string();
        let timeout = wait_timeout(&self.provider_data, WAIT_TIMEOUT_MINUTES);

        match client
            .delete_instance(&project_id, &region, &instance_id)
            .await
            .context("Calling API")
        {
            Err(e) if is_gone(&e) => return Ok(()),
            Err(e) => return Err(e),
            Ok(()) => {}
        }
        postgresflex::wait::delete_instance_wait_handler(client, &project_id, &region, &instance_id)
            .set_timeout(timeout)
            .wait()
            .await
            .context("Waiting for instance deletion")?;

        if let Err(e) = client
            .force_delete_instance(&project_id, &region, &instance_id)
            .await
            .context("Force deleting instance")
            && !is_gone(&e)
        {
            return Err(e);
        }
        postgresflex::wait::force_delete_instance_wait_handler(client, &project_id, &region, &instance_id)
            .set_timeout(timeout)
            .wait()
            .await
            .context("Waiting for instance force deletion")?;
        log::info!("Postgres Flex instance {} deleted", instance_id);
        Ok(())
    }
}

impl Resource for InstanceResource {
    fn metadata(&self, provider_type_name: &str) -> String {
        format!("{}_postgresflex_instance", provider_type_name)
    }

    fn schema(&self) -> ResourceSchema {
        schema()
    }

    fn configure(&mut self, provider_data: &ProviderData, diags: &mut Diagnostics) {
        self.client = configure_client(provider_data, postgresflex::SERVICE, PostgresFlexClient::new, diags);
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
        format!("{}_postgresflex_instance", provider_type_name)
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
    use serde_json::json;

    fn flavor() -> Flavor {
        Flavor {
            id: Some("2.4".to_string()),
            cpu: Some(2),
            memory: Some(4),
            description: Some("small".to_string()),
        }
    }

    fn model() -> Model {
        serde_json::from_value(json!({
            "project_id": "pid",
            "name": "db",
            "acl": ["10.0.0.0/8"],
            "backup_schedule": "0 0 * * *",
            "flavor": {"cpu": 2, "ram": 4},
            "replicas": 1,
            "storage": {"class": "premium-perf2-stackit", "size": 10},
            "version": "16"
        }))
        .unwrap()
    }

    #[test]
    fn create_payload_uses_resolved_flavor() {
        let payload = to_create_payload(Some(&model()), &flavor()).unwrap();
        assert_eq!(payload.flavor_id.as_deref(), Some("2.4"));
        assert_eq!(payload.acl.unwrap().items, vec!["10.0.0.0/8"]);
        assert_eq!(payload.storage.unwrap().size, Some(10));
        assert!(to_create_payload(None, &flavor()).is_err());
    }

    #[test]
    fn update_payload_skips_null_acl() {
        let mut model = model();
        model.acl = Attr::Null;
        let payload = to_update_payload(Some(&model), &flavor()).unwrap();
        assert!(payload.acl.is_none());
        assert_eq!(payload.replicas, Some(1));
    }

    #[test]
    fn flavor_spec_requires_cpu_and_ram() {
        assert_eq!(model().flavor_spec().unwrap(), (2, 4));
        let mut model = model();
        model.flavor = Attr::Known(FlavorModel {
            cpu: Attr::Known(2),
            ..Default::default()
        });
        assert!(model.flavor_spec().is_err());
    }

    #[test]
    fn map_fields_sets_flavor_details() {
        let mut model = model();
        let response = Instance {
            id: Some("iid".to_string()),
            name: Some("db".to_string()),
            flavor: Some(flavor()),
            replicas: Some(1),
            status: Some(postgresflex::INSTANCE_STATE_READY.to_string()),
            ..Default::default()
        };
        map_fields(Some(&response), Some(&mut model), "eu01").unwrap();
        assert_eq!(model.id, Attr::known("pid,eu01,iid"));
        let flavor = model.flavor.value().unwrap();
        assert_eq!(flavor.id, Attr::known("2.4"));
        assert_eq!(flavor.ram, Attr::Known(4));
        assert_eq!(model.acl, Attr::Known(vec![]));
        assert!(model.storage.is_null());
    }

    #[test]
    fn map_fields_rejects_missing_id() {
        let mut model = Model::default();
        assert!(map_fields(Some(&Instance::default()), Some(&mut model), "eu01").is_err());
        assert!(map_fields(None, Some(&mut model), "eu01").is_err());
    }
}
