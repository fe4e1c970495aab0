//! `stackit_postgresflex_database`
//!
//! The API has no single-database lookup, reads list the instance's
//! databases and match by id.

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
use stackit_core::types::{Attr, StringAttr};
use stackit_sdk::postgresflex::{self, CreateDatabasePayload, Database, DatabaseOptions, PostgresFlexClient};

use crate::error::{ApiContext, ProviderError, ProviderResult};
use crate::utils::{configure_client, ensure_found, finish, is_gone, require_client, update_not_supported};

pub const TYPE_NAME: &str = "stackit_postgresflex_database";
const ID_FIELDS: &[&str] = &["project_id", "region", "instance_id", "database_id"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Model {
    pub id: StringAttr,
    pub database_id: StringAttr,
    pub instance_id: StringAttr,
    pub project_id: StringAttr,
    pub region: StringAttr,
    pub name: StringAttr,
    pub owner: StringAttr,
}

pub fn schema() -> ResourceSchema {
    ResourceSchema::new(TYPE_NAME)
        .with_description("Postgres Flex database resource schema.")
        .attribute(common::id(ID_FIELDS))
        .attribute(common::computed_id("database_id", "Database ID."))
        .attribute(common::uuid_key("instance_id", "ID of the Postgres Flex instance."))
        .attribute(common::project_id())
        .attribute(common::region())
        .attribute(
            AttributeSchema::new("name", AttributeType::String)
                .required()
                .requires_replace()
                .with_validator(Validator::LengthAtLeast(1))
                .with_description("Database name."),
        )
        .attribute(
            AttributeSchema::new("owner", AttributeType::String)
                .required()
                .requires_replace()
                .with_validator(Validator::LengthAtLeast(1))
                .with_description("Username of the database owner."),
        )
}

pub fn map_fields(response: Option<&Database>, model: Option<&mut Model>, region: &str) -> CoreResult<()> {
    let response = response.ok_or_else(|| CoreError::mapping("response input is nil"))?;
    let model = model.ok_or_else(|| CoreError::mapping("model input is nil"))?;

    let database_id = match (&response.id, model.database_id.as_str()) {
        (Some(id), _) => id.clone(),
        (None, Some(id)) => id.to_string(),
        (None, None) => return Err(CoreError::mapping("database id not present")),
    };

    model.id = Attr::known(build_id(&[
        &model.project_id.value_string(),
        region,
        &model.instance_id.value_string(),
        &database_id,
    ]));
    model.database_id = Attr::known(database_id);
    model.region = Attr::known(region);
    model.name = Attr::from_option(response.name.clone());
    // Owners are reported with surrounding quotes
    model.owner = Attr::from_option(
        response
            .options
            .as_ref()
            .and_then(|o| o.owner.as_deref())
            .map(|owner| owner.trim_matches('"').to_string()),
    );
    Ok(())
}

pub fn to_create_payload(model: Option<&Model>) -> CoreResult<CreateDatabasePayload> {
    let model = model.ok_or_else(|| CoreError::mapping("nil model"))?;
    Ok(CreateDatabasePayload {
        name: model.name.to_option(),
        options: Some(DatabaseOptions {
            owner: model.owner.to_option(),
        }),
    })
}

#[derive(Default)]
pub struct DatabaseResource {
    client: Option<PostgresFlexClient>,
    provider_data: ProviderData,
}

impl DatabaseResource {
    /// `None` when the instance has no database with this id
    async fn find_database(&self, model: &Model, region: &str, database_id: &str) -> ProviderResult<Option<Database>> {
        let client = require_client(&self.client)?;
        let response = client
            .list_databases(&model.project_id.value_string(), region, &model.instance_id.value_string())
            .await
            .context("Listing databases")?;
        Ok(response
            .databases
            .into_iter()
            .find(|d| d.id.as_deref() == Some(database_id)))
    }

    async fn create_database(&self, req: CreateRequest, resp: &mut Response) -> ProviderResult<()> {
        let client = require_client(&self.client)?;
        let mut model: Model = req.plan.get()?;
        let region = self.provider_data.region_for(&model.region);

        let payload = to_create_payload(Some(&model))?;
        let created = client
            .create_database(
                &model.project_id.value_string(),
                &region,
                &model.instance_id.value_string(),
                &payload,
            )
            .await
            .context("Calling API")?;
        let database_id = created
            .id
            .ok_or_else(|| CoreError::mapping("API response has no database id"))?;

        let database = self
            .find_database(&model, &region, &database_id)
            .await?
            .ok_or_else(|| ProviderError::invalid(format!("database {} not found after creation", database_id)))?;

        map_fields(Some(&database), Some(&mut model), &region)?;
        resp.state.set(&model)?;
        log::info!("Postgres Flex database {} created", database_id);
        Ok(())
    }

    async fn read_database(&self, req: ReadRequest, resp: &mut Response) -> ProviderResult<()> {
        let mut model: Model = req.state.get()?;
        let region = self.provider_data.region_for(&model.region);
        let database_id = model.database_id.value_string();

        let database = match self.find_database(&model, &region, &database_id).await {
            Ok(Some(d)) => d,
            Ok(None) => {
                resp.state.remove_resource();
                return Ok(());
            }
            Err(e) if is_gone(&e) => {
                resp.state.remove_resource();
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        map_fields(Some(&database), Some(&mut model), &region)?;
        resp.state.set(&model)?;
        Ok(())
    }

    async fn delete_database(&self, req: DeleteRequest) -> ProviderResult<()> {
        let client = require_client(&self.client)?;
        let model: Model = req.state.get()?;
        let region = self.provider_data.region_for(&model.region);
        let database_id = model.database_id.value_string();

        if let Err(e) = client
            .delete_database(
                &model.project_id.value_string(),
                &region,
                &model.instance_id.value_string(),
                &database_id,
            )
            .await
            .context("Calling API")
            && !is_gone(&e)
        {
            return Err(e);
        }
        log::info!("Postgres Flex database {} deleted", database_id);
        Ok(())
    }
}

impl Resource for DatabaseResource {
    fn metadata(&self, provider_type_name: &str) -> String {
        format!("{}_postgresflex_database", provider_type_name)
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
            let result = self.create_database(req, &mut resp).await;
            finish(resp, result, "Error creating database")
        })
    }

    fn read(&self, req: ReadRequest) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            let mut resp = Response::default();
            let result = self.read_database(req, &mut resp).await;
            finish(resp, result, "Error reading database")
        })
    }

    fn update(&self, _req: UpdateRequest) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            finish(Response::default(), Err(update_not_supported("database")), "Error updating database")
        })
    }

    fn delete(&self, req: DeleteRequest) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            let result = self.delete_database(req).await;
            finish(Response::default(), result, "Error deleting database")
        })
    }

    fn import_state(&self, req: ImportStateRequest) -> Response {
        import_composite_id(&req.id, ID_FIELDS, "Error importing database")
    }
}

#[derive(Default)]
pub struct DatabaseDataSource {
    resource: DatabaseResource,
}

impl DataSource for DatabaseDataSource {
    fn metadata(&self, provider_type_name: &str) -> String {
        format!("{}_postgresflex_database", provider_type_name)
    }

    fn schema(&self) -> ResourceSchema {
        schema().as_data_source(TYPE_NAME, &["project_id", "region", "instance_id", "database_id"])
    }

    fn configure(&mut self, provider_data: &ProviderData, diags: &mut Diagnostics) {
        self.resource.configure(provider_data, diags);
    }

    fn read(&self, req: ReadDataSourceRequest) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            let mut resp = Response::default();
            let result = self
                .resource
                .read_database(ReadRequest { state: req.config }, &mut resp)
                .await
                .and_then(|_| ensure_found(&resp.state, "Database"));
            finish(resp, result, "Error reading database")
        })
    }
}
