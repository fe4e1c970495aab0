//! Resource - The contract between the host and resource implementations
//!
//! The host drives every resource through the same lifecycle: Metadata,
//! Schema, Configure, then Create / Read / Update / Delete / ImportState.
//! Each operation receives plan and state objects and answers with a new
//! state plus diagnostics. Errors never abort the process; they are scoped
//! to the single operation.

use std::future::Future;
use std::pin::Pin;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::ProviderData;
use crate::diagnostics::Diagnostics;
use crate::error::{CoreError, CoreResult};
use crate::ids::parse_import_id;
use crate::schema::ResourceSchema;

/// Return type for async operations
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Attribute values of one resource: a plan, a config or a state
///
/// An empty `State` means "no resource". Read sets it empty to signal that
/// the resource is gone and must be dropped from the state file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct State {
    raw: Option<Value>,
}

impl State {
    pub fn new(raw: Value) -> Self {
        match raw {
            Value::Null => Self { raw: None },
            raw => Self { raw: Some(raw) },
        }
    }

    pub fn empty() -> Self {
        Self { raw: None }
    }

    pub fn from_model<T: Serialize>(model: &T) -> CoreResult<Self> {
        Ok(Self::new(serde_json::to_value(model)?))
    }

    /// Decode into a typed model
    pub fn get<T: DeserializeOwned>(&self) -> CoreResult<T> {
        let raw = self.raw.as_ref().ok_or(CoreError::EmptyState)?;
        Ok(serde_json::from_value(raw.clone())?)
    }

    /// Replace the whole state with a typed model
    pub fn set<T: Serialize>(&mut self, model: &T) -> CoreResult<()> {
        self.raw = Some(serde_json::to_value(model)?);
        Ok(())
    }

    /// Set a single top-level attribute, creating the object if needed
    pub fn set_attribute<V: Serialize>(&mut self, name: &str, value: V) -> CoreResult<()> {
        let value = serde_json::to_value(value)?;
        match self.raw.get_or_insert_with(|| Value::Object(Default::default())) {
            Value::Object(map) => {
                map.insert(name.to_string(), value);
                Ok(())
            }
            _ => Err(CoreError::NotAnObject(name.to_string())),
        }
    }

    pub fn get_attribute(&self, name: &str) -> Option<&Value> {
        self.raw.as_ref().and_then(|v| v.get(name))
    }

    pub fn get_string(&self, name: &str) -> Option<&str> {
        self.get_attribute(name).and_then(Value::as_str)
    }

    /// Mark the resource as gone
    pub fn remove_resource(&mut self) {
        self.raw = None;
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_none()
    }

    pub fn raw(&self) -> Option<&Value> {
        self.raw.as_ref()
    }

    pub fn into_raw(self) -> Option<Value> {
        self.raw
    }
}

#[derive(Debug, Clone, Default)]
pub struct CreateRequest {
    pub plan: State,
    pub config: State,
}

#[derive(Debug, Clone, Default)]
pub struct ReadRequest {
    pub state: State,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateRequest {
    pub plan: State,
    pub state: State,
    pub config: State,
}

#[derive(Debug, Clone, Default)]
pub struct DeleteRequest {
    pub state: State,
}

#[derive(Debug, Clone, Default)]
pub struct ImportStateRequest {
    pub id: String,
}

#[derive(Debug, Clone, Default)]
pub struct ReadDataSourceRequest {
    pub config: State,
}

/// Result of any resource or data source operation
#[derive(Debug, Clone, Default)]
pub struct Response {
    pub state: State,
    pub diagnostics: Diagnostics,
}

impl Response {
    pub fn new(state: State) -> Self {
        Self {
            state,
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn has_error(&self) -> bool {
        self.diagnostics.has_error()
    }
}

/// Import a composite id by setting each part on the named attribute
pub fn import_composite_id(id: &str, fields: &[&str], summary: &str) -> Response {
    let mut resp = Response::default();
    let Some(parts) = resp.diagnostics.capture(parse_import_id(id, fields), summary) else {
        return resp;
    };
    for (field, part) in fields.iter().zip(parts) {
        if let Err(e) = resp.state.set_attribute(field, part) {
            resp.diagnostics.log_and_add_error(summary, e.to_string());
            return resp;
        }
    }
    resp
}

/// A managed resource with a full CRUD lifecycle
pub trait Resource: Send + Sync {
    /// Full type name, e.g. `stackit_kms_key` for provider type `stackit`
    fn metadata(&self, provider_type_name: &str) -> String;

    fn schema(&self) -> ResourceSchema;

    /// Build the API client from provider-wide configuration
    fn configure(&mut self, provider_data: &ProviderData, diags: &mut Diagnostics);

    fn create(&self, req: CreateRequest) -> BoxFuture<'_, Response>;

    /// An empty response state means the resource no longer exists
    fn read(&self, req: ReadRequest) -> BoxFuture<'_, Response>;

    fn update(&self, req: UpdateRequest) -> BoxFuture<'_, Response>;

    fn delete(&self, req: DeleteRequest) -> BoxFuture<'_, Response>;

    /// Populate the key attributes from an import identifier
    fn import_state(&self, req: ImportStateRequest) -> Response;
}

/// A read-only data source
pub trait DataSource: Send + Sync {
    fn metadata(&self, provider_type_name: &str) -> String;

    fn schema(&self) -> ResourceSchema;

    fn configure(&mut self, provider_data: &ProviderData, diags: &mut Diagnostics);

    fn read(&self, req: ReadDataSourceRequest) -> BoxFuture<'_, Response>;
}

/// Resource implementation for Box<dyn Resource>
/// This enables dynamic dispatch for resources
impl Resource for Box<dyn Resource> {
    fn metadata(&self, provider_type_name: &str) -> String {
        (**self).metadata(provider_type_name)
    }

    fn schema(&self) -> ResourceSchema {
        (**self).schema()
    }

    fn configure(&mut self, provider_data: &ProviderData, diags: &mut Diagnostics) {
        (**self).configure(provider_data, diags)
    }

    fn create(&self, req: CreateRequest) -> BoxFuture<'_, Response> {
        (**self).create(req)
    }

    fn read(&self, req: ReadRequest) -> BoxFuture<'_, Response> {
        (**self).read(req)
    }

    fn update(&self, req: UpdateRequest) -> BoxFuture<'_, Response> {
        (**self).update(req)
    }

    fn delete(&self, req: DeleteRequest) -> BoxFuture<'_, Response> {
        (**self).delete(req)
    }

    fn import_state(&self, req: ImportStateRequest) -> Response {
        (**self).import_state(req)
    }
}
