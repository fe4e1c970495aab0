//! STACKIT Core
//!
//! Framework contract shared by the provider and its host: typed attribute
//! values, schemas with validators, diagnostics, composite identifiers, and
//! the traits every resource and data source implements.

pub mod config;
pub mod diagnostics;
pub mod differ;
pub mod error;
pub mod ids;
pub mod plan;
pub mod resource;
pub mod schema;
pub mod types;

pub use config::{ProviderConfig, ProviderData};
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use error::{CoreError, CoreResult};
pub use resource::{BoxFuture, DataSource, Resource, Response, State};
pub use types::Attr;
