//! STACKIT Provider
//!
//! Resources and data sources for STACKIT services.
//!
//! ## Module Structure
//!
//! - `provider` - StackitProvider: configuration and lookup by type name
//! - `resources` - Registry of every resource and data source
//! - `utils` - Client setup and operation helpers
//! - one module per service: `argus`, `dsa` (LogMe, OpenSearch, MariaDB),
//!   `kms`, `postgresflex`, `resourcemanager`, `scf`, `ske`

pub mod argus;
pub mod dsa;
pub mod error;
pub mod kms;
pub mod postgresflex;
pub mod provider;
pub mod resourcemanager;
pub mod resources;
pub mod scf;
pub mod ske;
pub mod utils;

// Re-export main types
pub use error::{ProviderError, ProviderResult};
pub use provider::StackitProvider;
