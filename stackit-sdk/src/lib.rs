//! STACKIT SDK
//!
//! Thin REST clients for the STACKIT services used by the provider, plus
//! wait handlers that poll asynchronous operations until they settle.

pub mod client;
pub mod config;
pub mod error;
pub mod wait;

pub mod argus;
pub mod dsa;
pub mod kms;
pub mod postgresflex;
pub mod resourcemanager;
pub mod scf;
pub mod ske;

pub use client::ApiClient;
pub use config::Configuration;
pub use error::{SdkError, SdkResult};
pub use wait::AsyncActionHandler;
