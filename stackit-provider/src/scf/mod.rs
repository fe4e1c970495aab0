//! STACKIT Cloud Foundry organizations and platforms

pub mod organization;
pub mod platform;

pub(crate) const WAIT_TIMEOUT_MINUTES: u64 = 20;
