//! Helpers shared by every resource module

use std::future::Future;
use std::time::Duration;

use stackit_core::{Diagnostics, ProviderData, Response, State};
use stackit_sdk::{Configuration, SdkResult};

use crate::error::{ApiContext, ProviderError, ProviderResult};

/// SDK configuration for `service` built from provider-wide settings
pub fn sdk_configuration(provider_data: &ProviderData, service: &str) -> Configuration {
    Configuration::new(service)
        .with_endpoint(provider_data.custom_endpoint(service))
        .with_region(provider_data.region.clone())
        .with_token(provider_data.service_account_token.clone())
        .with_user_agent(provider_data.user_agent.clone())
}

/// Build a service client, recording a diagnostic when that fails
pub fn configure_client<C>(
    provider_data: &ProviderData,
    service: &str,
    new: impl FnOnce(Configuration) -> SdkResult<C>,
    diags: &mut Diagnostics,
) -> Option<C> {
    let client = diags.capture(
        new(sdk_configuration(provider_data, service)),
        &format!("Error configuring {} API client", service),
    )?;
    log::info!("{} client configured", service);
    Some(client)
}

pub fn require_client<C>(client: &Option<C>) -> ProviderResult<&C> {
    client.as_ref().ok_or(ProviderError::NotConfigured)
}

/// Turn the outcome of an operation into its response
pub fn finish(mut resp: Response, result: ProviderResult<()>, summary: &str) -> Response {
    if let Err(e) = result {
        resp.diagnostics.log_and_add_error(summary, e.to_string());
    }
    resp
}

/// Record identifying attributes in `state`, then wait for provisioning
///
/// The attributes stay recorded when the wait fails, so the next refresh
/// finds the resource instead of orphaning it.
pub async fn record_then_wait<T>(
    state: &mut State,
    ids: &[(&str, &str)],
    wait: impl Future<Output = SdkResult<T>>,
    context: &str,
) -> ProviderResult<T> {
    for (name, value) in ids {
        state.set_attribute(name, value)?;
    }
    wait.await.context(context)
}

/// Wait timeout of a resource, unless the provider overrides it
pub fn wait_timeout(provider_data: &ProviderData, default_minutes: u64) -> Duration {
    provider_data.wait_timeout_or(Duration::from_secs(default_minutes * 60))
}

/// The error means the resource does not exist (anymore)
pub fn is_gone(err: &ProviderError) -> bool {
    matches!(err.status_code(), Some(404 | 410))
}

/// Data sources fail when the lookup found nothing
pub fn ensure_found(state: &State, what: &str) -> ProviderResult<()> {
    if state.is_empty() {
        Err(ProviderError::invalid(format!("{} not found", what)))
    } else {
        Ok(())
    }
}

/// Error for updates of resources whose attributes all force replacement
pub fn update_not_supported(kind: &str) -> ProviderError {
    ProviderError::invalid(format!("Updating the {} is not supported", kind))
}
