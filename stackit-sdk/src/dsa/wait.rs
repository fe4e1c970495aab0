//! Wait handlers for Data Service Access instances and credentials

use super::{
    CredentialsResponse, DsaClient, Instance, OPERATION_STATE_FAILED, OPERATION_STATE_SUCCEEDED,
    OPERATION_TYPE_DELETE,
};
use crate::error::SdkError;
use crate::wait::{AsyncActionHandler, found};

fn operation_state(instance: &Instance) -> (Option<&str>, Option<&str>) {
    instance
        .last_operation
        .as_ref()
        .map(|op| (op.operation_type.as_deref(), op.state.as_deref()))
        .unwrap_or((None, None))
}

fn failure_message(instance: &Instance) -> String {
    instance
        .last_operation
        .as_ref()
        .and_then(|op| op.description.clone())
        .unwrap_or_else(|| "unknown error".to_string())
}

/// Wait until the last create or update operation succeeded
pub fn create_or_update_instance_wait_handler<'a>(
    client: &'a DsaClient,
    project_id: &'a str,
    instance_id: &'a str,
) -> AsyncActionHandler<'a, Instance> {
    AsyncActionHandler::new(move || {
        Box::pin(async move {
            let instance = client.get_instance(project_id, instance_id).await?;
            match operation_state(&instance).1 {
                Some(OPERATION_STATE_SUCCEEDED) => Ok(Some(instance)),
                Some(OPERATION_STATE_FAILED) => Err(SdkError::WaitFailed(format!(
                    "instance {}: {}",
                    instance_id,
                    failure_message(&instance)
                ))),
                _ => Ok(None),
            }
        })
    })
}

/// Wait until the instance is gone
pub fn delete_instance_wait_handler<'a>(
    client: &'a DsaClient,
    project_id: &'a str,
    instance_id: &'a str,
) -> AsyncActionHandler<'a, ()> {
    AsyncActionHandler::new(move || {
        Box::pin(async move {
            let Some(instance) = found(client.get_instance(project_id, instance_id).await)? else {
                return Ok(Some(()));
            };
            match operation_state(&instance) {
                (Some(OPERATION_TYPE_DELETE), Some(OPERATION_STATE_SUCCEEDED)) => Ok(Some(())),
                (Some(OPERATION_TYPE_DELETE), Some(OPERATION_STATE_FAILED)) => Err(SdkError::WaitFailed(
                    format!("deleting instance {}: {}", instance_id, failure_message(&instance)),
                )),
                _ => Ok(None),
            }
        })
    })
}

/// Wait until new credentials can be read
pub fn create_credentials_wait_handler<'a>(
    client: &'a DsaClient,
    project_id: &'a str,
    instance_id: &'a str,
    credentials_id: &'a str,
) -> AsyncActionHandler<'a, CredentialsResponse> {
    AsyncActionHandler::new(move || {
        Box::pin(async move { found(client.get_credentials(project_id, instance_id, credentials_id).await) })
    })
}

/// Wait until credentials are gone
pub fn delete_credentials_wait_handler<'a>(
    client: &'a DsaClient,
    project_id: &'a str,
    instance_id: &'a str,
    credentials_id: &'a str,
) -> AsyncActionHandler<'a, ()> {
    AsyncActionHandler::new(move || {
        Box::pin(async move {
            match found(client.get_credentials(project_id, instance_id, credentials_id).await)? {
                Some(_) => Ok(None),
                None => Ok(Some(())),
            }
        })
    })
}
