//! Wait handlers for PostgreSQL Flex instances

use super::{
    INSTANCE_STATE_DELETED, INSTANCE_STATE_FAILURE, INSTANCE_STATE_READY, Instance, PostgresFlexClient,
};
use crate::error::{SdkError, SdkResult};
use crate::wait::{AsyncActionHandler, found};

async fn instance_status(
    client: &PostgresFlexClient,
    project_id: &str,
    region: &str,
    instance_id: &str,
) -> SdkResult<Instance> {
    let response = client.get_instance(project_id, region, instance_id).await?;
    response
        .item
        .ok_or_else(|| SdkError::InvalidResponse(format!("instance {} has no item", instance_id)))
}

fn instance_ready(instance: Instance, instance_id: &str) -> SdkResult<Option<Instance>> {
    match instance.status.as_deref() {
        Some(INSTANCE_STATE_READY) => Ok(Some(instance)),
        Some(INSTANCE_STATE_FAILURE) => Err(SdkError::WaitFailed(format!(
            "instance {} reached status {}",
            instance_id, INSTANCE_STATE_FAILURE
        ))),
        _ => Ok(None),
    }
}

/// `None` means the instance no longer exists
fn instance_deleted(instance: Option<Instance>, instance_id: &str) -> SdkResult<Option<()>> {
    let Some(instance) = instance else {
        return Ok(Some(()));
    };
    match instance.status.as_deref() {
        Some(INSTANCE_STATE_DELETED) => Ok(Some(())),
        Some(INSTANCE_STATE_FAILURE) => Err(SdkError::WaitFailed(format!(
            "deleting instance {} failed",
            instance_id
        ))),
        _ => Ok(None),
    }
}

/// Wait until the instance is ready
pub fn create_or_update_instance_wait_handler<'a>(
    client: &'a PostgresFlexClient,
    project_id: &'a str,
    region: &'a str,
    instance_id: &'a str,
) -> AsyncActionHandler<'a, Instance> {
    AsyncActionHandler::new(move || {
        Box::pin(async move {
            let instance = instance_status(client, project_id, region, instance_id).await?;
            instance_ready(instance, instance_id)
        })
    })
}

/// Wait until a soft delete landed in `Deleted`
pub fn delete_instance_wait_handler<'a>(
    client: &'a PostgresFlexClient,
    project_id: &'a str,
    region: &'a str,
    instance_id: &'a str,
) -> AsyncActionHandler<'a, ()> {
    AsyncActionHandler::new(move || {
        Box::pin(async move {
            let instance = found(instance_status(client, project_id, region, instance_id).await)?;
            instance_deleted(instance, instance_id)
        })
    })
}

/// Wait until a force-deleted instance is gone
pub fn force_delete_instance_wait_handler<'a>(
    client: &'a PostgresFlexClient,
    project_id: &'a str,
    region: &'a str,
    instance_id: &'a str,
) -> AsyncActionHandler<'a, ()> {
    AsyncActionHandler::new(move || {
        Box::pin(async move {
            match found(client.get_instance(project_id, region, instance_id).await)? {
                Some(_) => Ok(None),
                None => Ok(Some(())),
            }
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::postgresflex::INSTANCE_STATE_PROGRESSING;

    fn instance(status: &str) -> Instance {
        Instance {
            status: Some(status.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn ready_instance_finishes_the_wait() {
        let done = instance_ready(instance(INSTANCE_STATE_READY), "i").unwrap();
        assert_eq!(done.and_then(|i| i.status).as_deref(), Some(INSTANCE_STATE_READY));
        assert!(instance_ready(instance(INSTANCE_STATE_PROGRESSING), "i").unwrap().is_none());
        assert!(instance_ready(Instance::default(), "i").unwrap().is_none());
    }

    #[test]
    fn failed_instance_aborts_the_wait() {
        let err = instance_ready(instance(INSTANCE_STATE_FAILURE), "i").unwrap_err();
        assert!(err.to_string().contains("instance i reached status Failure"));
        assert!(instance_deleted(Some(instance(INSTANCE_STATE_FAILURE)), "i").is_err());
    }

    #[test]
    fn delete_finishes_on_deleted_status_or_absence() {
        assert_eq!(instance_deleted(Some(instance(INSTANCE_STATE_DELETED)), "i").unwrap(), Some(()));
        assert_eq!(instance_deleted(None, "i").unwrap(), Some(()));
        assert_eq!(instance_deleted(Some(instance(INSTANCE_STATE_READY)), "i").unwrap(), None);
    }
}
