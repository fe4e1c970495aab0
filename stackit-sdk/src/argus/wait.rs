//! Wait handlers for Argus instances

use super::{
    ArgusClient, Instance, STATUS_CREATE_FAILED, STATUS_CREATE_SUCCEEDED, STATUS_DELETE_FAILED,
    STATUS_DELETE_SUCCEEDED, STATUS_UPDATE_FAILED, STATUS_UPDATE_SUCCEEDED,
};
use crate::error::{SdkError, SdkResult};
use crate::wait::{AsyncActionHandler, found};

/// Done on `succeeded`, failed on `failed`, pending otherwise
fn status_reached<T>(
    instance: Instance,
    instance_id: &str,
    succeeded: &str,
    failed: &str,
    done: impl FnOnce(Instance) -> T,
) -> SdkResult<Option<T>> {
    match instance.status.as_deref() {
        Some(status) if status == succeeded => Ok(Some(done(instance))),
        Some(status) if status == failed => Err(SdkError::WaitFailed(format!(
            "instance {} reached status {}",
            instance_id, status
        ))),
        _ => Ok(None),
    }
}

fn wait_for_status<'a>(
    client: &'a ArgusClient,
    project_id: &'a str,
    instance_id: &'a str,
    succeeded: &'static str,
    failed: &'static str,
) -> AsyncActionHandler<'a, Instance> {
    AsyncActionHandler::new(move || {
        Box::pin(async move {
            let instance = client.get_instance(project_id, instance_id).await?;
            status_reached(instance, instance_id, succeeded, failed, |i| i)
        })
    })
}

pub fn create_instance_wait_handler<'a>(
    client: &'a ArgusClient,
    project_id: &'a str,
    instance_id: &'a str,
) -> AsyncActionHandler<'a, Instance> {
    wait_for_status(client, project_id, instance_id, STATUS_CREATE_SUCCEEDED, STATUS_CREATE_FAILED)
}

pub fn update_instance_wait_handler<'a>(
    client: &'a ArgusClient,
    project_id: &'a str,
    instance_id: &'a str,
) -> AsyncActionHandler<'a, Instance> {
    wait_for_status(client, project_id, instance_id, STATUS_UPDATE_SUCCEEDED, STATUS_UPDATE_FAILED)
}

pub fn delete_instance_wait_handler<'a>(
    client: &'a ArgusClient,
    project_id: &'a str,
    instance_id: &'a str,
) -> AsyncActionHandler<'a, ()> {
    AsyncActionHandler::new(move || {
        Box::pin(async move {
            let Some(instance) = found(client.get_instance(project_id, instance_id).await)? else {
                return Ok(Some(()));
            };
            status_reached(instance, instance_id, STATUS_DELETE_SUCCEEDED, STATUS_DELETE_FAILED, |_| ())
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::argus::{STATUS_CREATING, STATUS_DELETING, STATUS_UPDATING};

    fn instance(status: &str) -> Instance {
        Instance {
            status: Some(status.to_string()),
            ..Default::default()
        }
    }

    fn create(status: &str) -> SdkResult<Option<Instance>> {
        status_reached(instance(status), "i", STATUS_CREATE_SUCCEEDED, STATUS_CREATE_FAILED, |i| i)
    }

    #[test]
    fn create_waits_for_succeeded() {
        assert!(create(STATUS_CREATE_SUCCEEDED).unwrap().is_some());
        assert!(create(STATUS_CREATING).unwrap().is_none());
        let err = create(STATUS_CREATE_FAILED).unwrap_err();
        assert!(err.to_string().contains("instance i reached status CREATE_FAILED"));
    }

    #[test]
    fn statuses_of_other_operations_do_not_finish_a_wait() {
        assert!(create(STATUS_UPDATE_SUCCEEDED).unwrap().is_none());
        assert!(create(STATUS_DELETE_FAILED).unwrap().is_none());
        let update = |status| {
            status_reached(instance(status), "i", STATUS_UPDATE_SUCCEEDED, STATUS_UPDATE_FAILED, |_| ())
        };
        assert_eq!(update(STATUS_UPDATE_SUCCEEDED).unwrap(), Some(()));
        assert_eq!(update(STATUS_UPDATING).unwrap(), None);
        assert!(update(STATUS_UPDATE_FAILED).is_err());
    }

    #[test]
    fn delete_waits_for_delete_succeeded() {
        let delete = |status| {
            status_reached(instance(status), "i", STATUS_DELETE_SUCCEEDED, STATUS_DELETE_FAILED, |_| ())
        };
        assert_eq!(delete(STATUS_DELETE_SUCCEEDED).unwrap(), Some(()));
        assert_eq!(delete(STATUS_DELETING).unwrap(), None);
        assert!(delete(STATUS_DELETE_FAILED).is_err());
        assert_eq!(
            status_reached(Instance::default(), "i", STATUS_DELETE_SUCCEEDED, STATUS_DELETE_FAILED, |_| ())
                .unwrap(),
            None
        );
    }
}
