//! Wait handlers for projects

use super::{LIFECYCLE_STATE_ACTIVE, LIFECYCLE_STATE_CREATING, Project, ResourceManagerClient};
use crate::error::{SdkError, SdkResult};
use crate::wait::{AsyncActionHandler, found};

fn project_created(project: Project, container_id: &str) -> SdkResult<Option<Project>> {
    match project.lifecycle_state.as_deref() {
        Some(LIFECYCLE_STATE_ACTIVE) => Ok(Some(project)),
        Some(LIFECYCLE_STATE_CREATING) | None => Ok(None),
        Some(other) => Err(SdkError::WaitFailed(format!(
            "project {} reached lifecycle state {}",
            container_id, other
        ))),
    }
}

/// Deleted projects may answer 403 instead of 404
fn project_deleted(result: SdkResult<Project>) -> SdkResult<Option<()>> {
    match found(result) {
        Ok(None) => Ok(Some(())),
        Ok(Some(_)) => Ok(None),
        Err(e) if e.status_code() == Some(403) => Ok(Some(())),
        Err(e) => Err(e),
    }
}

/// Wait until a new project is active
pub fn create_project_wait_handler<'a>(
    client: &'a ResourceManagerClient,
    container_id: &'a str,
) -> AsyncActionHandler<'a, Project> {
    AsyncActionHandler::new(move || {
        Box::pin(async move {
            let project = client.get_project(container_id).await?;
            project_created(project, container_id)
        })
    })
}

/// Wait until a project is gone
pub fn delete_project_wait_handler<'a>(
    client: &'a ResourceManagerClient,
    container_id: &'a str,
) -> AsyncActionHandler<'a, ()> {
    AsyncActionHandler::new(move || Box::pin(async move { project_deleted(client.get_project(container_id).await) }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resourcemanager::{LIFECYCLE_STATE_DELETING, LIFECYCLE_STATE_INACTIVE};

    fn project(state: Option<&str>) -> Project {
        Project {
            lifecycle_state: state.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn create_waits_for_active() {
        assert!(project_created(project(Some(LIFECYCLE_STATE_ACTIVE)), "p").unwrap().is_some());
        assert!(project_created(project(Some(LIFECYCLE_STATE_CREATING)), "p").unwrap().is_none());
        assert!(project_created(project(None), "p").unwrap().is_none());
        let err = project_created(project(Some(LIFECYCLE_STATE_INACTIVE)), "p").unwrap_err();
        assert!(err.to_string().contains("lifecycle state INACTIVE"));
    }

    #[test]
    fn delete_accepts_forbidden_as_gone() {
        assert_eq!(project_deleted(Err(SdkError::api(404, "gone"))).unwrap(), Some(()));
        assert_eq!(project_deleted(Err(SdkError::api(403, "forbidden"))).unwrap(), Some(()));
        assert_eq!(project_deleted(Ok(project(Some(LIFECYCLE_STATE_DELETING)))).unwrap(), None);
        assert!(project_deleted(Err(SdkError::api(500, "boom"))).is_err());
    }
}
