//! Wait handlers for organizations

use super::{
    ORG_STATUS_CREATE_FAILED, ORG_STATUS_CREATED, ORG_STATUS_DELETE_FAILED, Organization, ScfClient,
};
use crate::error::{SdkError, SdkResult};
use crate::wait::{AsyncActionHandler, found};

fn organization_created(org: Organization, org_id: &str) -> SdkResult<Option<Organization>> {
    match org.status.as_deref() {
        Some(ORG_STATUS_CREATED) => Ok(Some(org)),
        Some(ORG_STATUS_CREATE_FAILED) => Err(SdkError::WaitFailed(format!(
            "creating organization {} failed",
            org_id
        ))),
        _ => Ok(None),
    }
}

/// `None` means the organization no longer exists
fn organization_deleted(org: Option<Organization>, org_id: &str) -> SdkResult<Option<()>> {
    let Some(org) = org else {
        return Ok(Some(()));
    };
    match org.status.as_deref() {
        Some(ORG_STATUS_DELETE_FAILED) => Err(SdkError::WaitFailed(format!(
            "deleting organization {} failed",
            org_id
        ))),
        _ => Ok(None),
    }
}

pub fn create_organization_wait_handler<'a>(
    client: &'a ScfClient,
    project_id: &'a str,
    region: &'a str,
    org_id: &'a str,
) -> AsyncActionHandler<'a, Organization> {
    AsyncActionHandler::new(move || {
        Box::pin(async move {
            let org = client.get_organization(project_id, region, org_id).await?;
            organization_created(org, org_id)
        })
    })
}

pub fn delete_organization_wait_handler<'a>(
    client: &'a ScfClient,
    project_id: &'a str,
    region: &'a str,
    org_id: &'a str,
) -> AsyncActionHandler<'a, ()> {
    AsyncActionHandler::new(move || {
        Box::pin(async move {
            let org = found(client.get_organization(project_id, region, org_id).await)?;
            organization_deleted(org, org_id)
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scf::{ORG_STATUS_CREATING, ORG_STATUS_DELETING};

    fn org(status: &str) -> Organization {
        Organization {
            status: Some(status.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn create_waits_for_created() {
        assert!(organization_created(org(ORG_STATUS_CREATED), "o").unwrap().is_some());
        assert!(organization_created(org(ORG_STATUS_CREATING), "o").unwrap().is_none());
        let err = organization_created(org(ORG_STATUS_CREATE_FAILED), "o").unwrap_err();
        assert!(err.to_string().contains("creating organization o failed"));
    }

    #[test]
    fn delete_waits_until_gone() {
        assert_eq!(organization_deleted(None, "o").unwrap(), Some(()));
        assert_eq!(organization_deleted(Some(org(ORG_STATUS_DELETING)), "o").unwrap(), None);
        assert!(organization_deleted(Some(org(ORG_STATUS_DELETE_FAILED)), "o").is_err());
    }
}
