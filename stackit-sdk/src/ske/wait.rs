//! Wait handlers for clusters

use super::{
    CLUSTER_STATE_HEALTHY, CLUSTER_STATE_HIBERNATED, CLUSTER_STATE_UNHEALTHY, Cluster, SkeClient,
};
use crate::error::{SdkError, SdkResult};
use crate::wait::{AsyncActionHandler, found};

fn cluster_errors(cluster: &Cluster) -> String {
    let messages: Vec<String> = cluster
        .status
        .iter()
        .flat_map(|s| s.errors.iter())
        .filter_map(|e| e.message.clone())
        .collect();
    if messages.is_empty() {
        "no error details".to_string()
    } else {
        messages.join("; ")
    }
}

/// Unhealthy clusters without reported errors are still converging
fn cluster_settled(cluster: Cluster, name: &str) -> SdkResult<Option<Cluster>> {
    let state = cluster.status.as_ref().and_then(|s| s.aggregated.as_deref());
    match state {
        Some(CLUSTER_STATE_HEALTHY) | Some(CLUSTER_STATE_HIBERNATED) => Ok(Some(cluster)),
        Some(CLUSTER_STATE_UNHEALTHY) if !cluster.status.iter().all(|s| s.errors.is_empty()) => {
            Err(SdkError::WaitFailed(format!(
                "cluster {} is unhealthy: {}",
                name,
                cluster_errors(&cluster)
            )))
        }
        _ => Ok(None),
    }
}

/// Wait until the cluster is healthy or hibernated
pub fn create_or_update_cluster_wait_handler<'a>(
    client: &'a SkeClient,
    project_id: &'a str,
    name: &'a str,
) -> AsyncActionHandler<'a, Cluster> {
    AsyncActionHandler::new(move || {
        Box::pin(async move {
            let cluster = client.get_cluster(project_id, name).await?;
            cluster_settled(cluster, name)
        })
    })
}

/// Wait until the cluster is gone
pub fn delete_cluster_wait_handler<'a>(
    client: &'a SkeClient,
    project_id: &'a str,
    name: &'a str,
) -> AsyncActionHandler<'a, ()> {
    AsyncActionHandler::new(move || {
        Box::pin(async move {
            match found(client.get_cluster(project_id, name).await)? {
                Some(_) => Ok(None),
                None => Ok(Some(())),
            }
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ske::{CLUSTER_STATE_CREATING, CLUSTER_STATE_RECONCILING, ClusterError, ClusterStatus};

    fn cluster(state: &str, errors: Vec<ClusterError>) -> Cluster {
        Cluster {
            status: Some(ClusterStatus {
                aggregated: Some(state.to_string()),
                errors,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn healthy_and_hibernated_clusters_are_settled() {
        assert!(cluster_settled(cluster(CLUSTER_STATE_HEALTHY, vec![]), "c").unwrap().is_some());
        assert!(cluster_settled(cluster(CLUSTER_STATE_HIBERNATED, vec![]), "c").unwrap().is_some());
    }

    #[test]
    fn converging_clusters_keep_waiting() {
        assert!(cluster_settled(cluster(CLUSTER_STATE_CREATING, vec![]), "c").unwrap().is_none());
        assert!(cluster_settled(cluster(CLUSTER_STATE_RECONCILING, vec![]), "c").unwrap().is_none());
        assert!(cluster_settled(cluster(CLUSTER_STATE_UNHEALTHY, vec![]), "c").unwrap().is_none());
        assert!(cluster_settled(Cluster::default(), "c").unwrap().is_none());
    }

    #[test]
    fn unhealthy_cluster_with_errors_fails() {
        let errors = vec![ClusterError {
            code: Some("SKE_NODE_NO_VALID_HOST_FOUND".to_string()),
            message: Some("no valid host".to_string()),
        }];
        let err = cluster_settled(cluster(CLUSTER_STATE_UNHEALTHY, errors), "c").unwrap_err();
        assert!(err.to_string().contains("cluster c is unhealthy: no valid host"));
    }

    #[test]
    fn cluster_errors_joins_messages() {
        let cluster = Cluster {
            status: Some(ClusterStatus {
                errors: vec![
                    ClusterError {
                        code: Some("SKE_QUOTA".to_string()),
                        message: Some("quota exceeded".to_string()),
                    },
                    ClusterError {
                        code: None,
                        message: Some("nodes not ready".to_string()),
                    },
                ],
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(cluster_errors(&cluster), "quota exceeded; nodes not ready");
        assert_eq!(cluster_errors(&Cluster::default()), "no error details");
    }
}
