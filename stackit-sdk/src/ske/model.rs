use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const CLUSTER_STATE_HEALTHY: &str = "STATE_HEALTHY";
pub const CLUSTER_STATE_HIBERNATED: &str = "STATE_HIBERNATED";
pub const CLUSTER_STATE_UNHEALTHY: &str = "STATE_UNHEALTHY";
pub const CLUSTER_STATE_CREATING: &str = "STATE_CREATING";
pub const CLUSTER_STATE_DELETING: &str = "STATE_DELETING";
pub const CLUSTER_STATE_RECONCILING: &str = "STATE_RECONCILING";

pub const VERSION_STATE_SUPPORTED: &str = "supported";
pub const VERSION_STATE_PREVIEW: &str = "preview";
pub const VERSION_STATE_DEPRECATED: &str = "deprecated";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Kubernetes {
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub name: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Machine {
    #[serde(rename = "type")]
    pub machine_type: Option<String>,
    pub image: Option<Image>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    #[serde(rename = "type")]
    pub volume_type: Option<String>,
    pub size: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Taint {
    pub effect: Option<String>,
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cri {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Nodepool {
    pub name: Option<String>,
    pub machine: Option<Machine>,
    pub minimum: Option<i64>,
    pub maximum: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_surge: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_unavailable: Option<i64>,
    pub volume: Option<Volume>,
    #[serde(default)]
    pub availability_zones: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub taints: Option<Vec<Taint>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cri: Option<Cri>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoUpdate {
    pub kubernetes_version: Option<bool>,
    pub machine_image_version: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeWindow {
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Maintenance {
    pub auto_update: Option<AutoUpdate>,
    pub time_window: Option<TimeWindow>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HibernationSchedule {
    pub start: Option<String>,
    pub end: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hibernation {
    #[serde(default)]
    pub schedules: Vec<HibernationSchedule>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Acl {
    pub enabled: Option<bool>,
    #[serde(default)]
    pub allowed_cidrs: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Extensions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acl: Option<Acl>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Network {
    pub id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterError {
    pub code: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStatus {
    pub aggregated: Option<String>,
    pub hibernated: Option<bool>,
    pub creation_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub errors: Vec<ClusterError>,
    #[serde(default)]
    pub egress_address_ranges: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    pub name: Option<String>,
    pub kubernetes: Option<Kubernetes>,
    #[serde(default)]
    pub nodepools: Vec<Nodepool>,
    pub maintenance: Option<Maintenance>,
    pub hibernation: Option<Hibernation>,
    pub extensions: Option<Extensions>,
    pub network: Option<Network>,
    pub status: Option<ClusterStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrUpdateClusterPayload {
    pub kubernetes: Option<Kubernetes>,
    pub nodepools: Vec<Nodepool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maintenance: Option<Maintenance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hibernation: Option<Hibernation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Extensions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<Network>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KubernetesVersion {
    pub version: Option<String>,
    pub state: Option<String>,
    pub expiration_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineImageVersion {
    pub version: Option<String>,
    pub state: Option<String>,
    pub expiration_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cri: Vec<Cri>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineImage {
    pub name: Option<String>,
    #[serde(default)]
    pub versions: Vec<MachineImageVersion>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderOptions {
    #[serde(default)]
    pub kubernetes_versions: Vec<KubernetesVersion>,
    #[serde(default)]
    pub machine_images: Vec<MachineImage>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateKubeconfigPayload {
    /// Seconds, sent as a string
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration_seconds: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Kubeconfig {
    pub kubeconfig: Option<String>,
    pub expiration_timestamp: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn cluster_status_and_nodepools() {
        let cluster: Cluster = serde_json::from_value(json!({
            "name": "demo",
            "kubernetes": {"version": "1.29.3"},
            "nodepools": [{
                "name": "np",
                "machine": {"type": "c1.2", "image": {"name": "flatcar", "version": "3815.2.1"}},
                "minimum": 1,
                "maximum": 3,
                "availabilityZones": ["eu01-1"]
            }],
            "status": {"aggregated": "STATE_HEALTHY", "hibernated": false}
        }))
        .unwrap();
        assert_eq!(cluster.nodepools.len(), 1);
        let machine = cluster.nodepools[0].machine.as_ref().unwrap();
        assert_eq!(machine.machine_type.as_deref(), Some("c1.2"));
        assert_eq!(
            cluster.status.unwrap().aggregated.as_deref(),
            Some(CLUSTER_STATE_HEALTHY)
        );
    }
}
