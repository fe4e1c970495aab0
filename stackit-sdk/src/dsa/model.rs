use serde::{Deserialize, Serialize};

pub const OPERATION_STATE_IN_PROGRESS: &str = "in progress";
pub const OPERATION_STATE_SUCCEEDED: &str = "succeeded";
pub const OPERATION_STATE_FAILED: &str = "failed";

pub const OPERATION_TYPE_CREATE: &str = "create";
pub const OPERATION_TYPE_UPDATE: &str = "update";
pub const OPERATION_TYPE_DELETE: &str = "delete";

/// Instance parameters use snake_case keys on the wire
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstanceParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sgw_acl: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_monitoring: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graphite: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_disk_threshold: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics_frequency: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monitoring_instance_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub syslog: Option<Vec<String>>,
}

impl InstanceParameters {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastOperation {
    #[serde(rename = "type")]
    pub operation_type: Option<String>,
    pub state: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    pub instance_id: Option<String>,
    pub name: Option<String>,
    pub plan_id: Option<String>,
    pub dashboard_url: Option<String>,
    pub image_url: Option<String>,
    pub cf_guid: Option<String>,
    pub cf_space_guid: Option<String>,
    pub cf_organization_guid: Option<String>,
    pub offering_name: Option<String>,
    pub offering_version: Option<String>,
    pub parameters: Option<InstanceParameters>,
    pub last_operation: Option<LastOperation>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInstancePayload {
    pub instance_name: Option<String>,
    pub plan_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<InstanceParameters>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInstanceResponse {
    pub instance_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialUpdateInstancePayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<InstanceParameters>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub host: Option<String>,
    pub hosts: Option<Vec<String>>,
    pub name: Option<String>,
    pub password: Option<String>,
    pub port: Option<i64>,
    pub uri: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCredentials {
    pub credentials: Option<Credentials>,
    pub route_service_url: Option<String>,
    pub syslog_drain_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialsResponse {
    pub id: Option<String>,
    pub raw: Option<RawCredentials>,
    pub uri: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub free: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Offering {
    pub name: Option<String>,
    pub version: Option<String>,
    pub latest: Option<bool>,
    #[serde(default)]
    pub plans: Vec<Plan>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListOfferingsResponse {
    #[serde(default)]
    pub offerings: Vec<Offering>,
}
