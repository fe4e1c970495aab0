use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const STATUS_CREATING: &str = "CREATING";
pub const STATUS_CREATE_SUCCEEDED: &str = "CREATE_SUCCEEDED";
pub const STATUS_CREATE_FAILED: &str = "CREATE_FAILED";
pub const STATUS_UPDATING: &str = "UPDATING";
pub const STATUS_UPDATE_SUCCEEDED: &str = "UPDATE_SUCCEEDED";
pub const STATUS_UPDATE_FAILED: &str = "UPDATE_FAILED";
pub const STATUS_DELETING: &str = "DELETING";
pub const STATUS_DELETE_SUCCEEDED: &str = "DELETE_SUCCEEDED";
pub const STATUS_DELETE_FAILED: &str = "DELETE_FAILED";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub plan_id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlansResponse {
    #[serde(default)]
    pub plans: Vec<Plan>,
}

/// Endpoints exposed by a running instance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceSensitiveData {
    pub alerting_url: Option<String>,
    pub dashboard_url: Option<String>,
    pub grafana_url: Option<String>,
    pub grafana_public_read_access: Option<bool>,
    pub jaeger_traces_url: Option<String>,
    pub logs_push_url: Option<String>,
    pub logs_url: Option<String>,
    pub metrics_push_url: Option<String>,
    pub metrics_url: Option<String>,
    pub otlp_traces_url: Option<String>,
    pub targets_url: Option<String>,
    pub zipkin_spans_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    pub id: Option<String>,
    pub name: Option<String>,
    pub plan_id: Option<String>,
    pub plan_name: Option<String>,
    pub status: Option<String>,
    pub parameters: Option<BTreeMap<String, String>>,
    pub instance: Option<InstanceSensitiveData>,
    pub dashboard_url: Option<String>,
    pub is_updatable: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInstancePayload {
    pub name: Option<String>,
    pub plan_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameter: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInstanceResponse {
    pub instance_id: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInstancePayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub plan_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameter: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCredentialsResponse {
    pub credentials: Option<Credentials>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialsInfo {
    pub username: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialsResponse {
    pub id: Option<String>,
    pub credentials_info: Option<CredentialsInfo>,
}
