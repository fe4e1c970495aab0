use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const ORG_STATUS_CREATING: &str = "creating";
pub const ORG_STATUS_CREATED: &str = "created";
pub const ORG_STATUS_DELETING: &str = "deleting";
pub const ORG_STATUS_CREATE_FAILED: &str = "create_failed";
pub const ORG_STATUS_DELETE_FAILED: &str = "delete_failed";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub guid: Option<String>,
    pub name: Option<String>,
    pub platform_id: Option<String>,
    pub project_id: Option<String>,
    pub quota_id: Option<String>,
    pub region: Option<String>,
    pub status: Option<String>,
    pub suspended: Option<bool>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationCreateResponse {
    pub guid: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrganizationPayload {
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quota_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suspended: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrganizationPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suspended: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Platform {
    pub guid: Option<String>,
    pub system_id: Option<String>,
    pub display_name: Option<String>,
    pub region: Option<String>,
    pub api_url: Option<String>,
    pub console_url: Option<String>,
}
