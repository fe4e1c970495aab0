use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const KEY_RING_STATE_CREATING: &str = "creating";
pub const KEY_RING_STATE_ACTIVE: &str = "active";
pub const KEY_RING_STATE_DELETED: &str = "deleted";

pub const KEY_STATE_ACTIVE: &str = "active";
pub const KEY_STATE_CREATING: &str = "creating";
pub const KEY_STATE_DELETED: &str = "deleted";
pub const KEY_STATE_DELETION_SCHEDULED: &str = "deletion_scheduled";
pub const KEY_STATE_DISABLED: &str = "disabled";

pub const WRAPPING_KEY_STATE_ACTIVE: &str = "active";
pub const WRAPPING_KEY_STATE_CREATING: &str = "creating";
pub const WRAPPING_KEY_STATE_KEY_MATERIAL_INVALID: &str = "key_material_invalid";

pub const ALGORITHMS: &[&str] = &[
    "aes_256_gcm",
    "rsa_2048_oaep_sha256",
    "rsa_3072_oaep_sha256",
    "rsa_4096_oaep_sha256",
    "rsa_4096_oaep_sha512",
    "hmac_sha256",
    "hmac_sha384",
    "hmac_sha512",
    "ecdsa_p256_sha256",
    "ecdsa_p384_sha384",
    "ecdsa_p521_sha512",
];
pub const WRAPPING_ALGORITHMS: &[&str] = &[
    "rsa_2048_oaep_sha256",
    "rsa_3072_oaep_sha256",
    "rsa_4096_oaep_sha256",
    "rsa_4096_oaep_sha512",
    "rsa_2048_oaep_sha256_aes_256_key_wrap",
    "rsa_3072_oaep_sha256_aes_256_key_wrap",
    "rsa_4096_oaep_sha256_aes_256_key_wrap",
    "rsa_4096_oaep_sha512_aes_256_key_wrap",
];
pub const PURPOSES: &[&str] = &[
    "symmetric_encrypt_decrypt",
    "asymmetric_encrypt_decrypt",
    "message_authentication_code",
    "asymmetric_sign_verify",
];
pub const WRAPPING_PURPOSES: &[&str] = &["wrap_symmetric_key", "wrap_asymmetric_key"];
pub const PROTECTIONS: &[&str] = &["software"];
pub const ACCESS_SCOPES: &[&str] = &["PUBLIC", "SNA"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyRing {
    pub id: Option<String>,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub state: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateKeyRingPayload {
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Key {
    pub id: Option<String>,
    pub key_ring_id: Option<String>,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub algorithm: Option<String>,
    pub purpose: Option<String>,
    pub protection: Option<String>,
    pub access_scope: Option<String>,
    pub import_only: Option<bool>,
    pub state: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub deletion_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateKeyPayload {
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub algorithm: Option<String>,
    pub purpose: Option<String>,
    pub protection: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub import_only: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WrappingKey {
    pub id: Option<String>,
    pub key_ring_id: Option<String>,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub algorithm: Option<String>,
    pub purpose: Option<String>,
    pub protection: Option<String>,
    pub access_scope: Option<String>,
    pub public_key: Option<String>,
    pub state: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWrappingKeyPayload {
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub algorithm: Option<String>,
    pub purpose: Option<String>,
    pub protection: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_scope: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_deserializes_from_api_shape() {
        let key: Key = serde_json::from_value(json!({
            "id": "kid",
            "keyRingId": "krid",
            "displayName": "name",
            "state": "deletion_scheduled",
            "deletionDate": "2026-01-01T00:00:00Z",
            "importOnly": false
        }))
        .unwrap();
        assert_eq!(key.key_ring_id.as_deref(), Some("krid"));
        assert_eq!(key.state.as_deref(), Some(KEY_STATE_DELETION_SCHEDULED));
        assert!(key.deletion_date.is_some());
        assert!(key.algorithm.is_none());
    }

    #[test]
    fn create_payload_skips_absent_optionals() {
        let payload = CreateKeyRingPayload {
            display_name: Some("ring".to_string()),
            description: None,
        };
        assert_eq!(serde_json::to_value(&payload).unwrap(), json!({"displayName": "ring"}));
    }
}
