//! Composite identifiers
//!
//! Resource ids are the resource's key fields joined with [`SEPARATOR`],
//! e.g. `project_id,region,keyring_id,key_id`. Import parses them back
//! positionally.

use crate::error::{CoreError, CoreResult};

/// Separator between the parts of a composite id
pub const SEPARATOR: &str = ",";

/// Join the parts of a composite id
pub fn build_id(parts: &[&str]) -> String {
    parts.join(SEPARATOR)
}

/// Split an import id into exactly `fields.len()` non-empty parts
pub fn parse_import_id(id: &str, fields: &[&str]) -> CoreResult<Vec<String>> {
    let parts: Vec<&str> = id.split(SEPARATOR).collect();
    if parts.len() != fields.len() || parts.iter().any(|p| p.is_empty()) {
        let expected = fields
            .iter()
            .map(|f| format!("[{}]", f))
            .collect::<Vec<_>>()
            .join(SEPARATOR);
        return Err(CoreError::InvalidImportId {
            expected,
            got: id.to_string(),
        });
    }
    Ok(parts.into_iter().map(String::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_joins_parts() {
        assert_eq!(build_id(&["pid", "eu01", "krid", "kid"]), "pid,eu01,krid,kid");
        assert_eq!(build_id(&["cid"]), "cid");
    }

    #[test]
    fn parse_two_parts() {
        let parts = parse_import_id("pid,iid", &["project_id", "instance_id"]).unwrap();
        assert_eq!(parts, vec!["pid", "iid"]);
    }

    #[test]
    fn parse_rejects_wrong_count() {
        let err = parse_import_id("pid", &["project_id", "instance_id"]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Expected import identifier with format: [project_id],[instance_id] Got: pid"
        );
        assert!(parse_import_id("a,b,c", &["project_id", "instance_id"]).is_err());
    }

    #[test]
    fn parse_rejects_empty_component() {
        assert!(parse_import_id("pid,", &["project_id", "instance_id"]).is_err());
        assert!(parse_import_id(",iid", &["project_id", "instance_id"]).is_err());
        assert!(parse_import_id("", &["container_id"]).is_err());
    }
}
