//! Resource Manager resources: projects and folders

pub mod folder;
pub mod project;

use std::collections::BTreeMap;

use stackit_core::schema::{AttributeSchema, AttributeType, Validator, common};
use stackit_core::types::{Attr, MapAttr};
use stackit_sdk::resourcemanager::Parent;

pub(crate) const WAIT_TIMEOUT_MINUTES: u64 = 10;

pub(crate) fn container_parent_id(kind: &str) -> AttributeSchema {
    AttributeSchema::new("container_parent_id", AttributeType::String)
        .required()
        .with_validator(Validator::LengthAtLeast(1))
        .with_description(format!(
            "Parent resource identifier. Both container ID (user-friendly) and UUID are supported. The {} is moved when this changes.",
            kind
        ))
}

pub(crate) fn name(kind: &str) -> AttributeSchema {
    AttributeSchema::new("name", AttributeType::String)
        .required()
        .with_validator(Validator::LengthBetween(1, 63))
        .with_description(format!("The name of the {}.", kind))
}

pub(crate) fn owner_email() -> AttributeSchema {
    AttributeSchema::new("owner_email", AttributeType::String)
        .write_only()
        .with_description("Email address of the owner. Required on creation, only read from configuration.")
}

pub(crate) fn labels() -> AttributeSchema {
    common::labels(
        "Labels are key-value string pairs which can be attached to a resource container. A label key must match the regex [A-Za-z0-9_-]{1,64}.",
    )
}

pub(crate) fn timestamp(name: &str, description: &str) -> AttributeSchema {
    AttributeSchema::new(name, AttributeType::String)
        .computed()
        .with_description(description)
}

/// Keep the user's spelling of the parent when it matches either identifier
pub(crate) fn parent_from_api(current: &Attr<String>, parent: Option<&Parent>) -> Attr<String> {
    let Some(parent) = parent else {
        return Attr::Null;
    };
    if let Some(current) = current.as_str()
        && (parent.id.as_deref() == Some(current) || parent.container_id.as_deref() == Some(current))
    {
        return Attr::known(current);
    }
    Attr::from_option(parent.container_id.clone())
}

/// Empty label maps from the API stay null unless configured as empty
pub(crate) fn labels_from_api(
    current: &MapAttr<String>,
    labels: Option<&BTreeMap<String, String>>,
) -> MapAttr<String> {
    match labels {
        Some(labels) if !labels.is_empty() => Attr::Known(labels.clone()),
        _ => match current {
            Attr::Known(m) if m.is_empty() => Attr::Known(BTreeMap::new()),
            _ => Attr::Null,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parent() -> Parent {
        Parent {
            id: Some("2a7b0f58-1b1c-4d7e-9e0a-3f2f4c6d8e10".to_string()),
            container_id: Some("folder-abc".to_string()),
        }
    }

    #[test]
    fn parent_keeps_uuid_spelling() {
        let current = Attr::known("2a7b0f58-1b1c-4d7e-9e0a-3f2f4c6d8e10");
        assert_eq!(parent_from_api(&current, Some(&parent())), current);
    }

    #[test]
    fn parent_keeps_container_id_spelling() {
        let current = Attr::known("folder-abc");
        assert_eq!(parent_from_api(&current, Some(&parent())), current);
    }

    #[test]
    fn parent_falls_back_to_container_id() {
        let current = Attr::known("other");
        assert_eq!(parent_from_api(&current, Some(&parent())), Attr::known("folder-abc"));
        assert_eq!(parent_from_api(&Attr::Null, Some(&parent())), Attr::known("folder-abc"));
        assert_eq!(parent_from_api(&current, None), Attr::Null);
    }

    #[test]
    fn labels_keep_explicit_empty_map() {
        let empty: MapAttr<String> = Attr::Known(BTreeMap::new());
        assert_eq!(labels_from_api(&empty, None), empty);
        assert_eq!(labels_from_api(&Attr::Null, Some(&BTreeMap::new())), Attr::Null);
        let labels = BTreeMap::from([("env".to_string(), "dev".to_string())]);
        assert_eq!(labels_from_api(&Attr::Null, Some(&labels)), Attr::Known(labels.clone()));
    }
}
