//! Differ - Compare desired configuration with stored state
//!
//! Compares the configuration of a block with the state recorded after the
//! last apply and decides whether the resource must be created, updated in
//! place, replaced, or left alone. The schema tells which attributes are
//! configurable and which force replacement.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::plan::{Effect, Plan, ResourceAddress};
use crate::schema::{AttributeSchema, AttributeType, ResourceSchema, is_deferred};

/// Result of a diff operation
#[derive(Debug, Clone, PartialEq)]
pub enum Diff {
    /// Resource does not exist -> needs creation
    Create,
    /// Configurable attributes differ -> needs update
    Update { changed: Vec<String> },
    /// An attribute marked `requires_replace` differs -> delete and create
    Replace {
        changed: Vec<String>,
        forced_by: Vec<String>,
    },
    /// No differences -> no action needed
    NoChange,
}

impl Diff {
    /// Returns whether this Diff involves a change
    pub fn is_change(&self) -> bool {
        !matches!(self, Diff::NoChange)
    }
}

/// Compare one block's configuration with its current state
pub fn diff(schema: &ResourceSchema, config: &Value, current: Option<&Value>) -> Diff {
    let Some(current) = current else {
        return Diff::Create;
    };

    let changed = find_changed_attributes(schema, config, current);
    if changed.is_empty() {
        return Diff::NoChange;
    }

    let forced_by: Vec<String> = changed
        .iter()
        .filter(|name| schema.get(name).is_some_and(|a| a.requires_replace))
        .cloned()
        .collect();

    if forced_by.is_empty() {
        Diff::Update { changed }
    } else {
        Diff::Replace { changed, forced_by }
    }
}

/// Find changed attributes between configuration and state
fn find_changed_attributes(schema: &ResourceSchema, config: &Value, current: &Value) -> Vec<String> {
    schema
        .attributes
        .iter()
        .filter(|a| attribute_differs(a, config.get(&a.name), current.get(&a.name)))
        .map(|a| a.name.clone())
        .collect()
}

/// Compare one attribute, applying the same rules at every nesting level
fn attribute_differs(attribute: &AttributeSchema, desired: Option<&Value>, actual: Option<&Value>) -> bool {
    if !attribute.is_configurable() {
        return false;
    }
    let desired = desired.unwrap_or(&Value::Null);
    let actual = actual.unwrap_or(&Value::Null);
    match desired {
        // Unset optional+computed attributes keep whatever the API chose
        Value::Null if attribute.is_computed() => false,
        // Create-only values are absent after import
        _ if attribute.write_only && actual.is_null() => false,
        v => value_differs(&attribute.attr_type, v, actual),
    }
}

fn value_differs(attr_type: &AttributeType, desired: &Value, actual: &Value) -> bool {
    if is_deferred(desired) {
        return true;
    }
    match (attr_type, desired, actual) {
        (AttributeType::Object(attributes), Value::Object(d), Value::Object(a)) => attributes
            .iter()
            .any(|sub| attribute_differs(sub, d.get(&sub.name), a.get(&sub.name))),
        (AttributeType::List(inner), Value::Array(d), Value::Array(a)) => {
            d.len() != a.len() || d.iter().zip(a).any(|(d, a)| value_differs(inner, d, a))
        }
        (AttributeType::Map(inner), Value::Object(d), Value::Object(a)) => {
            d.len() != a.len()
                || d.iter()
                    .any(|(k, d)| a.get(k).is_none_or(|a| value_differs(inner, d, a)))
        }
        _ => desired != actual,
    }
}

/// Build the planned values handed to Create/Update
///
/// Configured values win. Computed attributes left unset in the
/// configuration keep their prior state value, everything else is null.
/// Nested objects follow the same rule per sub-attribute.
pub fn planned_state(schema: &ResourceSchema, config: &Value, prior: Option<&Value>) -> Value {
    let planned = schema
        .attributes
        .iter()
        .map(|a| {
            let value = planned_value(a, config.get(&a.name), prior.and_then(|p| p.get(&a.name)));
            (a.name.clone(), value)
        })
        .collect::<Map<_, _>>();
    Value::Object(planned)
}

fn planned_value(attribute: &AttributeSchema, configured: Option<&Value>, prior: Option<&Value>) -> Value {
    let configured = configured.filter(|v| !v.is_null() && attribute.is_configurable());
    match configured {
        Some(v) => merge_nested(&attribute.attr_type, v, prior),
        None if attribute.is_computed() => prior.cloned().unwrap_or(Value::Null),
        None => Value::Null,
    }
}

fn merge_nested(attr_type: &AttributeType, configured: &Value, prior: Option<&Value>) -> Value {
    match (attr_type, configured, prior) {
        (AttributeType::Object(attributes), Value::Object(c), Some(Value::Object(p))) => Value::Object(
            attributes
                .iter()
                .map(|sub| (sub.name.clone(), planned_value(sub, c.get(&sub.name), p.get(&sub.name))))
                .collect(),
        ),
        (AttributeType::List(inner), Value::Array(c), Some(Value::Array(p))) if c.len() == p.len() => {
            Value::Array(c.iter().zip(p).map(|(c, p)| merge_nested(inner, c, Some(p))).collect())
        }
        _ => configured.clone(),
    }
}

/// A configured block ready to be diffed
pub struct DesiredResource<'a> {
    pub address: ResourceAddress,
    pub schema: &'a ResourceSchema,
    pub config: Value,
}

/// Compute Diffs for every block and generate a Plan
///
/// Blocks present in `current` but absent from `desired` are deleted, in
/// reverse order of `current_order`.
pub fn create_plan(
    desired: &[DesiredResource<'_>],
    current: &HashMap<ResourceAddress, Value>,
    current_order: &[ResourceAddress],
) -> Plan {
    let mut plan = Plan::new();

    for resource in desired {
        let d = diff(resource.schema, &resource.config, current.get(&resource.address));
        match d {
            Diff::Create => plan.add(Effect::Create(resource.address.clone())),
            Diff::Update { changed } => plan.add(Effect::Update {
                address: resource.address.clone(),
                changed,
            }),
            Diff::Replace { changed, forced_by } => plan.add(Effect::Replace {
                address: resource.address.clone(),
                changed,
                forced_by,
            }),
            Diff::NoChange => {}
        }
    }

    for address in current_order.iter().rev() {
        if !desired.iter().any(|d| &d.address == address) {
            plan.add(Effect::Delete(address.clone()));
        }
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> ResourceSchema {
        ResourceSchema::new("stackit_scf_organization")
            .attribute(AttributeSchema::new("id", AttributeType::String).computed())
            .attribute(
                AttributeSchema::new("project_id", AttributeType::String)
                    .required()
                    .requires_replace(),
            )
            .attribute(AttributeSchema::new("name", AttributeType::String).required())
            .attribute(AttributeSchema::new("suspended", AttributeType::Bool).optional_computed())
            .attribute(AttributeSchema::new("quota_id", AttributeType::String))
    }

    #[test]
    fn diff_create_when_not_exists() {
        let result = diff(&schema(), &json!({"project_id": "p", "name": "org"}), None);
        assert_eq!(result, Diff::Create);
    }

    #[test]
    fn diff_no_change_when_same() {
        let current = json!({"id": "p,eu01,o", "project_id": "p", "name": "org", "suspended": false});
        let result = diff(&schema(), &json!({"project_id": "p", "name": "org"}), Some(&current));
        assert_eq!(result, Diff::NoChange);
    }

    #[test]
    fn diff_update_when_mutable_attribute_differs() {
        let current = json!({"project_id": "p", "name": "org", "quota_id": "q"});
        let result = diff(&schema(), &json!({"project_id": "p", "name": "renamed"}), Some(&current));
        assert_eq!(
            result,
            Diff::Update {
                changed: vec!["name".to_string(), "quota_id".to_string()]
            }
        );
    }

    #[test]
    fn diff_replace_when_immutable_attribute_differs() {
        let current = json!({"project_id": "p", "name": "org"});
        let result = diff(&schema(), &json!({"project_id": "other", "name": "org"}), Some(&current));
        assert!(matches!(result, Diff::Replace { ref forced_by, .. } if forced_by == &vec!["project_id".to_string()]));
    }

    #[test]
    fn planned_state_keeps_computed_values() {
        let prior = json!({"id": "p,eu01,o", "project_id": "p", "name": "org", "suspended": true, "quota_id": "q"});
        let planned = planned_state(&schema(), &json!({"project_id": "p", "name": "new"}), Some(&prior));
        assert_eq!(
            planned,
            json!({"id": "p,eu01,o", "project_id": "p", "name": "new", "suspended": true, "quota_id": null})
        );
    }

    fn pool_schema() -> ResourceSchema {
        let pool = vec![
            AttributeSchema::new("name", AttributeType::String).required(),
            AttributeSchema::new("maximum", AttributeType::Int).required(),
            AttributeSchema::new("os_name", AttributeType::String).optional_computed(),
            AttributeSchema::new("os_version_used", AttributeType::String).computed(),
        ];
        let maintenance = vec![
            AttributeSchema::new("enable_kubernetes_version_updates", AttributeType::Bool).optional_computed(),
            AttributeSchema::new("start", AttributeType::String).required(),
        ];
        ResourceSchema::new("stackit_ske_cluster")
            .attribute(AttributeSchema::new("name", AttributeType::String).required())
            .attribute(
                AttributeSchema::new("node_pools", AttributeType::list_of(AttributeType::Object(pool))).required(),
            )
            .attribute(AttributeSchema::new("maintenance", AttributeType::Object(maintenance)).optional_computed())
            .attribute(AttributeSchema::new("owner_email", AttributeType::String).write_only())
    }

    fn pool_state() -> Value {
        json!({
            "name": "c",
            "node_pools": [{"name": "a", "maximum": 3, "os_name": "flatcar", "os_version_used": "3815.2.5"}],
            "maintenance": {"enable_kubernetes_version_updates": true, "start": "01:00:00Z"},
            "owner_email": null
        })
    }

    #[test]
    fn diff_ignores_computed_fields_in_list_of_objects() {
        let config = json!({"name": "c", "node_pools": [{"name": "a", "maximum": 3}]});
        assert_eq!(diff(&pool_schema(), &config, Some(&pool_state())), Diff::NoChange);
    }

    #[test]
    fn diff_detects_changes_in_list_of_objects() {
        let config = json!({"name": "c", "node_pools": [{"name": "a", "maximum": 5}]});
        assert_eq!(
            diff(&pool_schema(), &config, Some(&pool_state())),
            Diff::Update {
                changed: vec!["node_pools".to_string()]
            }
        );

        let config = json!({"name": "c", "node_pools": [{"name": "a", "maximum": 3}, {"name": "b", "maximum": 1}]});
        assert!(diff(&pool_schema(), &config, Some(&pool_state())).is_change());
    }

    #[test]
    fn diff_ignores_unset_computed_fields_in_nested_object() {
        let config = json!({
            "name": "c",
            "node_pools": [{"name": "a", "maximum": 3}],
            "maintenance": {"start": "01:00:00Z"}
        });
        assert_eq!(diff(&pool_schema(), &config, Some(&pool_state())), Diff::NoChange);

        let config = json!({
            "name": "c",
            "node_pools": [{"name": "a", "maximum": 3}],
            "maintenance": {"start": "02:00:00Z", "enable_kubernetes_version_updates": false}
        });
        assert_eq!(
            diff(&pool_schema(), &config, Some(&pool_state())),
            Diff::Update {
                changed: vec!["maintenance".to_string()]
            }
        );
    }

    #[test]
    fn diff_skips_write_only_attribute_missing_from_state() {
        let config = json!({"name": "c", "node_pools": [{"name": "a", "maximum": 3}], "owner_email": "a@b.c"});
        assert_eq!(diff(&pool_schema(), &config, Some(&pool_state())), Diff::NoChange);

        let mut current = pool_state();
        current["owner_email"] = json!("old@b.c");
        assert_eq!(
            diff(&pool_schema(), &config, Some(&current)),
            Diff::Update {
                changed: vec!["owner_email".to_string()]
            }
        );
    }

    #[test]
    fn planned_state_keeps_nested_computed_values() {
        let config = json!({"name": "c", "node_pools": [{"name": "a", "maximum": 4}]});
        let planned = planned_state(&pool_schema(), &config, Some(&pool_state()));
        assert_eq!(
            planned["node_pools"],
            json!([{"name": "a", "maximum": 4, "os_name": "flatcar", "os_version_used": "3815.2.5"}])
        );
        assert_eq!(planned["maintenance"], pool_state()["maintenance"]);
    }

    #[test]
    fn create_plan_adds_deletes_for_orphans() {
        let schema = schema();
        let kept = ResourceAddress::new("stackit_scf_organization", "kept");
        let orphan = ResourceAddress::new("stackit_scf_organization", "orphan");
        let desired = vec![
            DesiredResource {
                address: ResourceAddress::new("stackit_scf_organization", "new"),
                schema: &schema,
                config: json!({"project_id": "p", "name": "new"}),
            },
            DesiredResource {
                address: kept.clone(),
                schema: &schema,
                config: json!({"project_id": "p", "name": "kept"}),
            },
        ];
        let mut current = HashMap::new();
        current.insert(kept.clone(), json!({"project_id": "p", "name": "kept"}));
        current.insert(orphan.clone(), json!({"project_id": "p", "name": "orphan"}));

        let plan = create_plan(&desired, &current, &[kept, orphan.clone()]);
        assert_eq!(plan.effects().len(), 2);
        assert!(matches!(plan.effects()[0], Effect::Create(_)));
        assert_eq!(plan.effects()[1], Effect::Delete(orphan));
    }
}
