//! Host configuration: provider block, backend, data and resource blocks
//!
//! String values may reference attributes of other blocks with
//! `${<type>.<name>.<attr>}` or `${data.<type>.<name>.<attr>}`. A string that
//! is exactly one reference takes the referenced value with its JSON type,
//! references embedded in longer strings are interpolated as text.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value};

use stackit_core::ProviderConfig;
use stackit_core::plan::ResourceAddress;
use stackit_state::{BackendConfig, ResourceMode, StateFile};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HostConfig {
    pub provider: ProviderConfig,
    pub backend: BackendConfig,
    pub data: Vec<Block>,
    pub resources: Vec<Block>,
}

/// One `data` or `resources` entry
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Block {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub name: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl Block {
    pub fn address(&self) -> ResourceAddress {
        ResourceAddress::new(&self.resource_type, &self.name)
    }

    pub fn config(&self) -> Value {
        Value::Object(self.attributes.clone())
    }

    /// Addresses (`type.name` or `data.type.name`) this block references
    pub fn dependencies(&self) -> BTreeSet<String> {
        let mut deps = BTreeSet::new();
        for value in self.attributes.values() {
            collect_references(value, &mut |reference| {
                if let Some((address, _)) = split_reference(reference) {
                    deps.insert(address);
                }
            });
        }
        deps
    }
}

impl HostConfig {
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, String> {
        serde_json::from_str(content).map_err(|e| format!("Parse error: {}", e))
    }

    /// Structural checks that need no provider: unique names and known references
    pub fn check(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        let mut declared = HashSet::new();
        for (prefix, blocks) in [("data.", &self.data), ("", &self.resources)] {
            for block in blocks {
                let key = format!("{}{}", prefix, block.address());
                if !declared.insert(key.clone()) {
                    errors.push(format!("Duplicate block {}", key));
                }
            }
        }
        for (prefix, blocks) in [("data.", &self.data), ("", &self.resources)] {
            for block in blocks {
                for dep in block.dependencies() {
                    if !declared.contains(&dep) {
                        errors.push(format!(
                            "{}{} references undeclared {}",
                            prefix,
                            block.address(),
                            dep
                        ));
                    } else if prefix == "data." && !dep.starts_with("data.") {
                        errors.push(format!(
                            "data.{} may only reference other data sources, found {}",
                            block.address(),
                            dep
                        ));
                    }
                }
            }
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Attribute values of every stored block, keyed the way references name them
pub fn reference_values(state: &StateFile) -> HashMap<String, Value> {
    state
        .resources
        .iter()
        .map(|r| {
            let key = match r.mode {
                ResourceMode::Managed => r.address().to_string(),
                ResourceMode::Data => format!("data.{}", r.address()),
            };
            (key, r.attributes.clone())
        })
        .collect()
}

/// Replace every resolvable reference, leaving the others in place
pub fn resolve(value: &Value, values: &HashMap<String, Value>) -> Value {
    match value {
        Value::String(s) => resolve_string(s, values),
        Value::Array(items) => Value::Array(items.iter().map(|v| resolve(v, values)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), resolve(v, values)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// References that are still unresolved anywhere in `value`
pub fn unresolved(value: &Value) -> Vec<String> {
    let mut found = Vec::new();
    collect_references(value, &mut |reference| found.push(reference.to_string()));
    found
}

fn resolve_string(s: &str, values: &HashMap<String, Value>) -> Value {
    if let Some(reference) = whole_reference(s) {
        return match lookup(reference, values) {
            Some(v) if !v.is_null() => v.clone(),
            _ => Value::String(s.to_string()),
        };
    }

    let mut out = String::new();
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        let reference = &rest[start + 2..start + len];
        out.push_str(&rest[..start]);
        match lookup(reference, values) {
            Some(Value::String(v)) => out.push_str(v),
            Some(v) if !v.is_null() => out.push_str(&v.to_string()),
            _ => out.push_str(&rest[start..=start + len]),
        }
        rest = &rest[start + len + 1..];
    }
    out.push_str(rest);
    Value::String(out)
}

fn whole_reference(s: &str) -> Option<&str> {
    let inner = s.strip_prefix("${")?.strip_suffix('}')?;
    (!inner.contains("${") && !inner.contains('}')).then_some(inner)
}

fn collect_references(value: &Value, found: &mut impl FnMut(&str)) {
    match value {
        Value::String(s) => {
            let mut rest = s.as_str();
            while let Some(start) = rest.find("${") {
                let Some(len) = rest[start..].find('}') else {
                    break;
                };
                found(&rest[start + 2..start + len]);
                rest = &rest[start + len + 1..];
            }
        }
        Value::Array(items) => items.iter().for_each(|v| collect_references(v, found)),
        Value::Object(map) => map.values().for_each(|v| collect_references(v, found)),
        _ => {}
    }
}

/// Split `data.type.name.attr.path` into the block key and the attribute path
fn split_reference(reference: &str) -> Option<(String, Vec<&str>)> {
    let parts: Vec<&str> = reference.split('.').collect();
    let key_len = if parts.first() == Some(&"data") { 3 } else { 2 };
    if parts.len() <= key_len || parts.iter().any(|p| p.is_empty()) {
        return None;
    }
    Some((parts[..key_len].join("."), parts[key_len..].to_vec()))
}

fn lookup<'a>(reference: &str, values: &'a HashMap<String, Value>) -> Option<&'a Value> {
    let (key, path) = split_reference(reference)?;
    let mut current = values.get(&key)?;
    for segment in path {
        current = match current {
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            other => other.get(segment)?,
        };
    }
    Some(current)
}

/// Order blocks so that every block comes after the blocks it references
pub fn sort_by_dependencies<'a>(blocks: &'a [Block], prefix: &str) -> Result<Vec<&'a Block>, String> {
    fn visit<'a>(
        block: &'a Block,
        by_key: &HashMap<String, &'a Block>,
        prefix: &str,
        visited: &mut HashSet<String>,
        visiting: &mut Vec<String>,
        sorted: &mut Vec<&'a Block>,
    ) -> Result<(), String> {
        let key = format!("{}{}", prefix, block.address());
        if visited.contains(&key) {
            return Ok(());
        }
        if visiting.contains(&key) {
            visiting.push(key);
            return Err(format!("Dependency cycle: {}", visiting.join(" -> ")));
        }
        visiting.push(key.clone());
        for dep in block.dependencies() {
            if let Some(dep_block) = by_key.get(&dep) {
                visit(dep_block, by_key, prefix, visited, visiting, sorted)?;
            }
        }
        visiting.pop();
        visited.insert(key);
        sorted.push(block);
        Ok(())
    }

    let by_key: HashMap<String, &Block> = blocks
        .iter()
        .map(|b| (format!("{}{}", prefix, b.address()), b))
        .collect();
    let mut visited = HashSet::new();
    let mut sorted = Vec::new();
    for block in blocks {
        visit(block, &by_key, prefix, &mut visited, &mut Vec::new(), &mut sorted)?;
    }
    Ok(sorted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn block(resource_type: &str, name: &str, attributes: Value) -> Block {
        Block {
            resource_type: resource_type.to_string(),
            name: name.to_string(),
            attributes: attributes.as_object().cloned().unwrap_or_default(),
        }
    }

    fn values() -> HashMap<String, Value> {
        HashMap::from([
            (
                "stackit_kms_keyring.main".to_string(),
                json!({"keyring_id": "kr-1", "protection": ["software"], "count": 3}),
            ),
            (
                "data.stackit_resourcemanager_project.p".to_string(),
                json!({"project_id": "pid"}),
            ),
        ])
    }

    #[test]
    fn parse_full_config() {
        let config = HostConfig::parse(
            r#"{
                "provider": {"region": "eu01"},
                "backend": {"type": "local", "path": "test.state.json"},
                "data": [{"type": "stackit_resourcemanager_project", "name": "p", "attributes": {"container_id": "c"}}],
                "resources": [{"type": "stackit_kms_keyring", "name": "main", "attributes": {"display_name": "k"}}]
            }"#,
        )
        .unwrap();
        assert_eq!(config.provider.region.as_deref(), Some("eu01"));
        assert_eq!(config.backend.get_string("path"), Some("test.state.json"));
        assert_eq!(config.resources[0].address().to_string(), "stackit_kms_keyring.main");
    }

    #[test]
    fn parse_rejects_unknown_keys() {
        assert!(HostConfig::parse(r#"{"resource": []}"#).is_err());
        assert!(HostConfig::parse(r#"{"provider": {"regoin": "eu01"}}"#).is_err());
    }

    #[test]
    fn whole_reference_keeps_type() {
        let resolved = resolve(&json!({"n": "${stackit_kms_keyring.main.count}"}), &values());
        assert_eq!(resolved, json!({"n": 3}));
    }

    #[test]
    fn embedded_reference_is_interpolated() {
        let resolved = resolve(
            &json!("projects/${data.stackit_resourcemanager_project.p.project_id}/keyrings/${stackit_kms_keyring.main.keyring_id}"),
            &values(),
        );
        assert_eq!(resolved, json!("projects/pid/keyrings/kr-1"));
    }

    #[test]
    fn list_index_and_missing_reference() {
        let resolved = resolve(
            &json!(["${stackit_kms_keyring.main.protection.0}", "${stackit_kms_key.k.key_id}"]),
            &values(),
        );
        assert_eq!(resolved, json!(["software", "${stackit_kms_key.k.key_id}"]));
        assert_eq!(unresolved(&resolved), vec!["stackit_kms_key.k.key_id".to_string()]);
    }

    #[test]
    fn dependencies_and_sorting() {
        let blocks = vec![
            block("stackit_kms_key", "k", json!({"keyring_id": "${stackit_kms_keyring.main.keyring_id}"})),
            block("stackit_kms_keyring", "main", json!({"project_id": "${data.stackit_resourcemanager_project.p.project_id}"})),
        ];
        assert_eq!(
            blocks[0].dependencies().into_iter().collect::<Vec<_>>(),
            vec!["stackit_kms_keyring.main".to_string()]
        );
        let sorted = sort_by_dependencies(&blocks, "").unwrap();
        assert_eq!(sorted[0].name, "main");
        assert_eq!(sorted[1].name, "k");
    }

    #[test]
    fn cycles_are_reported() {
        let blocks = vec![
            block("stackit_kms_keyring", "a", json!({"display_name": "${stackit_kms_keyring.b.id}"})),
            block("stackit_kms_keyring", "b", json!({"display_name": "${stackit_kms_keyring.a.id}"})),
        ];
        let err = sort_by_dependencies(&blocks, "").unwrap_err();
        assert!(err.starts_with("Dependency cycle"));
    }

    #[test]
    fn check_finds_duplicates_and_undeclared() {
        let config = HostConfig {
            data: vec![block("stackit_scf_platform", "p", json!({"project_id": "${stackit_kms_keyring.main.id}"}))],
            resources: vec![
                block("stackit_kms_keyring", "main", json!({})),
                block("stackit_kms_keyring", "main", json!({"display_name": "${stackit_kms_key.nope.id}"})),
            ],
            ..Default::default()
        };
        let errors = config.check().unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().any(|e| e.contains("Duplicate block stackit_kms_keyring.main")));
        assert!(errors.iter().any(|e| e.contains("undeclared stackit_kms_key.nope")));
        assert!(errors.iter().any(|e| e.contains("may only reference other data sources")));
    }
}
