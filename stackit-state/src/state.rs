//! State file structures for persisting provider results

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use stackit_core::plan::ResourceAddress;

/// The main state file structure that persists to the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateFile {
    /// State file format version
    pub version: u32,
    /// Incremented on every write
    pub serial: u64,
    /// Identifies one state history; writes from another lineage are refused
    pub lineage: String,
    /// Version of `stackit-tf` that last wrote this state
    pub tool_version: String,
    pub resources: Vec<ResourceState>,
}

impl StateFile {
    pub const CURRENT_VERSION: u32 = 1;

    pub fn new() -> Self {
        Self::with_lineage(uuid::Uuid::new_v4().to_string())
    }

    pub fn with_lineage(lineage: String) -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            serial: 0,
            lineage,
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            resources: Vec::new(),
        }
    }

    /// Prepare for the next write
    pub fn increment_serial(&mut self) {
        self.serial += 1;
        self.tool_version = env!("CARGO_PKG_VERSION").to_string();
    }

    pub fn find(&self, mode: ResourceMode, address: &ResourceAddress) -> Option<&ResourceState> {
        self.resources.iter().find(|r| r.matches(mode, address))
    }

    /// Add or replace the entry with the same mode and address
    pub fn upsert(&mut self, resource: ResourceState) {
        let address = resource.address();
        match self.resources.iter_mut().find(|r| r.matches(resource.mode, &address)) {
            Some(existing) => *existing = resource,
            None => self.resources.push(resource),
        }
    }

    pub fn remove(&mut self, mode: ResourceMode, address: &ResourceAddress) -> Option<ResourceState> {
        let pos = self.resources.iter().position(|r| r.matches(mode, address))?;
        Some(self.resources.remove(pos))
    }

    pub fn managed(&self) -> impl Iterator<Item = &ResourceState> {
        self.resources.iter().filter(|r| r.mode == ResourceMode::Managed)
    }

    /// Addresses of managed resources in creation order
    pub fn managed_order(&self) -> Vec<ResourceAddress> {
        self.managed().map(ResourceState::address).collect()
    }

    /// Attributes of managed resources keyed by address, as the differ expects them
    pub fn managed_attributes(&self) -> HashMap<ResourceAddress, Value> {
        self.managed()
            .map(|r| (r.address(), r.attributes.clone()))
            .collect()
    }
}

impl Default for StateFile {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceMode {
    Managed,
    Data,
}

/// Stored result of one resource or data source block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceState {
    pub mode: ResourceMode,
    /// Full type name, e.g. `stackit_kms_key`
    pub resource_type: String,
    pub name: String,
    /// Composite id reported by the provider
    pub id: Option<String>,
    pub attributes: Value,
}

impl ResourceState {
    pub fn new(mode: ResourceMode, address: &ResourceAddress, attributes: Value) -> Self {
        let id = attributes.get("id").and_then(Value::as_str).map(str::to_string);
        Self {
            mode,
            resource_type: address.resource_type.clone(),
            name: address.name.clone(),
            id,
            attributes,
        }
    }

    pub fn managed(address: &ResourceAddress, attributes: Value) -> Self {
        Self::new(ResourceMode::Managed, address, attributes)
    }

    pub fn data(address: &ResourceAddress, attributes: Value) -> Self {
        Self::new(ResourceMode::Data, address, attributes)
    }

    pub fn address(&self) -> ResourceAddress {
        ResourceAddress::new(&self.resource_type, &self.name)
    }

    fn matches(&self, mode: ResourceMode, address: &ResourceAddress) -> bool {
        self.mode == mode && self.resource_type == address.resource_type && self.name == address.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn address(name: &str) -> ResourceAddress {
        ResourceAddress::new("stackit_kms_keyring", name)
    }

    #[test]
    fn new_state_is_empty() {
        let state = StateFile::new();
        assert_eq!(state.version, StateFile::CURRENT_VERSION);
        assert_eq!(state.serial, 0);
        assert!(!state.lineage.is_empty());
        assert!(state.resources.is_empty());
    }

    #[test]
    fn id_is_taken_from_attributes() {
        let resource = ResourceState::managed(&address("main"), json!({"id": "p,eu01,k", "display_name": "main"}));
        assert_eq!(resource.id.as_deref(), Some("p,eu01,k"));
        assert_eq!(resource.address().to_string(), "stackit_kms_keyring.main");
    }

    #[test]
    fn upsert_replaces_same_address() {
        let mut state = StateFile::new();
        state.upsert(ResourceState::managed(&address("main"), json!({"display_name": "a"})));
        state.upsert(ResourceState::managed(&address("main"), json!({"display_name": "b"})));
        assert_eq!(state.resources.len(), 1);
        assert_eq!(state.resources[0].attributes["display_name"], "b");

        // a data source with the same address is a separate entry
        state.upsert(ResourceState::data(&address("main"), json!({})));
        assert_eq!(state.resources.len(), 2);
        assert_eq!(state.managed().count(), 1);
    }

    #[test]
    fn remove_by_mode_and_address() {
        let mut state = StateFile::new();
        state.upsert(ResourceState::managed(&address("main"), json!({})));
        assert!(state.remove(ResourceMode::Data, &address("main")).is_none());
        assert!(state.remove(ResourceMode::Managed, &address("main")).is_some());
        assert!(state.resources.is_empty());
    }

    #[test]
    fn managed_order_follows_insertion() {
        let mut state = StateFile::new();
        state.upsert(ResourceState::managed(&address("first"), json!({"id": "1"})));
        state.upsert(ResourceState::data(&address("lookup"), json!({})));
        state.upsert(ResourceState::managed(&address("second"), json!({"id": "2"})));
        assert_eq!(state.managed_order(), vec![address("first"), address("second")]);
        assert_eq!(state.managed_attributes()[&address("second")], json!({"id": "2"}));
    }

    #[test]
    fn mode_serializes_lowercase() {
        let resource = ResourceState::data(&address("main"), json!({}));
        assert_eq!(serde_json::to_value(&resource).unwrap()["mode"], "data");
    }
}
