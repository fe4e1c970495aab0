//! Plan - Collection of Effects
//!
//! A Plan is an ordered list of Effects to be executed.
//! No side effects occur until the Plan is applied.

use std::fmt;

/// Address of a block in the host configuration (`type.name`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceAddress {
    /// Resource type (e.g., "stackit_kms_key")
    pub resource_type: String,
    /// Block name given by the user
    pub name: String,
}

impl ResourceAddress {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
        }
    }

    /// Parse `type.name`
    pub fn parse(address: &str) -> Option<Self> {
        let (resource_type, name) = address.split_once('.')?;
        if resource_type.is_empty() || name.is_empty() {
            return None;
        }
        Some(Self::new(resource_type, name))
    }
}

impl fmt::Display for ResourceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.resource_type, self.name)
    }
}

/// A single step of a plan
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Read a data source
    Read(ResourceAddress),
    Create(ResourceAddress),
    /// In-place update of the listed attributes
    Update {
        address: ResourceAddress,
        changed: Vec<String>,
    },
    /// Delete then create because an immutable attribute changed
    Replace {
        address: ResourceAddress,
        changed: Vec<String>,
        forced_by: Vec<String>,
    },
    Delete(ResourceAddress),
}

impl Effect {
    pub fn address(&self) -> &ResourceAddress {
        match self {
            Effect::Read(a) | Effect::Create(a) | Effect::Delete(a) => a,
            Effect::Update { address, .. } | Effect::Replace { address, .. } => address,
        }
    }

    /// Whether this Effect changes infrastructure
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Effect::Read(_))
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::Read(a) => write!(f, "read {}", a),
            Effect::Create(a) => write!(f, "create {}", a),
            Effect::Update { address, changed } => {
                write!(f, "update {} ({})", address, changed.join(", "))
            }
            Effect::Replace {
                address, forced_by, ..
            } => write!(f, "replace {} (forced by {})", address, forced_by.join(", ")),
            Effect::Delete(a) => write!(f, "delete {}", a),
        }
    }
}

/// Plan containing Effects to be executed
#[derive(Debug, Clone, Default)]
pub struct Plan {
    effects: Vec<Effect>,
}

impl Plan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, effect: Effect) {
        self.effects.push(effect);
    }

    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Number of mutating Effects
    pub fn mutation_count(&self) -> usize {
        self.effects.iter().filter(|e| e.is_mutating()).count()
    }

    /// Generate a summary of the Plan for display
    pub fn summary(&self) -> PlanSummary {
        let mut summary = PlanSummary::default();
        for effect in &self.effects {
            match effect {
                Effect::Read(_) => summary.read += 1,
                Effect::Create(_) => summary.create += 1,
                Effect::Update { .. } => summary.update += 1,
                Effect::Replace { .. } => summary.replace += 1,
                Effect::Delete(_) => summary.delete += 1,
            }
        }
        summary
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct PlanSummary {
    pub read: usize,
    pub create: usize,
    pub update: usize,
    pub replace: usize,
    pub delete: usize,
}

impl fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Plan: {} to create, {} to update, {} to replace, {} to delete",
            self.create, self.update, self.replace, self.delete
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_address() {
        let a = ResourceAddress::parse("stackit_kms_key.main").unwrap();
        assert_eq!(a.resource_type, "stackit_kms_key");
        assert_eq!(a.name, "main");
        assert_eq!(a.to_string(), "stackit_kms_key.main");
        assert!(ResourceAddress::parse("stackit_kms_key").is_none());
        assert!(ResourceAddress::parse(".main").is_none());
    }

    #[test]
    fn summary_counts_effects() {
        let mut plan = Plan::new();
        plan.add(Effect::Read(ResourceAddress::new("stackit_scf_platform", "p")));
        plan.add(Effect::Create(ResourceAddress::new("stackit_kms_keyring", "k")));
        plan.add(Effect::Replace {
            address: ResourceAddress::new("stackit_kms_key", "k"),
            changed: vec!["algorithm".to_string()],
            forced_by: vec!["algorithm".to_string()],
        });
        plan.add(Effect::Delete(ResourceAddress::new("stackit_kms_key", "old")));

        assert_eq!(plan.mutation_count(), 3);
        let summary = plan.summary();
        assert_eq!(summary.read, 1);
        assert_eq!(summary.replace, 1);
        assert_eq!(
            summary.to_string(),
            "Plan: 1 to create, 0 to update, 1 to replace, 1 to delete"
        );
    }
}
