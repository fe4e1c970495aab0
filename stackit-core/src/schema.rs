//! Schema - Attribute schemas for resources and data sources
//!
//! Every resource declares its attributes with a type, a mode (required,
//! optional, computed) and validators. The host validates configuration
//! against the schema before any API call and uses `requires_replace` to
//! decide between in-place updates and replacement.

use std::fmt;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::ids::SEPARATOR;

/// Attribute type
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    String,
    Int,
    Bool,
    Float,
    List(Box<AttributeType>),
    Map(Box<AttributeType>),
    /// Nested object with its own attributes
    Object(Vec<AttributeSchema>),
}

impl AttributeType {
    pub fn list_of(inner: AttributeType) -> Self {
        AttributeType::List(Box::new(inner))
    }

    pub fn map_of(inner: AttributeType) -> Self {
        AttributeType::Map(Box::new(inner))
    }

    /// Check if a value conforms to this type
    pub fn validate(&self, value: &Value) -> Result<(), TypeError> {
        match (self, value) {
            (_, Value::Null) => Ok(()),
            (_, v) if is_deferred(v) => Ok(()),
            (AttributeType::String, Value::String(_)) => Ok(()),
            (AttributeType::Int, Value::Number(n)) if n.is_i64() => Ok(()),
            (AttributeType::Float, Value::Number(_)) => Ok(()),
            (AttributeType::Bool, Value::Bool(_)) => Ok(()),

            (AttributeType::List(inner), Value::Array(items)) => {
                for (i, item) in items.iter().enumerate() {
                    inner.validate(item).map_err(|e| TypeError::ListItemError {
                        index: i,
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            (AttributeType::Map(inner), Value::Object(map)) => {
                for (k, v) in map {
                    inner.validate(v).map_err(|e| TypeError::MapValueError {
                        key: k.clone(),
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            (AttributeType::Object(attributes), Value::Object(map)) => {
                for (k, v) in map {
                    let Some(schema) = attributes.iter().find(|a| &a.name == k) else {
                        return Err(TypeError::UnknownAttribute { name: k.clone() });
                    };
                    schema.validate_value(v).map_err(|e| TypeError::NestedError {
                        name: k.clone(),
                        inner: Box::new(e),
                    })?;
                }
                for schema in attributes {
                    if schema.is_required() && map.get(&schema.name).is_none_or(Value::is_null) {
                        return Err(TypeError::MissingRequired {
                            name: schema.name.clone(),
                        });
                    }
                }
                Ok(())
            }

            _ => Err(TypeError::TypeMismatch {
                expected: self.type_name(),
                got: json_type_name(value).to_string(),
            }),
        }
    }

    fn type_name(&self) -> String {
        match self {
            AttributeType::String => "String".to_string(),
            AttributeType::Int => "Int".to_string(),
            AttributeType::Bool => "Bool".to_string(),
            AttributeType::Float => "Float".to_string(),
            AttributeType::List(inner) => format!("List<{}>", inner.type_name()),
            AttributeType::Map(inner) => format!("Map<{}>", inner.type_name()),
            AttributeType::Object(_) => "Object".to_string(),
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// Interpolated references are resolved by the host at apply time
pub fn is_deferred(value: &Value) -> bool {
    matches!(value, Value::String(s) if s.starts_with("${") && s.ends_with('}'))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "Null",
        Value::Bool(_) => "Bool",
        Value::Number(n) if n.is_i64() => "Int",
        Value::Number(_) => "Float",
        Value::String(_) => "String",
        Value::Array(_) => "List",
        Value::Object(_) => "Object",
    }
}

/// Type error
#[derive(Debug, Clone, thiserror::Error)]
pub enum TypeError {
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("Attribute '{name}': {message}")]
    ValidationFailed { name: String, message: String },

    #[error("Required attribute '{name}' is missing")]
    MissingRequired { name: String },

    #[error("Attribute '{name}' is computed and cannot be configured")]
    ComputedNotConfigurable { name: String },

    #[error("Unknown attribute '{name}'")]
    UnknownAttribute { name: String },

    #[error("List item at index {index}: {inner}")]
    ListItemError { index: usize, inner: Box<TypeError> },

    #[error("Map value for key '{key}': {inner}")]
    MapValueError { key: String, inner: Box<TypeError> },

    #[error("Attribute '{name}': {inner}")]
    NestedError { name: String, inner: Box<TypeError> },
}

/// Value validators
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Validator {
    /// RFC 4122 UUID
    Uuid,
    /// Must not contain the composite id separator
    NoSeparator,
    LengthBetween(usize, usize),
    LengthAtLeast(usize),
    OneOf(Vec<String>),
    Pattern { regex: String, message: String },
    IntAtLeast(i64),
    IntBetween(i64, i64),
}

impl Validator {
    pub fn one_of(values: &[&str]) -> Self {
        Validator::OneOf(values.iter().map(|s| s.to_string()).collect())
    }

    pub fn pattern(regex: &str, message: &str) -> Self {
        Validator::Pattern {
            regex: regex.to_string(),
            message: message.to_string(),
        }
    }

    pub fn check(&self, value: &Value) -> Result<(), String> {
        match (self, value) {
            (Validator::Uuid, Value::String(s)) => uuid::Uuid::parse_str(s)
                .map(|_| ())
                .map_err(|_| format!("value must be an UUID, got {}", s)),
            (Validator::NoSeparator, Value::String(s)) => {
                if s.contains(SEPARATOR) {
                    Err(format!("value must not contain '{}'", SEPARATOR))
                } else {
                    Ok(())
                }
            }
            (Validator::LengthBetween(min, max), Value::String(s)) => {
                let len = s.chars().count();
                if len < *min || len > *max {
                    Err(format!(
                        "string length must be between {} and {}, got: {}",
                        min, max, len
                    ))
                } else {
                    Ok(())
                }
            }
            (Validator::LengthAtLeast(min), Value::String(s)) => {
                let len = s.chars().count();
                if len < *min {
                    Err(format!("string length must be at least {}, got: {}", min, len))
                } else {
                    Ok(())
                }
            }
            (Validator::OneOf(allowed), Value::String(s)) => {
                if allowed.iter().any(|a| a == s) {
                    Ok(())
                } else {
                    Err(format!(
                        "value must be one of: {}, got: {}",
                        allowed.join(", "),
                        s
                    ))
                }
            }
            (Validator::Pattern { regex, message }, Value::String(s)) => {
                let re = Regex::new(regex).map_err(|e| format!("invalid pattern: {}", e))?;
                if re.is_match(s) {
                    Ok(())
                } else {
                    Err(message.clone())
                }
            }
            (Validator::IntAtLeast(min), Value::Number(n)) => match n.as_i64() {
                Some(v) if v >= *min => Ok(()),
                _ => Err(format!("value must be at least {}, got: {}", min, n)),
            },
            (Validator::IntBetween(min, max), Value::Number(n)) => match n.as_i64() {
                Some(v) if v >= *min && v <= *max => Ok(()),
                _ => Err(format!("value must be between {} and {}, got: {}", min, max, n)),
            },
            // Type mismatches are reported by the type check
            _ => Ok(()),
        }
    }
}

/// How an attribute is populated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeMode {
    Required,
    Optional,
    /// Populated only from API responses
    Computed,
    /// Configurable, filled from the API when unset
    OptionalComputed,
}

/// Attribute schema
#[derive(Debug, Clone, Serialize)]
pub struct AttributeSchema {
    pub name: String,
    pub attr_type: AttributeType,
    pub mode: AttributeMode,
    pub sensitive: bool,
    /// Changing this attribute forces the resource to be replaced
    pub requires_replace: bool,
    /// Only sent on create, never returned by the API
    pub write_only: bool,
    pub description: Option<String>,
    pub validators: Vec<Validator>,
}

impl AttributeSchema {
    pub fn new(name: impl Into<String>, attr_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attr_type,
            mode: AttributeMode::Optional,
            sensitive: false,
            requires_replace: false,
            write_only: false,
            description: None,
            validators: Vec::new(),
        }
    }

    pub fn required(mut self) -> Self {
        self.mode = AttributeMode::Required;
        self
    }

    pub fn computed(mut self) -> Self {
        self.mode = AttributeMode::Computed;
        self
    }

    pub fn optional_computed(mut self) -> Self {
        self.mode = AttributeMode::OptionalComputed;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn requires_replace(mut self) -> Self {
        self.requires_replace = true;
        self
    }

    pub fn write_only(mut self) -> Self {
        self.write_only = true;
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn is_required(&self) -> bool {
        self.mode == AttributeMode::Required
    }

    pub fn is_computed(&self) -> bool {
        matches!(
            self.mode,
            AttributeMode::Computed | AttributeMode::OptionalComputed
        )
    }

    pub fn is_configurable(&self) -> bool {
        self.mode != AttributeMode::Computed
    }

    fn validate_value(&self, value: &Value) -> Result<(), TypeError> {
        self.attr_type.validate(value)?;
        if value.is_null() || is_deferred(value) {
            return Ok(());
        }
        for validator in &self.validators {
            validator
                .check(value)
                .map_err(|message| TypeError::ValidationFailed {
                    name: self.name.clone(),
                    message,
                })?;
        }
        Ok(())
    }
}

/// Resource or data source schema
#[derive(Debug, Clone, Serialize)]
pub struct ResourceSchema {
    pub type_name: String,
    pub description: Option<String>,
    pub attributes: Vec<AttributeSchema>,
}

impl ResourceSchema {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            description: None,
            attributes: Vec::new(),
        }
    }

    pub fn attribute(mut self, schema: AttributeSchema) -> Self {
        self.attributes.retain(|a| a.name != schema.name);
        self.attributes.push(schema);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&AttributeSchema> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Names of attributes whose change forces replacement
    pub fn requires_replace_attributes(&self) -> Vec<&str> {
        self.attributes
            .iter()
            .filter(|a| a.requires_replace)
            .map(|a| a.name.as_str())
            .collect()
    }

    /// Derive a data source schema: `keys` stay required, everything else is computed
    pub fn as_data_source(&self, type_name: impl Into<String>, keys: &[&str]) -> ResourceSchema {
        let attributes = self
            .attributes
            .iter()
            .cloned()
            .map(|mut a| {
                a.requires_replace = false;
                if keys.contains(&a.name.as_str()) {
                    // region-like keys keep their provider default
                    if a.mode != AttributeMode::OptionalComputed {
                        a.mode = AttributeMode::Required;
                    }
                } else {
                    a.mode = AttributeMode::Computed;
                    a.validators.clear();
                }
                a
            })
            .collect();
        ResourceSchema {
            type_name: type_name.into(),
            description: self.description.clone(),
            attributes,
        }
    }

    /// Validate a configuration object
    pub fn validate(&self, config: &Value) -> Result<(), Vec<TypeError>> {
        let mut errors = Vec::new();

        let empty = serde_json::Map::new();
        let attributes = match config {
            Value::Object(map) => map,
            Value::Null => &empty,
            other => {
                return Err(vec![TypeError::TypeMismatch {
                    expected: "Object".to_string(),
                    got: json_type_name(other).to_string(),
                }]);
            }
        };

        // Check required attributes
        for schema in &self.attributes {
            if schema.is_required() && attributes.get(&schema.name).is_none_or(Value::is_null) {
                errors.push(TypeError::MissingRequired {
                    name: schema.name.clone(),
                });
            }
        }

        for (name, value) in attributes {
            match self.get(name) {
                None => errors.push(TypeError::UnknownAttribute { name: name.clone() }),
                Some(schema) if !schema.is_configurable() && !value.is_null() => {
                    errors.push(TypeError::ComputedNotConfigurable { name: name.clone() })
                }
                Some(schema) => {
                    if let Err(e) = schema.validate_value(value) {
                        errors.push(e);
                    }
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Helpers for attributes every resource repeats
pub mod common {
    use super::*;

    /// The synthesized composite `id`
    pub fn id(parts: &[&str]) -> AttributeSchema {
        AttributeSchema::new("id", AttributeType::String)
            .computed()
            .with_description(format!(
                "Terraform's internal resource identifier. It is structured as \"{}\".",
                parts
                    .iter()
                    .map(|p| format!("`{}`", p))
                    .collect::<Vec<_>>()
                    .join(SEPARATOR)
            ))
    }

    /// STACKIT project id
    pub fn project_id() -> AttributeSchema {
        uuid_key("project_id", "STACKIT project ID to which the resource is associated.")
    }

    /// Required UUID that forces replacement
    pub fn uuid_key(name: &str, description: &str) -> AttributeSchema {
        AttributeSchema::new(name, AttributeType::String)
            .required()
            .requires_replace()
            .with_validator(Validator::Uuid)
            .with_validator(Validator::NoSeparator)
            .with_description(description)
    }

    /// Computed UUID assigned by the API
    pub fn computed_id(name: &str, description: &str) -> AttributeSchema {
        AttributeSchema::new(name, AttributeType::String)
            .computed()
            .with_description(description)
    }

    /// Region override, defaults to the provider region
    pub fn region() -> AttributeSchema {
        AttributeSchema::new("region", AttributeType::String)
            .optional_computed()
            .requires_replace()
            .with_validator(Validator::NoSeparator)
            .with_description("The resource region. If not defined, the provider region is used.")
    }

    /// Labels / tags as a string map
    pub fn labels(description: &str) -> AttributeSchema {
        AttributeSchema::new("labels", AttributeType::map_of(AttributeType::String))
            .with_description(description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn keyring_schema() -> ResourceSchema {
        ResourceSchema::new("stackit_kms_keyring")
            .attribute(common::id(&["project_id", "region", "keyring_id"]))
            .attribute(common::project_id())
            .attribute(common::region())
            .attribute(
                AttributeSchema::new("display_name", AttributeType::String)
                    .required()
                    .with_validator(Validator::LengthBetween(1, 64)),
            )
            .attribute(common::computed_id("keyring_id", "The key ring ID."))
    }

    #[test]
    fn validate_string_type() {
        let t = AttributeType::String;
        assert!(t.validate(&json!("hello")).is_ok());
        assert!(t.validate(&json!(42)).is_err());
        assert!(t.validate(&Value::Null).is_ok());
    }

    #[test]
    fn validate_nested_list_of_objects() {
        let t = AttributeType::list_of(AttributeType::Object(vec![
            AttributeSchema::new("name", AttributeType::String).required(),
            AttributeSchema::new("minimum", AttributeType::Int),
        ]));
        assert!(t.validate(&json!([{"name": "pool", "minimum": 1}])).is_ok());
        assert!(t.validate(&json!([{"minimum": 1}])).is_err());
        assert!(t.validate(&json!([{"name": "pool", "other": 1}])).is_err());
    }

    #[test]
    fn validate_config_accepts_valid_keyring() {
        let config = json!({
            "project_id": "d6e7a4a6-2a3b-4a8e-9f6e-7a1b2c3d4e5f",
            "display_name": "main",
        });
        assert!(keyring_schema().validate(&config).is_ok());
    }

    #[test]
    fn validate_config_reports_every_problem() {
        let config = json!({
            "project_id": "not-a-uuid",
            "keyring_id": "set-by-user",
            "colour": "blue",
        });
        let errors = keyring_schema().validate(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.iter().any(|e| matches!(e, TypeError::MissingRequired { name } if name == "display_name")));
        assert!(errors.iter().any(|e| matches!(e, TypeError::ValidationFailed { name, .. } if name == "project_id")));
        assert!(errors.iter().any(|e| matches!(e, TypeError::ComputedNotConfigurable { .. })));
        assert!(errors.iter().any(|e| matches!(e, TypeError::UnknownAttribute { .. })));
    }

    #[test]
    fn deferred_references_skip_validators() {
        let config = json!({
            "project_id": "${stackit_resourcemanager_project.main.project_id}",
            "display_name": "main",
        });
        assert!(keyring_schema().validate(&config).is_ok());
    }

    #[test]
    fn validators() {
        assert!(Validator::NoSeparator.check(&json!("a,b")).is_err());
        assert!(Validator::NoSeparator.check(&json!("ab")).is_ok());
        assert!(Validator::LengthBetween(1, 3).check(&json!("")).is_err());
        assert!(Validator::LengthBetween(1, 3).check(&json!("abc")).is_ok());
        assert!(Validator::one_of(&["a", "b"]).check(&json!("c")).is_err());
        assert!(Validator::IntBetween(1, 3).check(&json!(4)).is_err());
        assert!(Validator::IntAtLeast(1).check(&json!(1)).is_ok());
        assert!(
            Validator::pattern(r"^[a-z]+$", "lowercase only")
                .check(&json!("ABC"))
                .is_err()
        );
    }

    #[test]
    fn data_source_schema_marks_keys_required() {
        let ds = keyring_schema().as_data_source("stackit_kms_keyring", &["project_id", "keyring_id"]);
        assert!(ds.get("keyring_id").unwrap().is_required());
        assert!(ds.get("project_id").unwrap().is_required());
        assert_eq!(ds.get("display_name").unwrap().mode, AttributeMode::Computed);
        assert!(ds.requires_replace_attributes().is_empty());
    }
}
