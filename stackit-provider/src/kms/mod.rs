//! KMS resources and data sources

pub mod key;
pub mod keyring;
pub mod wrapping_key;

use stackit_core::schema::{AttributeSchema, AttributeType, Validator};

/// Default wait timeout of KMS operations, in minutes
pub(crate) const WAIT_TIMEOUT_MINUTES: u64 = 10;

pub(crate) fn display_name(kind: &str) -> AttributeSchema {
    AttributeSchema::new("display_name", AttributeType::String)
        .required()
        .requires_replace()
        .with_validator(Validator::LengthBetween(1, 64))
        .with_description(format!("The display name to distinguish multiple {}s.", kind))
}

pub(crate) fn description(kind: &str) -> AttributeSchema {
    AttributeSchema::new("description", AttributeType::String)
        .requires_replace()
        .with_validator(Validator::LengthBetween(0, 256))
        .with_description(format!("A user chosen description to distinguish multiple {}s.", kind))
}
