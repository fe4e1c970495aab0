//! Types - Typed attribute values with null/unknown tracking
//!
//! Every model field is an `Attr<T>`. A configuration may leave an attribute
//! unset (null) or depend on a value that is not known until apply (unknown).
//! Payload builders treat both as "absent".

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Attribute value as seen by the provider
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Attr<T> {
    #[default]
    Null,
    Unknown,
    Known(T),
}

impl<T> Attr<T> {
    pub fn known(value: impl Into<T>) -> Self {
        Attr::Known(value.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Attr::Null)
    }

    pub fn is_null_or_unknown(&self) -> bool {
        !self.is_known()
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Attr::Known(_))
    }

    /// Borrow the value if it is known
    pub fn value(&self) -> Option<&T> {
        match self {
            Attr::Known(v) => Some(v),
            _ => None,
        }
    }

    /// `None` becomes null
    pub fn from_option(value: Option<T>) -> Self {
        match value {
            Some(v) => Attr::Known(v),
            None => Attr::Null,
        }
    }

    pub fn as_ref(&self) -> Attr<&T> {
        match self {
            Attr::Null => Attr::Null,
            Attr::Unknown => Attr::Unknown,
            Attr::Known(v) => Attr::Known(v),
        }
    }
}

impl<T: Clone> Attr<T> {
    /// Clone the known value into an `Option`, dropping null and unknown
    pub fn to_option(&self) -> Option<T> {
        self.value().cloned()
    }
}

impl Attr<String> {
    pub fn as_str(&self) -> Option<&str> {
        self.value().map(String::as_str)
    }

    /// Known value or the empty string
    pub fn value_string(&self) -> String {
        self.to_option().unwrap_or_default()
    }
}

impl From<&str> for Attr<String> {
    fn from(value: &str) -> Self {
        Attr::Known(value.to_string())
    }
}

impl From<String> for Attr<String> {
    fn from(value: String) -> Self {
        Attr::Known(value)
    }
}

impl<T> From<Option<T>> for Attr<T> {
    fn from(value: Option<T>) -> Self {
        Attr::from_option(value)
    }
}

impl<T: Serialize> Serialize for Attr<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            // State never holds unknown values
            Attr::Null | Attr::Unknown => serializer.serialize_none(),
            Attr::Known(v) => v.serialize(serializer),
        }
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Attr<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<T>::deserialize(deserializer).map(Attr::from_option)
    }
}

pub type StringAttr = Attr<String>;
pub type BoolAttr = Attr<bool>;
pub type IntAttr = Attr<i64>;
pub type FloatAttr = Attr<f64>;
pub type ListAttr<T> = Attr<Vec<T>>;
pub type MapAttr<T> = Attr<BTreeMap<String, T>>;

/// Convert a list attribute of strings to a plain vector, treating null as empty
pub fn string_list(attr: &ListAttr<String>) -> Vec<String> {
    attr.to_option().unwrap_or_default()
}

/// Empty collections from the API become null unless the model already held an empty list
pub fn list_from_api<T: Clone>(current: &ListAttr<T>, api: Option<&[T]>) -> ListAttr<T> {
    match api {
        Some(items) if !items.is_empty() => Attr::Known(items.to_vec()),
        _ => match current {
            Attr::Known(v) if v.is_empty() => Attr::Known(Vec::new()),
            _ => Attr::Null,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
    #[serde(default)]
    struct Model {
        name: StringAttr,
        size: IntAttr,
        labels: MapAttr<String>,
    }

    #[test]
    fn missing_and_null_fields_deserialize_as_null() {
        let model: Model = serde_json::from_value(json!({"name": null})).unwrap();
        assert!(model.name.is_null());
        assert!(model.size.is_null());
        assert!(model.labels.is_null());
    }

    #[test]
    fn known_values_serialize_plainly() {
        let model = Model {
            name: Attr::known("db"),
            size: Attr::Known(3),
            labels: Attr::Null,
        };
        assert_eq!(
            serde_json::to_value(&model).unwrap(),
            json!({"name": "db", "size": 3, "labels": null})
        );
    }

    #[test]
    fn unknown_is_not_persisted() {
        let attr: IntAttr = Attr::Unknown;
        assert_eq!(serde_json::to_value(&attr).unwrap(), json!(null));
        assert!(attr.to_option().is_none());
        assert!(attr.is_null_or_unknown());
    }

    #[test]
    fn list_from_api_keeps_explicit_empty_list() {
        let current: ListAttr<String> = Attr::Known(vec![]);
        assert_eq!(list_from_api(&current, Some(&[])), Attr::Known(vec![]));
        assert_eq!(list_from_api::<String>(&Attr::Null, None), Attr::Null);
        assert_eq!(
            list_from_api(&Attr::Null, Some(&["a".to_string()])),
            Attr::Known(vec!["a".to_string()])
        );
    }
}
