//! Flat document type delivered to the sinks.
//!
//! A document is the denormalized projection of one entity: an id, the
//! schema class it came from, and a map of field name to scalar or list
//! value. Field order is stable so renderings are deterministic.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// A single field value: a scalar or an ordered list of strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            FieldValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// All values rendered as strings; scalars yield one element.
    pub fn to_strings(&self) -> Vec<String> {
        match self {
            FieldValue::List(items) => items.clone(),
            other => vec![other.to_string()],
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(s) => s.is_empty(),
            FieldValue::List(items) => items.is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Integer(i) => write!(f, "{}", i),
            FieldValue::Float(x) => write!(f, "{}", x),
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::List(items) => f.write_str(&items.join(", ")),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Integer(i)
    }
}

impl From<f64> for FieldValue {
    fn from(x: f64) -> Self {
        FieldValue::Float(x)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(items: Vec<String>) -> Self {
        FieldValue::List(items)
    }
}

/// Denormalized, flat record representing one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Identifier of the source entity
    pub id: String,

    /// Schema class of the source entity
    pub class: String,

    /// Field name -> value
    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,
}

impl Document {
    pub fn new(id: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            class: class.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field setter.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.set(name, value);
        self
    }

    /// Set a field, skipping empty values.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        let value = value.into();
        if !value.is_empty() {
            self.fields.insert(name.into(), value);
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Text value of a field, if it is a text field.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(FieldValue::as_text)
    }

    /// List value of a field, if it is a list field.
    pub fn list(&self, name: &str) -> Option<&[String]> {
        self.fields.get(name).and_then(FieldValue::as_list)
    }

    /// Case-insensitive containment test on a field.
    ///
    /// Text fields match on substring, list fields match if any item does.
    /// The pseudo-fields `id` and `class` are also recognised.
    pub fn field_contains(&self, name: &str, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        match name {
            "id" => return self.id.to_lowercase().contains(&needle),
            "class" => return self.class.to_lowercase().contains(&needle),
            _ => {}
        }
        self.fields.get(name).is_some_and(|value| {
            value
                .to_strings()
                .iter()
                .any(|v| v.to_lowercase().contains(&needle))
        })
    }

    /// Concatenation of all textual content, used as the full-text body.
    pub fn full_text(&self) -> String {
        self.fields
            .values()
            .filter(|v| matches!(v, FieldValue::Text(_) | FieldValue::List(_)))
            .flat_map(FieldValue::to_strings)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Serialize to JSON bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, DomainError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Deserialize from JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DomainError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
