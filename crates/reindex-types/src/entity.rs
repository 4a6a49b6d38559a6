//! Entity types for the graph-backed source store.
//!
//! An entity is one domain record. Its relations point at other entities by
//! identifier and are resolved lazily by whoever reads them.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Source-side identifier of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Schema class tag (e.g. "Pathway", "Reaction").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaClass(String);

impl SchemaClass {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SchemaClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SchemaClass {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SchemaClass {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// An identifier together with the class it was enumerated under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityRef {
    pub id: EntityId,
    pub class: SchemaClass,
}

impl EntityRef {
    pub fn new(id: impl Into<EntityId>, class: impl Into<SchemaClass>) -> Self {
        Self {
            id: id.into(),
            class: class.into(),
        }
    }
}

/// Link from an entity to a record in an external database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossReference {
    /// External database name (e.g. "UniProt")
    pub db_name: String,
    /// Key of the record in that database
    pub db_key: String,
}

impl CrossReference {
    pub fn new(db_name: impl Into<String>, db_key: impl Into<String>) -> Self {
        Self {
            db_name: db_name.into(),
            db_key: db_key.into(),
        }
    }

    /// Encode as `dbname:dbkey` for storage in a flat document list field.
    pub fn encode(&self) -> String {
        format!("{}:{}", self.db_name, self.db_key)
    }

    /// Parse a `dbname:dbkey` value. The key may itself contain colons.
    pub fn parse(s: &str) -> Option<Self> {
        let (db_name, db_key) = s.split_once(':')?;
        if db_name.is_empty() || db_key.is_empty() {
            return None;
        }
        Some(Self::new(db_name, db_key))
    }
}

/// A record of the graph-backed source store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Unique identifier
    pub id: EntityId,

    /// Schema class this entity belongs to
    pub class: SchemaClass,

    /// Display name
    pub name: String,

    /// Scalar or array properties
    #[serde(default)]
    pub properties: BTreeMap<String, serde_json::Value>,

    /// Named relations to other entities
    #[serde(default)]
    pub relations: BTreeMap<String, Vec<EntityId>>,

    /// Links to external databases
    #[serde(default)]
    pub cross_references: Vec<CrossReference>,
}

impl Entity {
    pub fn new(
        id: impl Into<EntityId>,
        class: impl Into<SchemaClass>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            class: class.into(),
            name: name.into(),
            properties: BTreeMap::new(),
            relations: BTreeMap::new(),
            cross_references: Vec::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    pub fn with_relation(mut self, name: impl Into<String>, targets: Vec<EntityId>) -> Self {
        self.relations.insert(name.into(), targets);
        self
    }

    pub fn with_cross_reference(mut self, xref: CrossReference) -> Self {
        self.cross_references.push(xref);
        self
    }

    pub fn entity_ref(&self) -> EntityRef {
        EntityRef::new(self.id.clone(), self.class.clone())
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

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_entity_serialization() {
        let entity = Entity::new("R-HSA-1", "Pathway", "Apoptosis")
            .with_property("species", serde_json::json!("Homo sapiens"))
            .with_relation("hasEvent", vec![EntityId::from("R-HSA-2")])
            .with_cross_reference(CrossReference::new("GO", "0006915"));

        let bytes = entity.to_bytes().unwrap();
        let decoded = Entity::from_bytes(&bytes).unwrap();

        assert_eq!(entity, decoded);
    }

    #[test]
    fn test_entity_defaults_missing_collections() {
        let json = r#"{"id":"x","class":"Complex","name":"X"}"#;
        let entity = Entity::from_bytes(json.as_bytes()).unwrap();
        assert!(entity.properties.is_empty());
        assert!(entity.relations.is_empty());
        assert!(entity.cross_references.is_empty());
    }

    #[test]
    fn test_cross_reference_parse() {
        let xref = CrossReference::parse("ChEBI:CHEBI:15377").unwrap();
        assert_eq!(xref.db_name, "ChEBI");
        assert_eq!(xref.db_key, "CHEBI:15377");
        assert_eq!(xref.encode(), "ChEBI:CHEBI:15377");

        assert!(CrossReference::parse("no-separator").is_none());
        assert!(CrossReference::parse(":key").is_none());
    }

    #[test]
    fn test_id_display() {
        assert_eq!(EntityId::from("abc").to_string(), "abc");
        assert_eq!(SchemaClass::from("Pathway").as_str(), "Pathway");
    }
}
