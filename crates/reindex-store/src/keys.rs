//! Key encoding and decoding for the storage layer.
//!
//! Entity key format: `ent:{id}`
//! Class index key format: `cls:{class}:{id}`
//!
//! Class names may not contain `:` so that the `cls:{class}:` prefix of one
//! class never matches another class sharing a leading substring. Ids are
//! unrestricted.

use reindex_types::{EntityId, SchemaClass};

use crate::error::StorageError;

/// Key for an entity record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityKey {
    pub id: EntityId,
}

impl EntityKey {
    pub fn new(id: impl Into<EntityId>) -> Self {
        Self { id: id.into() }
    }

    /// Encode key to bytes for storage
    pub fn to_bytes(&self) -> Vec<u8> {
        format!("ent:{}", self.id).into_bytes()
    }

    /// Decode key from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StorageError> {
        let s = std::str::from_utf8(bytes)
            .map_err(|e| StorageError::Key(format!("Invalid UTF-8: {}", e)))?;
        let id = s
            .strip_prefix("ent:")
            .ok_or_else(|| StorageError::Key(format!("Invalid entity key format: {}", s)))?;
        Ok(Self::new(id))
    }
}

/// Key for a class index entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassIndexKey {
    pub class: SchemaClass,
    pub id: EntityId,
}

impl ClassIndexKey {
    /// Create a class index key, rejecting class names containing `:`.
    pub fn new(class: SchemaClass, id: EntityId) -> Result<Self, StorageError> {
        validate_class(&class)?;
        Ok(Self { class, id })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        format!("cls:{}:{}", self.class, self.id).into_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StorageError> {
        let s = std::str::from_utf8(bytes)
            .map_err(|e| StorageError::Key(format!("Invalid UTF-8: {}", e)))?;
        let rest = s
            .strip_prefix("cls:")
            .ok_or_else(|| StorageError::Key(format!("Invalid class index key: {}", s)))?;
        let (class, id) = rest
            .split_once(':')
            .ok_or_else(|| StorageError::Key(format!("Invalid class index key: {}", s)))?;
        Ok(Self {
            class: SchemaClass::from(class),
            id: EntityId::from(id),
        })
    }

    /// Prefix covering every entry of one class
    pub fn prefix(class: &SchemaClass) -> Result<Vec<u8>, StorageError> {
        validate_class(class)?;
        Ok(format!("cls:{}:", class).into_bytes())
    }

    /// Prefix covering the whole index
    pub fn all_prefix() -> Vec<u8> {
        b"cls:".to_vec()
    }
}

fn validate_class(class: &SchemaClass) -> Result<(), StorageError> {
    if class.as_str().is_empty() || class.as_str().contains(':') {
        return Err(StorageError::Key(format!(
            "Invalid class name: {:?}",
            class.as_str()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_key_roundtrip() {
        let key = EntityKey::new("R-HSA-109581");
        let bytes = key.to_bytes();
        assert_eq!(bytes, b"ent:R-HSA-109581");
        assert_eq!(EntityKey::from_bytes(&bytes).unwrap(), key);
    }

    #[test]
    fn test_class_key_id_may_contain_colons() {
        let key = ClassIndexKey::new("SmallMolecule".into(), "CHEBI:15377".into()).unwrap();
        let decoded = ClassIndexKey::from_bytes(&key.to_bytes()).unwrap();
        assert_eq!(decoded.class.as_str(), "SmallMolecule");
        assert_eq!(decoded.id.as_str(), "CHEBI:15377");
    }

    #[test]
    fn test_class_prefix_does_not_overlap() {
        let path = ClassIndexKey::prefix(&"Path".into()).unwrap();
        let key = ClassIndexKey::new("Pathway".into(), "1".into()).unwrap();
        assert!(!key.to_bytes().starts_with(&path));
    }

    #[test]
    fn test_invalid_class_rejected() {
        assert!(ClassIndexKey::new("a:b".into(), "1".into()).is_err());
        assert!(ClassIndexKey::prefix(&"".into()).is_err());
    }

    #[test]
    fn test_invalid_key_bytes() {
        assert!(EntityKey::from_bytes(b"cls:x").is_err());
        assert!(ClassIndexKey::from_bytes(b"cls:nocolon").is_err());
    }
}
