//! Document builder for graph store entities.
//!
//! Flattens one entity into a [`Document`]:
//! - `name` from the entity's display name
//! - one field per property (arrays become string lists, objects JSON text)
//! - one list field per relation, holding the names of the related entities
//! - encoded cross-references under a configurable field
//!
//! Relation targets are fetched through the source, so building a class
//! warms the source cache with its neighbours.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use reindex_types::{CrossReference, Document, Entity, EntityId, FieldValue};

use crate::error::BuildError;
use crate::source::{DocumentBuilder, SourceProvider};

/// Field names a property or relation may not overwrite.
const RESERVED_FIELDS: &[&str] = &["id", "class", "name"];

pub struct GraphDocumentBuilder {
    source: Arc<dyn SourceProvider>,
    cross_reference_field: String,
}

impl GraphDocumentBuilder {
    pub fn new(source: Arc<dyn SourceProvider>) -> Self {
        Self {
            source,
            cross_reference_field: "cross_references".to_string(),
        }
    }

    pub fn with_cross_reference_field(mut self, field: impl Into<String>) -> Self {
        self.cross_reference_field = field.into();
        self
    }

    fn related_names(&self, targets: &[EntityId]) -> Result<Vec<String>, BuildError> {
        let mut names = Vec::with_capacity(targets.len());
        for target in targets {
            match self.source.fetch_by_id(target)? {
                Some(related) if !related.name.is_empty() => names.push(related.name.clone()),
                Some(related) => names.push(related.id.to_string()),
                None => debug!(target = %target, "Dangling relation target"),
            }
        }
        Ok(names)
    }

    fn flatten(&self, entity: &Entity) -> Result<Document, BuildError> {
        let mut document = Document::new(entity.id.as_str(), entity.class.as_str());
        document.set("name", entity.name.as_str());

        for (key, value) in &entity.properties {
            if RESERVED_FIELDS.contains(&key.as_str()) {
                continue;
            }
            if let Some(value) = property_value(value) {
                document.set(key.as_str(), value);
            }
        }

        for (relation, targets) in &entity.relations {
            if RESERVED_FIELDS.contains(&relation.as_str()) {
                continue;
            }
            document.set(relation.as_str(), self.related_names(targets)?);
        }

        let xrefs: Vec<String> = entity
            .cross_references
            .iter()
            .map(CrossReference::encode)
            .collect();
        document.set(self.cross_reference_field.as_str(), xrefs);

        Ok(document)
    }
}

impl DocumentBuilder for GraphDocumentBuilder {
    fn build(&self, id: &EntityId) -> Result<Option<Document>, BuildError> {
        let Some(entity) = self.source.fetch_by_id(id)? else {
            return Ok(None);
        };
        if &entity.id != id {
            return Err(BuildError::Invalid(format!(
                "store returned entity {} for id {}",
                entity.id, id
            )));
        }
        self.flatten(&entity).map(Some)
    }
}

fn property_value(value: &Value) -> Option<FieldValue> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(FieldValue::Bool(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Some(FieldValue::Integer(i)),
            None => n.as_f64().map(FieldValue::Float),
        },
        Value::String(s) => Some(FieldValue::Text(s.clone())),
        Value::Array(items) => Some(FieldValue::List(
            items
                .iter()
                .filter(|v| !v.is_null())
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
        )),
        Value::Object(_) => Some(FieldValue::Text(value.to_string())),
    }
}
