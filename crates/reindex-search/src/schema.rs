//! Tantivy schema for rebuilt documents.

use tantivy::schema::{Field, Schema, STORED, STRING, TEXT};

use crate::SearchError;

/// Schema field handles for efficient access
#[derive(Debug, Clone)]
pub struct SearchSchema {
    schema: Schema,
    /// Primary key: source entity id (STRING | STORED)
    pub id: Field,
    /// Schema class of the source entity (STRING | STORED)
    pub class: Field,
    /// Display name (TEXT | STORED)
    pub name: Field,
    /// All textual field content (TEXT)
    pub body: Field,
    /// JSON encoding of the full document (STORED)
    pub payload: Field,
}

impl SearchSchema {
    /// Get the underlying Tantivy schema
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Create a SearchSchema from an existing Tantivy Schema
    pub fn from_schema(schema: Schema) -> Result<Self, SearchError> {
        let field = |name: &str| {
            schema
                .get_field(name)
                .map_err(|_| SearchError::SchemaMismatch(format!("missing {} field", name)))
        };

        Ok(Self {
            id: field("id")?,
            class: field("class")?,
            name: field("name")?,
            body: field("body")?,
            payload: field("payload")?,
            schema,
        })
    }
}

/// Build the document schema.
pub fn build_document_schema() -> SearchSchema {
    let mut schema_builder = Schema::builder();

    let id = schema_builder.add_text_field("id", STRING | STORED);
    let class = schema_builder.add_text_field("class", STRING | STORED);
    let name = schema_builder.add_text_field("name", TEXT | STORED);
    let body = schema_builder.add_text_field("body", TEXT);
    let payload = schema_builder.add_text_field("payload", STORED);

    let schema = schema_builder.build();

    SearchSchema {
        schema,
        id,
        class,
        name,
        body,
        payload,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_schema() {
        let schema = build_document_schema();
        assert!(schema.schema().get_field("id").is_ok());
        assert!(schema.schema().get_field("payload").is_ok());
    }

    #[test]
    fn test_from_schema() {
        let original = build_document_schema();
        let rebuilt = SearchSchema::from_schema(original.schema().clone()).unwrap();
        assert_eq!(rebuilt.id, original.id);
        assert_eq!(rebuilt.body, original.body);
    }

    #[test]
    fn test_from_foreign_schema_fails() {
        let mut builder = Schema::builder();
        builder.add_text_field("id", STRING);
        let result = SearchSchema::from_schema(builder.build());
        assert!(matches!(result, Err(SearchError::SchemaMismatch(_))));
    }
}
