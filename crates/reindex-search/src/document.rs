//! Document mapping between rebuilt documents and Tantivy documents.

use tantivy::doc;
use tantivy::schema::Value;
use tantivy::TantivyDocument;

use reindex_types::Document;

use crate::error::SearchError;
use crate::schema::SearchSchema;

/// Convert a rebuilt document to a Tantivy document.
///
/// Name falls back to the id when the document has no text `name` field.
pub fn document_to_doc(
    schema: &SearchSchema,
    document: &Document,
) -> Result<TantivyDocument, SearchError> {
    let name = document.text("name").unwrap_or(&document.id).to_string();
    let payload = serde_json::to_string(document)?;

    Ok(doc!(
        schema.id => document.id.clone(),
        schema.class => document.class.clone(),
        schema.name => name,
        schema.body => document.full_text(),
        schema.payload => payload
    ))
}

/// Recover the rebuilt document from a stored Tantivy document.
pub fn document_from_doc(
    schema: &SearchSchema,
    doc: &TantivyDocument,
) -> Result<Document, SearchError> {
    let payload = doc
        .get_first(schema.payload)
        .and_then(|v| v.as_str())
        .ok_or_else(|| SearchError::SchemaMismatch("stored document has no payload".into()))?;
    Ok(serde_json::from_str(payload)?)
}
