//! # reindex-types
//!
//! Shared domain types for the graph reindexer.
//!
//! This crate defines the core data structures used throughout the system:
//! - Entities: records of the graph-backed source store
//! - Documents: flat, denormalized projections of entities ready for indexing
//! - Settings: layered configuration for a rebuild run

pub mod config;
pub mod document;
pub mod entity;
pub mod error;

pub use config::{
    ExportFieldMapping, ExportSettings, FilteredExportSettings, PipelineSettings, Settings,
};
pub use document::{Document, FieldValue};
pub use entity::{CrossReference, Entity, EntityId, EntityRef, SchemaClass};
pub use error::DomainError;
