//! Thread-safe record of ids that produced no document.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use reindex_types::{EntityId, SchemaClass};

use crate::error::BuildError;

/// Why an id produced no document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissingReason {
    /// The builder returned nothing
    Absent,
    /// Fetching the entity or a relation failed
    Fetch(String),
    /// The builder rejected the entity
    Build(String),
    /// The builder panicked
    Panic(String),
}

impl From<&BuildError> for MissingReason {
    fn from(err: &BuildError) -> Self {
        match err {
            BuildError::Source(e) => MissingReason::Fetch(e.to_string()),
            BuildError::Invalid(msg) => MissingReason::Build(msg.clone()),
        }
    }
}

impl fmt::Display for MissingReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingReason::Absent => f.write_str("absent"),
            MissingReason::Fetch(msg) => write!(f, "fetch failed: {}", msg),
            MissingReason::Build(msg) => write!(f, "build failed: {}", msg),
            MissingReason::Panic(msg) => write!(f, "builder panicked: {}", msg),
        }
    }
}

/// One id that was listed but produced no document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingEntity {
    pub id: EntityId,
    pub class: SchemaClass,
    pub reason: MissingReason,
}

/// Missing ids collected by every producer thread of one class.
#[derive(Debug, Default)]
pub struct MissingList {
    entries: Mutex<Vec<MissingEntity>>,
}

impl MissingList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, id: EntityId, class: SchemaClass, reason: MissingReason) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(MissingEntity { id, class, reason });
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take the collected entries, sorted by id.
    pub fn into_sorted(self) -> Vec<MissingEntity> {
        let mut entries = self
            .entries
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        entries.sort_by(|a, b| a.id.cmp(&b.id));
        entries
    }
}
