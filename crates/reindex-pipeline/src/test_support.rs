//! In-memory doubles for pipeline tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use reindex_types::{Document, Entity, EntityId, SchemaClass};

use crate::error::{SinkError, SourceError};
use crate::sink::{BulkSink, SinkQuery};
use crate::source::SourceProvider;

pub fn ids(raw: &[&str]) -> Vec<EntityId> {
    raw.iter().map(|s| EntityId::from(*s)).collect()
}

/// Source backed by a map, counting cache evictions.
#[derive(Default)]
pub struct MemorySource {
    entities: Mutex<BTreeMap<EntityId, Arc<Entity>>>,
    failing_classes: Mutex<HashSet<String>>,
    clears: AtomicU64,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entities(entities: Vec<Entity>) -> Self {
        let source = Self::new();
        for entity in entities {
            source.insert(entity);
        }
        source
    }

    pub fn insert(&self, entity: Entity) {
        self.entities
            .lock()
            .unwrap()
            .insert(entity.id.clone(), Arc::new(entity));
    }

    /// Make listing this class fail.
    pub fn fail_listing(&self, class: &str) {
        self.failing_classes.lock().unwrap().insert(class.to_string());
    }

    pub fn clear_count(&self) -> u64 {
        self.clears.load(Ordering::SeqCst)
    }
}

impl SourceProvider for MemorySource {
    fn list_identifiers(&self, class: &SchemaClass) -> Result<Vec<EntityId>, SourceError> {
        if self.failing_classes.lock().unwrap().contains(class.as_str()) {
            return Err(SourceError::Backend(format!("cannot list {}", class)));
        }
        Ok(self
            .entities
            .lock()
            .unwrap()
            .values()
            .filter(|e| &e.class == class)
            .map(|e| e.id.clone())
            .collect())
    }

    fn fetch_by_id(&self, id: &EntityId) -> Result<Option<Arc<Entity>>, SourceError> {
        Ok(self.entities.lock().unwrap().get(id).cloned())
    }

    fn clear_cache(&self) {
        self.clears.fetch_add(1, Ordering::SeqCst);
    }

    fn count_entries(&self, class: &SchemaClass) -> Result<u64, SourceError> {
        Ok(self.list_identifiers(class)?.len() as u64)
    }

    fn classes(&self) -> Result<Vec<SchemaClass>, SourceError> {
        let mut classes: Vec<SchemaClass> = self
            .entities
            .lock()
            .unwrap()
            .values()
            .map(|e| e.class.clone())
            .collect();
        classes.sort();
        classes.dedup();
        Ok(classes)
    }
}

/// Sink that keeps documents in memory, with failure injection.
#[derive(Default)]
pub struct MemorySink {
    pub documents: Mutex<HashMap<String, Document>>,
    pub committed: AtomicU64,
    pub rollbacks: AtomicU64,
    pub add_many_calls: AtomicU64,
    pub add_one_calls: AtomicU64,
    pub deletes: Mutex<Vec<SinkQuery>>,
    pub closed: AtomicBool,
    fail_batches: AtomicBool,
    fail_commit: AtomicBool,
    permanent_failures: Mutex<HashSet<String>>,
    transient_failures: Mutex<HashMap<String, u32>>,
    delay: Mutex<Option<Duration>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_batches(&self) {
        self.fail_batches.store(true, Ordering::SeqCst);
    }

    pub fn fail_commit(&self) {
        self.fail_commit.store(true, Ordering::SeqCst);
    }

    /// Every write of this id fails permanently.
    pub fn fail_permanently(&self, id: &str) {
        self.permanent_failures.lock().unwrap().insert(id.to_string());
    }

    /// The next `times` writes of this id fail transiently.
    pub fn fail_transiently(&self, id: &str, times: u32) {
        self.transient_failures
            .lock()
            .unwrap()
            .insert(id.to_string(), times);
    }

    /// Sleep this long inside every write call.
    pub fn slow_down(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.documents.lock().unwrap().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.documents.lock().unwrap().len()
    }

    fn pause(&self) {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
    }

    fn check(&self, id: &str) -> Result<(), SinkError> {
        if self.permanent_failures.lock().unwrap().contains(id) {
            return Err(SinkError::Permanent(format!("rejected {}", id)));
        }
        let mut transient = self.transient_failures.lock().unwrap();
        if let Some(remaining) = transient.get_mut(id) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(SinkError::Transient(format!("busy {}", id)));
            }
        }
        Ok(())
    }
}

impl BulkSink for MemorySink {
    fn delete_by_query(&self, query: &SinkQuery) -> Result<(), SinkError> {
        let mut documents = self.documents.lock().unwrap();
        match query {
            SinkQuery::All => documents.clear(),
            SinkQuery::Class(class) => documents.retain(|_, d| &d.class != class),
        }
        self.deletes.lock().unwrap().push(query.clone());
        Ok(())
    }

    fn add_one(&self, document: &Document) -> Result<(), SinkError> {
        self.add_one_calls.fetch_add(1, Ordering::SeqCst);
        self.pause();
        self.check(&document.id)?;
        self.documents
            .lock()
            .unwrap()
            .insert(document.id.clone(), document.clone());
        Ok(())
    }

    fn add_many(&self, documents: &[Document]) -> Result<(), SinkError> {
        self.add_many_calls.fetch_add(1, Ordering::SeqCst);
        self.pause();
        if self.fail_batches.load(Ordering::SeqCst) {
            return Err(SinkError::Transient("bulk endpoint unavailable".into()));
        }
        let permanent = self.permanent_failures.lock().unwrap();
        if let Some(doc) = documents.iter().find(|d| permanent.contains(&d.id)) {
            return Err(SinkError::Permanent(format!("batch rejected {}", doc.id)));
        }
        drop(permanent);
        let mut stored = self.documents.lock().unwrap();
        for document in documents {
            stored.insert(document.id.clone(), document.clone());
        }
        Ok(())
    }

    fn commit(&self) -> Result<(), SinkError> {
        if self.fail_commit.load(Ordering::SeqCst) {
            return Err(SinkError::Permanent("commit refused".into()));
        }
        self.committed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn rollback(&self) -> Result<(), SinkError> {
        self.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn close(&self) -> Result<(), SinkError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// Writer into a shared buffer that records when it is dropped.
#[derive(Clone, Default)]
pub struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
    dropped: Arc<AtomicBool>,
    fail: Arc<AtomicBool>,
    panic_on: Arc<Mutex<Option<String>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8(self.bytes.lock().unwrap().clone()).unwrap()
    }

    /// True once every clone handed to a writer has been dropped.
    pub fn is_closed(&self) -> bool {
        self.dropped.load(Ordering::SeqCst)
    }

    /// Make every later write fail.
    pub fn break_pipe(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    /// Panic inside the first write whose bytes contain `needle`.
    pub fn panic_once_on(&self, needle: &str) {
        *self.panic_on.lock().unwrap() = Some(needle.to_string());
    }

    pub fn writer(&self) -> Box<dyn Write + Send> {
        Box::new(BufferHandle(self.clone()))
    }
}

struct BufferHandle(SharedBuffer);

impl Write for BufferHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.0.fail.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"));
        }
        let mut panic_on = self.0.panic_on.lock().unwrap();
        if let Some(needle) = panic_on.as_deref() {
            if String::from_utf8_lossy(buf).contains(needle) {
                let needle = panic_on.take().unwrap();
                drop(panic_on);
                panic!("stream choked on {}", needle);
            }
        }
        drop(panic_on);
        self.0.bytes.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.0.fail.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"));
        }
        Ok(())
    }
}

impl Drop for BufferHandle {
    fn drop(&mut self) {
        self.0.dropped.store(true, Ordering::SeqCst);
    }
}
