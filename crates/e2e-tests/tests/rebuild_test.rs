//! End-to-end rebuild tests: graph store -> producer -> index worker -> Tantivy.

use std::sync::Arc;

use pretty_assertions::assert_eq;

use e2e_tests::{test_config, FaultyBuilder, TestHarness};
use reindex_pipeline::{
    BulkSink, DocumentBuilder, GraphDocumentBuilder, MissingReason, TantivySink,
};
use reindex_search::SearchIndexer;
use reindex_types::{Document, FieldValue, SchemaClass};

#[test]
fn test_full_rebuild_indexes_every_class() {
    let harness = TestHarness::seeded(20, 30);

    let report = harness.rebuild(test_config(), &[]);

    assert!(report.is_success(), "failures: {:?}", report.failures);
    let classes: Vec<&str> = report.classes.iter().map(|c| c.class.as_str()).collect();
    assert_eq!(classes, vec!["Pathway", "Reaction"]);
    assert_eq!(report.total_attempted(), 50);
    assert_eq!(report.total_indexed(), 50);
    assert_eq!(report.missing().count(), 0);

    let inspector = harness.inspector();
    assert_eq!(inspector.num_docs(), 50);
    assert_eq!(inspector.count_class("Pathway").unwrap(), 20);
    assert_eq!(inspector.count_class("Reaction").unwrap(), 30);
}

#[test]
fn test_rebuild_twice_gives_same_index() {
    let harness = TestHarness::seeded(5, 12);

    let first = harness.rebuild(test_config(), &[]);
    let doc_after_first = harness.inspector().get("p3").unwrap();
    let second = harness.rebuild(test_config(), &[]);

    assert_eq!(first.total_indexed(), second.total_indexed());
    let inspector = harness.inspector();
    assert_eq!(inspector.num_docs(), 17);
    assert_eq!(inspector.get("p3").unwrap(), doc_after_first);
}

#[test]
fn test_documents_carry_resolved_relations() {
    let harness = TestHarness::seeded(3, 7);
    harness.rebuild(test_config(), &["Pathway"]);

    let doc = harness.inspector().get("p1").unwrap().unwrap();
    assert_eq!(doc.class, "Pathway");
    assert_eq!(doc.text("name"), Some("Pathway 1"));
    assert_eq!(
        doc.list("hasEvent"),
        Some(&["Reaction 1".to_string(), "Reaction 4".to_string()][..])
    );
    assert_eq!(
        doc.list("cross_references"),
        Some(&["GO:0000001".to_string()][..])
    );
    assert_eq!(
        doc.get("species"),
        Some(&FieldValue::List(vec!["Mus musculus".into()]))
    );
}

#[test]
fn test_absent_and_panicking_ids_reported_missing() {
    let harness = TestHarness::seeded(4, 10);
    let graph: Arc<dyn DocumentBuilder> =
        Arc::new(GraphDocumentBuilder::new(harness.source()));
    let builder = FaultyBuilder::new(graph).absent("r2").panicking("r7");

    let report = harness
        .reindexer_with(test_config(), Arc::new(builder))
        .run(&[SchemaClass::from("Reaction")])
        .unwrap();

    let missing: Vec<(&str, MissingReason)> = report
        .missing()
        .map(|m| (m.id.as_str(), m.reason.clone()))
        .collect();
    assert_eq!(
        missing,
        vec![
            ("r2", MissingReason::Absent),
            ("r7", MissingReason::Panic("builder blew up on r7".into())),
        ]
    );
    assert!(report.is_success());
    assert_eq!(report.classes[0].indexed, 8);

    let inspector = harness.inspector();
    assert_eq!(inspector.num_docs(), 8);
    assert!(!inspector.contains("r2").unwrap());
    assert!(inspector.contains("r8").unwrap());
}

#[test]
fn test_without_clear_other_classes_survive() {
    let harness = TestHarness::seeded(4, 6);
    harness.rebuild(test_config(), &[]);

    let report = harness.rebuild(test_config().with_clear_first(false), &["Pathway"]);

    assert_eq!(report.total_indexed(), 4);
    let inspector = harness.inspector();
    assert_eq!(inspector.num_docs(), 10);
    assert_eq!(inspector.count_class("Reaction").unwrap(), 6);
}

#[test]
fn test_clearing_removes_stale_documents() {
    let harness = TestHarness::seeded(2, 2);
    let sink = TantivySink::new(SearchIndexer::new(&harness.open_index()).unwrap());
    sink.add_one(&Document::new("stale", "Pathway")).unwrap();
    sink.commit().unwrap();
    sink.close().unwrap();
    assert!(harness.inspector().contains("stale").unwrap());

    harness.rebuild(test_config(), &[]);

    let inspector = harness.inspector();
    assert!(!inspector.contains("stale").unwrap());
    assert_eq!(inspector.num_docs(), 4);
}

#[test]
fn test_unknown_and_invalid_classes() {
    let harness = TestHarness::seeded(2, 3);

    let report = harness.rebuild(
        test_config(),
        &["Pathway", "Bad:Class", "Complex", "Reaction"],
    );

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].class.as_deref(), Some("Bad:Class"));
    let complex = report
        .classes
        .iter()
        .find(|c| c.class == "Complex")
        .unwrap();
    assert_eq!(complex.attempted, 0);
    assert_eq!(harness.inspector().num_docs(), 5);
}

#[test]
fn test_cache_eviction_after_class() {
    let harness = TestHarness::seeded(3, 9);

    harness.rebuild(test_config().with_evict_after_class(false), &["Pathway"]);
    assert!(harness.store.cache_len() > 0);

    harness.rebuild(test_config(), &["Pathway"]);
    assert_eq!(harness.store.cache_len(), 0);
}
