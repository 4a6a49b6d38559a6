//! Column family definitions for RocksDB.
//!
//! - entities: entity records keyed by id (point lookups, Zstd compressed)
//! - class_index: empty-valued `{class}:{id}` keys for per-class scans

use rocksdb::{ColumnFamilyDescriptor, Options};

/// Column family name for entity records
pub const CF_ENTITIES: &str = "entities";

/// Column family name for the class -> id index
pub const CF_CLASS_INDEX: &str = "class_index";

/// All column family names
pub const ALL_CF_NAMES: &[&str] = &[CF_ENTITIES, CF_CLASS_INDEX];

fn entities_options() -> Options {
    let mut opts = Options::default();
    opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
    opts
}

/// Build all column family descriptors
pub fn build_cf_descriptors() -> Vec<ColumnFamilyDescriptor> {
    vec![
        ColumnFamilyDescriptor::new(CF_ENTITIES, entities_options()),
        ColumnFamilyDescriptor::new(CF_CLASS_INDEX, Options::default()),
    ]
}
