//! Persisted artifacts.
//!
//! Derived tables are written as parquet with compact column encodings
//! (`layout`), optionally split into shard directories (`parquet`), and
//! committed together under one output directory (`tables`).

mod error;
pub mod layout;
pub mod parquet;
mod tables;

pub use error::StorageError;
pub use layout::{downcast_int_type, float_fits_f32, BatchReader, ColumnData, TableLayout};
pub use self::parquet::{read_table, write_table, Compression, StorageOptions};
pub use tables::{
    aggregates_batch, fandom_counts_batch, load_fandom_work_counts,
    load_non_fandom_tag_aggregates, load_work_fandoms, work_fandoms_batch, work_tags_batch,
    write_artifacts, ArtifactEntry, ArtifactPaths, ArtifactSummary, ArtifactTables,
    FANDOM_WORKS_COUNT, NON_FANDOM_TAGS_AGG, WORKS_TAGS, WORKS_WITH_FANDOM,
};
