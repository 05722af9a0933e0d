//! Pipeline error types.

use std::path::PathBuf;

use thiserror::Error;

use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV error in {table} table: {source}")]
    Csv {
        table: &'static str,
        #[source]
        source: csv::Error,
    },
    #[error("{table} table is missing required column '{column}'")]
    MissingColumn {
        table: &'static str,
        column: &'static str,
    },
    #[error("{table} table line {line}: invalid {column} value '{value}'")]
    InvalidValue {
        table: &'static str,
        line: u64,
        column: &'static str,
        value: String,
    },
    #[error("Minimum work count must not be negative (got {0})")]
    InvalidThreshold(i64),
    #[error("Tag id {0} appears more than once in the tags table")]
    DuplicateTagId(i64),
    #[error("Tag {tag_id} merges into {merger_id}, which matches {matches} tag rows")]
    AmbiguousMerger {
        tag_id: i64,
        merger_id: i64,
        matches: usize,
    },
    #[error("Work id {0} appears more than once in the works table")]
    DuplicateWorkId(i64),
    #[error("Partition count must be at least 1")]
    InvalidPartitions,
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl PipelineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
