//! Storage error types.

use std::path::PathBuf;

use arrow::error::ArrowError;
use parquet::errors::ParquetError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),
    #[error("Parquet error: {0}")]
    Parquet(#[from] ParquetError),
    #[error("Manifest error: {0}")]
    Manifest(#[from] serde_json::Error),
    #[error("Artifact not found: {0}")]
    NotFound(PathBuf),
    #[error("{table} artifact has no column '{column}'")]
    MissingColumn { table: String, column: String },
    #[error("{table} artifact column '{column}' cannot be read as {expected}")]
    UnexpectedType {
        table: String,
        column: String,
        expected: &'static str,
    },
    #[error("{table} artifact column '{column}' has a null at row {row}")]
    UnexpectedNull {
        table: String,
        column: String,
        row: usize,
    },
    #[error("Columns of {table} have different lengths")]
    RaggedColumns { table: String },
    #[error("Shard count must be at least 1")]
    InvalidShards,
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
