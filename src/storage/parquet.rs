//! Parquet files and shard directories.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use arrow::compute::concat_batches;
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression as ParquetCompression, ZstdLevel};
use parquet::file::properties::WriterProperties;

use super::StorageError;

/// Compression codec for written artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    #[default]
    Snappy,
    Zstd,
    Uncompressed,
}

impl Compression {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Snappy => "snappy",
            Self::Zstd => "zstd",
            Self::Uncompressed => "uncompressed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "snappy" => Some(Self::Snappy),
            "zstd" => Some(Self::Zstd),
            "uncompressed" | "none" => Some(Self::Uncompressed),
            _ => None,
        }
    }

    fn codec(&self) -> ParquetCompression {
        match self {
            Self::Snappy => ParquetCompression::SNAPPY,
            Self::Zstd => ParquetCompression::ZSTD(ZstdLevel::default()),
            Self::Uncompressed => ParquetCompression::UNCOMPRESSED,
        }
    }
}

/// How artifacts are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageOptions {
    pub compression: Compression,
    /// Files per table. Above one, a table becomes a directory of parts.
    pub shards: usize,
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            compression: Compression::Snappy,
            shards: 1,
        }
    }
}

/// Write one batch to a single parquet file. Returns the file size.
pub fn write_parquet_file(
    path: &Path,
    batch: &RecordBatch,
    compression: Compression,
) -> Result<u64, StorageError> {
    let file = File::create(path).map_err(|e| StorageError::io(path, e))?;
    let props = WriterProperties::builder()
        .set_compression(compression.codec())
        .build();

    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
    writer.write(batch)?;
    writer.close()?;

    let size = fs::metadata(path).map_err(|e| StorageError::io(path, e))?.len();
    Ok(size)
}

/// Name of the `index`th shard file.
pub fn shard_file_name(index: usize) -> String {
    format!("part-{:05}.parquet", index)
}

/// Write a table as one file, or as `shards` near-equal parts in a directory
/// at `path`. Returns the total bytes written.
pub fn write_table(
    path: &Path,
    batch: &RecordBatch,
    options: &StorageOptions,
) -> Result<u64, StorageError> {
    match options.shards {
        0 => Err(StorageError::InvalidShards),
        1 => write_parquet_file(path, batch, options.compression),
        shards => {
            fs::create_dir_all(path).map_err(|e| StorageError::io(path, e))?;
            let rows = batch.num_rows();
            let base = rows / shards;
            let extra = rows % shards;

            let mut offset = 0;
            let mut bytes = 0;
            for i in 0..shards {
                let len = base + usize::from(i < extra);
                let part = batch.slice(offset, len);
                let part_path = path.join(shard_file_name(i));
                bytes += write_parquet_file(&part_path, &part, options.compression)?;
                offset += len;
            }
            Ok(bytes)
        }
    }
}

/// Shard files in a table directory, in part order.
fn shard_files(dir: &Path) -> Result<Vec<PathBuf>, StorageError> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| StorageError::io(dir, e))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("part-") && n.ends_with(".parquet"))
        })
        .collect();
    files.sort();
    Ok(files)
}

fn read_parquet_file(path: &Path) -> Result<RecordBatch, StorageError> {
    let file = File::open(path).map_err(|e| StorageError::io(path, e))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let schema = builder.schema().clone();
    let batches = builder.build()?.collect::<Result<Vec<_>, _>>()?;
    Ok(concat_batches(&schema, &batches)?)
}

/// Read a table written by [`write_table`], whether a single file or a shard
/// directory, as one batch.
pub fn read_table(path: &Path) -> Result<RecordBatch, StorageError> {
    if path.is_dir() {
        let parts = shard_files(path)?;
        let Some(first) = parts.first() else {
            return Err(StorageError::NotFound(path.join(shard_file_name(0))));
        };
        let first = read_parquet_file(first)?;
        let mut batches = vec![first];
        for part in &parts[1..] {
            batches.push(read_parquet_file(part)?);
        }
        let schema = batches[0].schema();
        Ok(concat_batches(&schema, &batches)?)
    } else if path.is_file() {
        read_parquet_file(path)
    } else {
        Err(StorageError::NotFound(path.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::layout::{BatchReader, ColumnData, TableLayout, TABLE_METADATA_KEY};

    const LAYOUT: TableLayout = TableLayout::new("numbers", &["n"]);

    fn numbers(count: i64) -> RecordBatch {
        LAYOUT
            .optimize(vec![("n", ColumnData::Int((0..count).map(Some).collect()))])
            .unwrap()
    }

    #[test]
    fn test_compression_from_str() {
        assert_eq!(Compression::from_str("ZSTD"), Some(Compression::Zstd));
        assert_eq!(Compression::from_str("none"), Some(Compression::Uncompressed));
        assert_eq!(Compression::from_str("lz4"), None);
        assert_eq!(Compression::default().as_str(), "snappy");
    }

    #[test]
    fn test_single_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("numbers.parquet");
        for compression in [Compression::Snappy, Compression::Zstd, Compression::Uncompressed] {
            let options = StorageOptions {
                compression,
                shards: 1,
            };
            let bytes = write_table(&path, &numbers(50), &options).unwrap();
            assert!(bytes > 0);
            let batch = read_table(&path).unwrap();
            assert_eq!(batch.num_rows(), 50);
            assert_eq!(
                batch.schema().metadata().get(TABLE_METADATA_KEY).map(String::as_str),
                Some("numbers")
            );
        }
    }

    #[test]
    fn test_shards_split_evenly_and_reload_as_one() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("numbers.parquet");
        let options = StorageOptions {
            compression: Compression::Snappy,
            shards: 3,
        };
        write_table(&path, &numbers(10), &options).unwrap();

        assert!(path.is_dir());
        let parts = shard_files(&path).unwrap();
        assert_eq!(parts.len(), 3);
        let sizes: Vec<usize> = parts
            .iter()
            .map(|p| read_parquet_file(p).unwrap().num_rows())
            .collect();
        assert_eq!(sizes, vec![4, 3, 3]);

        let batch = read_table(&path).unwrap();
        let values = BatchReader::new("numbers", &batch).ints("n").unwrap();
        assert_eq!(values, (0..10).map(Some).collect::<Vec<_>>());
    }

    #[test]
    fn test_zero_shards_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let options = StorageOptions {
            compression: Compression::Snappy,
            shards: 0,
        };
        assert!(matches!(
            write_table(&dir.path().join("x.parquet"), &numbers(1), &options),
            Err(StorageError::InvalidShards)
        ));
    }

    #[test]
    fn test_missing_table() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            read_table(&dir.path().join("absent.parquet")),
            Err(StorageError::NotFound(_))
        ));
    }
}
