//! Derived tables as parquet artifacts.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};

use super::layout::{BatchReader, ColumnData, TableLayout};
use super::parquet::{read_table, write_table, StorageOptions};
use super::StorageError;
use crate::models::{FandomWorkCount, NonFandomTagAggregate, TagType, WorkFandom, WorkTag};
use crate::pipeline::report::{PipelineEvent, PipelineReporter};

pub const FANDOM_WORKS_COUNT: TableLayout =
    TableLayout::new("fandom_works_count", &["fandom_name"]);
pub const WORKS_WITH_FANDOM: TableLayout =
    TableLayout::new("works_with_fandom", &["fandom_name", "work_id"]);
pub const NON_FANDOM_TAGS_AGG: TableLayout =
    TableLayout::new("non_fandom_tags_agg", &["fandom_name", "type_final"]);
pub const WORKS_TAGS: TableLayout = TableLayout::new("works_tags", &[]);

const MANIFEST_FILE: &str = "manifest.json";
const STAGING_PREFIX: &str = ".ao3stats-staging-";

/// Locations of every artifact under one output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub output_dir: PathBuf,
    pub fandom_works_count: PathBuf,
    pub works_with_fandom: PathBuf,
    pub non_fandom_tags_agg: PathBuf,
    pub works_tags: PathBuf,
    pub manifest: PathBuf,
}

impl ArtifactPaths {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        let output_dir = output_dir.into();
        let artifact = |layout: &TableLayout| output_dir.join(format!("{}.parquet", layout.table));
        Self {
            fandom_works_count: artifact(&FANDOM_WORKS_COUNT),
            works_with_fandom: artifact(&WORKS_WITH_FANDOM),
            non_fandom_tags_agg: artifact(&NON_FANDOM_TAGS_AGG),
            works_tags: artifact(&WORKS_TAGS),
            manifest: output_dir.join(MANIFEST_FILE),
            output_dir,
        }
    }
}

/// Tables handed to [`write_artifacts`]. Each slice is written in the order
/// given, which is expected to be sorted by the table's index.
#[derive(Debug, Clone, Copy)]
pub struct ArtifactTables<'a> {
    pub fandom_counts: &'a [FandomWorkCount],
    pub work_fandoms: &'a [WorkFandom],
    pub aggregates: &'a [NonFandomTagAggregate],
    pub work_tags: Option<&'a [WorkTag]>,
}

/// One written artifact, as recorded in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactEntry {
    pub table: String,
    pub file: String,
    pub rows: u64,
    pub bytes: u64,
    pub shards: usize,
}

/// Contents of `manifest.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactSummary {
    pub version: String,
    pub compression: String,
    pub artifacts: Vec<ArtifactEntry>,
}

impl ArtifactSummary {
    pub fn total_bytes(&self) -> u64 {
        self.artifacts.iter().map(|a| a.bytes).sum()
    }

    pub fn load(path: &Path) -> Result<Self, StorageError> {
        let raw = fs::read_to_string(path).map_err(|e| StorageError::io(path, e))?;
        Ok(serde_json::from_str(&raw)?)
    }
}

fn text<T>(rows: &[T], f: impl Fn(&T) -> &Arc<str>) -> ColumnData {
    ColumnData::Text(rows.iter().map(|r| Some(f(r).clone())).collect())
}

fn count_to_int(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

pub fn fandom_counts_batch(rows: &[FandomWorkCount]) -> Result<RecordBatch, StorageError> {
    FANDOM_WORKS_COUNT.optimize(vec![
        ("fandom_name", text(rows, |r| &r.fandom_name)),
        (
            "works_num",
            ColumnData::Int(rows.iter().map(|r| Some(count_to_int(r.works_num))).collect()),
        ),
    ])
}

pub fn work_fandoms_batch(rows: &[WorkFandom]) -> Result<RecordBatch, StorageError> {
    WORKS_WITH_FANDOM.optimize(vec![
        ("fandom_name", text(rows, |r| &r.fandom_name)),
        ("work_id", ColumnData::Int(rows.iter().map(|r| Some(r.work_id)).collect())),
        (
            "word_count",
            ColumnData::Int(rows.iter().map(|r| r.word_count.map(count_to_int)).collect()),
        ),
        (
            "creation date",
            ColumnData::Date(rows.iter().map(|r| Some(r.creation_date)).collect()),
        ),
    ])
}

pub fn aggregates_batch(rows: &[NonFandomTagAggregate]) -> Result<RecordBatch, StorageError> {
    NON_FANDOM_TAGS_AGG.optimize(vec![
        ("fandom_name", text(rows, |r| &r.fandom_name)),
        (
            "type_final",
            ColumnData::Text(rows.iter().map(|r| Some(r.tag_type.as_str().into())).collect()),
        ),
        ("name_final", text(rows, |r| &r.tag_name)),
        (
            "works_num",
            ColumnData::Int(rows.iter().map(|r| Some(count_to_int(r.works_num))).collect()),
        ),
        (
            "word_count_mean",
            ColumnData::Float(rows.iter().map(|r| r.word_count_mean).collect()),
        ),
    ])
}

pub fn work_tags_batch(rows: &[WorkTag]) -> Result<RecordBatch, StorageError> {
    WORKS_TAGS.optimize(vec![
        ("work_id", ColumnData::Int(rows.iter().map(|r| Some(r.work_id)).collect())),
        ("tag_id", ColumnData::Int(rows.iter().map(|r| Some(r.tag_id)).collect())),
        (
            "creation date",
            ColumnData::Date(rows.iter().map(|r| Some(r.creation_date)).collect()),
        ),
        ("language", text(rows, |r| &r.language)),
        (
            "complete",
            ColumnData::Bool(rows.iter().map(|r| Some(r.is_complete)).collect()),
        ),
        (
            "word_count",
            ColumnData::Int(rows.iter().map(|r| r.word_count.map(count_to_int)).collect()),
        ),
        (
            "type_final",
            ColumnData::Text(rows.iter().map(|r| Some(r.effective_type.as_str().into())).collect()),
        ),
        ("name_final", text(rows, |r| &r.effective_name)),
        (
            "canonical_final",
            ColumnData::Bool(rows.iter().map(|r| Some(r.effective_is_canonical)).collect()),
        ),
    ])
}

fn remove_artifact(path: &Path) -> Result<(), StorageError> {
    let result = if path.is_dir() {
        fs::remove_dir_all(path)
    } else if path.exists() {
        fs::remove_file(path)
    } else {
        return Ok(());
    };
    result.map_err(|e| StorageError::io(path, e))
}

/// Write every table, all or nothing.
///
/// Tables are written into a staging directory inside `output_dir` and only
/// moved into place once every table and the manifest have been written. The
/// staging directory is removed on every exit path.
pub fn write_artifacts(
    tables: &ArtifactTables<'_>,
    output_dir: &Path,
    options: &StorageOptions,
    reporter: &dyn PipelineReporter,
) -> Result<ArtifactSummary, StorageError> {
    if options.shards == 0 {
        return Err(StorageError::InvalidShards);
    }
    fs::create_dir_all(output_dir).map_err(|e| StorageError::io(output_dir, e))?;
    let staging = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .tempdir_in(output_dir)
        .map_err(|e| StorageError::io(output_dir, e))?;

    let mut batches = vec![
        (&FANDOM_WORKS_COUNT, fandom_counts_batch(tables.fandom_counts)?),
        (&WORKS_WITH_FANDOM, work_fandoms_batch(tables.work_fandoms)?),
        (&NON_FANDOM_TAGS_AGG, aggregates_batch(tables.aggregates)?),
    ];
    if let Some(work_tags) = tables.work_tags {
        batches.push((&WORKS_TAGS, work_tags_batch(work_tags)?));
    }

    let mut artifacts = Vec::with_capacity(batches.len());
    for (layout, batch) in &batches {
        let file = format!("{}.parquet", layout.table);
        let bytes = write_table(&staging.path().join(&file), batch, options)?;
        artifacts.push(ArtifactEntry {
            table: layout.table.to_string(),
            file,
            rows: batch.num_rows() as u64,
            bytes,
            shards: options.shards,
        });
    }

    let summary = ArtifactSummary {
        version: env!("CARGO_PKG_VERSION").to_string(),
        compression: options.compression.as_str().to_string(),
        artifacts,
    };
    let manifest_staged = staging.path().join(MANIFEST_FILE);
    fs::write(&manifest_staged, serde_json::to_string_pretty(&summary)?)
        .map_err(|e| StorageError::io(&manifest_staged, e))?;

    let paths = ArtifactPaths::new(output_dir);
    if tables.work_tags.is_none() {
        // A previous run may have saved work tags; they would no longer match.
        remove_artifact(&paths.works_tags)?;
    }
    for entry in &summary.artifacts {
        let target = output_dir.join(&entry.file);
        remove_artifact(&target)?;
        fs::rename(staging.path().join(&entry.file), &target)
            .map_err(|e| StorageError::io(&target, e))?;
        reporter.report(PipelineEvent::ArtifactWritten {
            table: table_name(&entry.table),
            path: target,
            rows: entry.rows,
            bytes: entry.bytes,
        });
    }
    fs::rename(&manifest_staged, &paths.manifest)
        .map_err(|e| StorageError::io(&paths.manifest, e))?;

    Ok(summary)
}

fn table_name(table: &str) -> &'static str {
    [FANDOM_WORKS_COUNT, WORKS_WITH_FANDOM, NON_FANDOM_TAGS_AGG, WORKS_TAGS]
        .iter()
        .map(|l| l.table)
        .find(|t| *t == table)
        .unwrap_or("artifact")
}

pub fn load_fandom_work_counts(path: &Path) -> Result<Vec<FandomWorkCount>, StorageError> {
    let batch = read_table(path)?;
    let r = BatchReader::new(FANDOM_WORKS_COUNT.table, &batch);
    let names = r.required("fandom_name", r.strings("fandom_name")?)?;
    let counts = r.required("works_num", r.ints("works_num")?)?;
    Ok(names
        .into_iter()
        .zip(counts)
        .map(|(fandom_name, works_num)| FandomWorkCount {
            fandom_name,
            works_num: works_num.max(0) as u64,
        })
        .collect())
}

pub fn load_work_fandoms(path: &Path) -> Result<Vec<WorkFandom>, StorageError> {
    let batch = read_table(path)?;
    let r = BatchReader::new(WORKS_WITH_FANDOM.table, &batch);
    let names = r.required("fandom_name", r.strings("fandom_name")?)?;
    let ids = r.required("work_id", r.ints("work_id")?)?;
    let word_counts = r.ints("word_count")?;
    let dates = r.required("creation date", r.dates("creation date")?)?;
    Ok(names
        .into_iter()
        .zip(ids)
        .zip(word_counts)
        .zip(dates)
        .map(|(((fandom_name, work_id), word_count), creation_date)| WorkFandom {
            fandom_name,
            work_id,
            word_count: word_count.map(|wc| wc.max(0) as u64),
            creation_date,
        })
        .collect())
}

pub fn load_non_fandom_tag_aggregates(
    path: &Path,
) -> Result<Vec<NonFandomTagAggregate>, StorageError> {
    let batch = read_table(path)?;
    let r = BatchReader::new(NON_FANDOM_TAGS_AGG.table, &batch);
    let fandoms = r.required("fandom_name", r.strings("fandom_name")?)?;
    let types = r.required("type_final", r.strings("type_final")?)?;
    let names = r.required("name_final", r.strings("name_final")?)?;
    let counts = r.required("works_num", r.ints("works_num")?)?;
    let means = r.floats("word_count_mean")?;
    Ok(fandoms
        .into_iter()
        .zip(types)
        .zip(names)
        .zip(counts)
        .zip(means)
        .map(
            |((((fandom_name, tag_type), tag_name), works_num), word_count_mean)| {
                NonFandomTagAggregate {
                    fandom_name,
                    tag_type: TagType::from_str(&tag_type),
                    tag_name,
                    works_num: works_num.max(0) as u64,
                    word_count_mean,
                }
            },
        )
        .collect())
}
