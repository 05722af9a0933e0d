//! Preprocessing pipeline.
//!
//! Stages run in order, each consuming the previous stage's output:
//!
//! 1. `standardize`: resolve tag aliases into a [`TagIndex`]
//! 2. `explode`: one row per (work, tag), filtered to retained tag types
//! 3. `fandom`: work/fandom membership, keeping popular fandoms only
//! 4. `aggregate`: per-fandom counts and mean word counts of other tags
//!
//! [`Pipeline`] wires the stages to the source readers and the artifact store.

pub mod aggregate;
mod error;
pub mod explode;
pub mod fandom;
pub mod report;
pub mod standardize;

pub use aggregate::{
    aggregate_non_fandom_tags, aggregate_non_fandom_tags_partitioned, TagAccumulator,
};
pub use error::PipelineError;
pub use explode::{explode_work, explode_works, ExplosionStats, WorkTagTable};
pub use fandom::{extract_fandoms, FandomTables, MinimumWorkCount, DEFAULT_MINIMUM_WORK_COUNT};
pub use report::{
    CollectingReporter, DropReason, PipelineEvent, PipelineReporter, Stage, TracingReporter,
};
pub use standardize::{StandardizedTag, TagIndex};

use std::path::Path;
use std::sync::Arc;

use crate::models::{FandomWorkCount, NonFandomTagAggregate, Tag, Work, WorkFandom, WorkTag};
use crate::source::{read_tags, WorksReader};
use crate::storage::{write_artifacts, ArtifactSummary, ArtifactTables, StorageOptions};

/// Settings for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub minimum_work_count: MinimumWorkCount,
    /// Work-id partitions for the aggregation stage.
    pub partitions: usize,
    /// Also persist the exploded (work, tag) table.
    pub save_work_tags: bool,
    pub storage: StorageOptions,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            minimum_work_count: MinimumWorkCount::default(),
            partitions: 1,
            save_work_tags: false,
            storage: StorageOptions::default(),
        }
    }
}

/// Derived tables of one run.
#[derive(Debug, Default)]
pub struct PipelineOutputs {
    pub fandom_counts: Vec<FandomWorkCount>,
    pub work_fandoms: Vec<WorkFandom>,
    pub aggregates: Vec<NonFandomTagAggregate>,
    /// Present only when `save_work_tags` is set.
    pub work_tags: Option<Vec<WorkTag>>,
    pub explosion: ExplosionStats,
    pub tags_read: usize,
    pub dropped_fandoms: usize,
}

impl PipelineOutputs {
    pub fn tables(&self) -> ArtifactTables<'_> {
        ArtifactTables {
            fandom_counts: &self.fandom_counts,
            work_fandoms: &self.work_fandoms,
            aggregates: &self.aggregates,
            work_tags: self.work_tags.as_deref(),
        }
    }
}

/// Result of a run that wrote artifacts.
#[derive(Debug)]
pub struct PipelineRun {
    pub outputs: PipelineOutputs,
    pub summary: ArtifactSummary,
}

/// Runs the preprocessing stages.
pub struct Pipeline {
    options: PipelineOptions,
    reporter: Arc<dyn PipelineReporter>,
}

impl Pipeline {
    pub fn new(options: PipelineOptions) -> Self {
        Self {
            options,
            reporter: Arc::new(TracingReporter),
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn PipelineReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    fn validate(&self) -> Result<(), PipelineError> {
        if self.options.partitions == 0 {
            return Err(PipelineError::InvalidPartitions);
        }
        if self.options.storage.shards == 0 {
            return Err(crate::storage::StorageError::InvalidShards.into());
        }
        Ok(())
    }

    /// Run every stage over in-memory tags and a stream of works.
    pub fn process<I>(&self, tags: &[Tag], works: I) -> Result<PipelineOutputs, PipelineError>
    where
        I: IntoIterator<Item = Result<Work, PipelineError>>,
    {
        self.validate()?;
        let reporter = self.reporter.as_ref();

        let index = TagIndex::build(tags, reporter)?;
        tracing::info!(
            "Standardized {} tags ({} merged, {} with missing merger target)",
            index.len(),
            index.resolved_mergers(),
            index.unresolved_mergers()
        );

        let exploded = explode_works(works, &index, reporter)?;
        let fandoms = extract_fandoms(&exploded.rows, self.options.minimum_work_count, reporter);
        let aggregates = aggregate_non_fandom_tags_partitioned(
            &exploded.rows,
            &fandoms,
            self.options.partitions,
            reporter,
        )?;

        let WorkTagTable { rows, stats } = exploded;
        Ok(PipelineOutputs {
            fandom_counts: fandoms.fandom_counts,
            work_fandoms: fandoms.work_fandoms,
            aggregates,
            work_tags: self.options.save_work_tags.then_some(rows),
            explosion: stats,
            tags_read: tags.len(),
            dropped_fandoms: fandoms.dropped_fandoms,
        })
    }

    /// Read both source tables and run every stage.
    pub fn process_files(
        &self,
        works_csv: &Path,
        tags_csv: &Path,
    ) -> Result<PipelineOutputs, PipelineError> {
        self.validate()?;
        let reporter = self.reporter.as_ref();

        reporter.stage_started(Stage::ReadTags);
        let tags = read_tags(tags_csv)?;
        reporter.stage_completed(Stage::ReadTags, tags.len() as u64, tags.len() as u64);

        let works = WorksReader::open(works_csv)?;
        self.process(&tags, works)
    }

    /// Read sources, run every stage and commit all artifacts to `output_dir`.
    pub fn run(
        &self,
        works_csv: &Path,
        tags_csv: &Path,
        output_dir: &Path,
    ) -> Result<PipelineRun, PipelineError> {
        let outputs = self.process_files(works_csv, tags_csv)?;
        let summary = self.store(&outputs, output_dir)?;
        Ok(PipelineRun { outputs, summary })
    }

    /// Persist the derived tables of a finished run.
    pub fn store(
        &self,
        outputs: &PipelineOutputs,
        output_dir: &Path,
    ) -> Result<ArtifactSummary, PipelineError> {
        let reporter = self.reporter.as_ref();
        reporter.stage_started(Stage::Store);
        let tables = outputs.tables();
        let summary = write_artifacts(&tables, output_dir, &self.options.storage, reporter)?;
        let rows = summary.artifacts.iter().map(|a| a.rows).sum();
        reporter.stage_completed(Stage::Store, rows, rows);
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TagType;
    use chrono::NaiveDate;

    fn works(specs: &[(i64, Option<u64>, &str)]) -> Vec<Result<Work, PipelineError>> {
        let date = NaiveDate::from_ymd_opt(2021, 3, 1).unwrap();
        specs
            .iter()
            .map(|(id, wc, tags)| Ok(Work::new(*id, date, *wc).with_tags(tags)))
            .collect()
    }

    fn options(minimum: i64) -> PipelineOptions {
        PipelineOptions {
            minimum_work_count: MinimumWorkCount::new(minimum).unwrap(),
            ..Default::default()
        }
    }

    #[test]
    fn test_process_end_to_end_in_memory() {
        let tags = vec![
            Tag::new(1, TagType::Fandom, "Foo"),
            Tag::new(2, TagType::Relationship, "A/B"),
            Tag::new(3, TagType::Freeform, "Redacted").merged_into(4),
            Tag::new(4, TagType::Freeform, "Fluff"),
        ];
        let pipeline = Pipeline::new(options(1));
        let outputs = pipeline
            .process(&tags, works(&[(1, Some(100), "1+2+3"), (2, Some(300), "1+2")]))
            .unwrap();

        assert_eq!(outputs.fandom_counts.len(), 1);
        assert_eq!(outputs.fandom_counts[0].works_num, 2);
        assert_eq!(outputs.work_fandoms.len(), 2);
        assert_eq!(outputs.aggregates.len(), 2);
        let ab = outputs
            .aggregates
            .iter()
            .find(|a| &*a.tag_name == "A/B")
            .unwrap();
        assert_eq!(ab.works_num, 2);
        assert_eq!(ab.word_count_mean, Some(200.0));
        assert!(outputs.work_tags.is_none());
        assert_eq!(outputs.tags_read, 4);
    }

    #[test]
    fn test_save_work_tags_keeps_exploded_rows() {
        let tags = vec![Tag::new(1, TagType::Fandom, "Foo")];
        let pipeline = Pipeline::new(PipelineOptions {
            save_work_tags: true,
            ..options(0)
        });
        let outputs = pipeline.process(&tags, works(&[(1, None, "1")])).unwrap();
        assert_eq!(outputs.work_tags.map(|rows| rows.len()), Some(1));
    }

    #[test]
    fn test_zero_partitions_fail_before_reading() {
        let pipeline = Pipeline::new(PipelineOptions {
            partitions: 0,
            ..Default::default()
        });
        let err = pipeline
            .process_files(Path::new("/nonexistent/works.csv"), Path::new("/nonexistent/tags.csv"))
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidPartitions));
    }

    #[test]
    fn test_reporter_sees_every_stage() {
        let reporter = Arc::new(CollectingReporter::new());
        let pipeline = Pipeline::new(options(0)).with_reporter(reporter.clone());
        let tags = vec![Tag::new(1, TagType::Fandom, "Foo")];
        pipeline.process(&tags, works(&[(1, None, "1")])).unwrap();
        for stage in [Stage::Standardize, Stage::Explode, Stage::Fandoms, Stage::Aggregate] {
            assert!(reporter.completed(stage), "{} not completed", stage);
        }
    }
}
