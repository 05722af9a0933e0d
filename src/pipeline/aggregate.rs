//! Per-fandom aggregation of non-fandom tags.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use rayon::prelude::*;

use super::fandom::FandomTables;
use super::report::{DropReason, PipelineReporter, Stage};
use super::PipelineError;
use crate::models::{NonFandomTagAggregate, TagType, WorkTag};

type GroupKey = (Arc<str>, TagType, Arc<str>);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct GroupStats {
    works_num: u64,
    word_count_sum: u128,
    word_counts: u64,
}

impl GroupStats {
    fn add(&mut self, word_count: Option<u64>) {
        self.works_num += 1;
        if let Some(wc) = word_count {
            self.word_count_sum += u128::from(wc);
            self.word_counts += 1;
        }
    }

    fn merge(&mut self, other: &GroupStats) {
        self.works_num += other.works_num;
        self.word_count_sum += other.word_count_sum;
        self.word_counts += other.word_counts;
    }

    fn mean(&self) -> Option<f64> {
        (self.word_counts > 0).then(|| self.word_count_sum as f64 / self.word_counts as f64)
    }
}

/// Running group-by state keyed by (fandom, type, name).
///
/// Sums are kept as integers, so merging accumulators built from disjoint
/// sets of works gives exactly the same result as one pass over all of them.
#[derive(Debug, Default)]
pub struct TagAccumulator {
    groups: BTreeMap<GroupKey, GroupStats>,
    rows_in: u64,
    duplicates: u64,
    without_fandom: u64,
}

impl TagAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold rows into the accumulator.
    ///
    /// Rows for a given work must all go to the same accumulator; duplicate
    /// detection is local to it.
    pub fn extend<'a, I>(&mut self, rows: I, fandoms_by_work: &HashMap<i64, Vec<Arc<str>>>)
    where
        I: IntoIterator<Item = &'a WorkTag>,
    {
        let mut seen: HashSet<(i64, &TagType, &str)> = HashSet::new();
        for row in rows {
            if row.effective_type.is_fandom() {
                continue;
            }
            self.rows_in += 1;
            if !seen.insert((row.work_id, &row.effective_type, &*row.effective_name)) {
                self.duplicates += 1;
                continue;
            }
            let Some(fandoms) = fandoms_by_work.get(&row.work_id) else {
                self.without_fandom += 1;
                continue;
            };
            for fandom in fandoms {
                let key = (
                    Arc::clone(fandom),
                    row.effective_type.clone(),
                    Arc::clone(&row.effective_name),
                );
                self.groups.entry(key).or_default().add(row.word_count);
            }
        }
    }

    pub fn merge(mut self, other: TagAccumulator) -> Self {
        for (key, stats) in other.groups {
            self.groups.entry(key).or_default().merge(&stats);
        }
        self.rows_in += other.rows_in;
        self.duplicates += other.duplicates;
        self.without_fandom += other.without_fandom;
        self
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Emit one aggregate per group, ordered by (fandom, type, name).
    pub fn finish(self, reporter: &dyn PipelineReporter) -> Vec<NonFandomTagAggregate> {
        reporter.rows_dropped(Stage::Aggregate, DropReason::Duplicate, self.duplicates);
        reporter.rows_dropped(
            Stage::Aggregate,
            DropReason::WorkWithoutFandom,
            self.without_fandom,
        );
        reporter.stage_completed(Stage::Aggregate, self.rows_in, self.groups.len() as u64);

        self.groups
            .into_iter()
            .map(|((fandom_name, tag_type, tag_name), stats)| NonFandomTagAggregate {
                fandom_name,
                tag_type,
                tag_name,
                works_num: stats.works_num,
                word_count_mean: stats.mean(),
            })
            .collect()
    }
}

/// Join non-fandom rows onto retained fandoms and count works per
/// (fandom, tag type, tag name).
pub fn aggregate_non_fandom_tags(
    work_tags: &[WorkTag],
    fandoms: &FandomTables,
    reporter: &dyn PipelineReporter,
) -> Vec<NonFandomTagAggregate> {
    reporter.stage_started(Stage::Aggregate);
    let by_work = fandoms.fandoms_by_work();
    let mut acc = TagAccumulator::new();
    acc.extend(work_tags, &by_work);
    acc.finish(reporter)
}

/// Same result as [`aggregate_non_fandom_tags`], computed over `partitions`
/// disjoint work-id partitions in parallel.
pub fn aggregate_non_fandom_tags_partitioned(
    work_tags: &[WorkTag],
    fandoms: &FandomTables,
    partitions: usize,
    reporter: &dyn PipelineReporter,
) -> Result<Vec<NonFandomTagAggregate>, PipelineError> {
    if partitions == 0 {
        return Err(PipelineError::InvalidPartitions);
    }
    if partitions == 1 {
        return Ok(aggregate_non_fandom_tags(work_tags, fandoms, reporter));
    }

    reporter.stage_started(Stage::Aggregate);
    let by_work = fandoms.fandoms_by_work();

    let mut buckets: Vec<Vec<&WorkTag>> = vec![Vec::new(); partitions];
    for row in work_tags {
        buckets[partition_of(row.work_id, partitions)].push(row);
    }
    tracing::debug!(
        "Aggregating {} rows across {} partitions",
        work_tags.len(),
        partitions
    );

    let acc = buckets
        .par_iter()
        .map(|bucket| {
            let mut acc = TagAccumulator::new();
            acc.extend(bucket.iter().copied(), &by_work);
            acc
        })
        .reduce(TagAccumulator::new, TagAccumulator::merge);

    Ok(acc.finish(reporter))
}

fn partition_of(work_id: i64, partitions: usize) -> usize {
    // Fibonacci hashing spreads sequential ids across buckets.
    let hashed = (work_id as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    (hashed % partitions as u64) as usize
}
