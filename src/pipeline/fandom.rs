//! Fandom extraction and popularity filtering.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::NaiveDate;

use super::report::{DropReason, PipelineReporter, Stage};
use super::PipelineError;
use crate::models::{FandomWorkCount, WorkFandom, WorkTag};

/// Default minimum number of works a fandom needs to be kept.
pub const DEFAULT_MINIMUM_WORK_COUNT: u64 = 100;

/// Popularity threshold. A fandom is kept only when its work count is
/// strictly greater than this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinimumWorkCount(u64);

impl MinimumWorkCount {
    /// Validate a configured threshold. Negative values are rejected.
    pub fn new(value: i64) -> Result<Self, PipelineError> {
        u64::try_from(value)
            .map(Self)
            .map_err(|_| PipelineError::InvalidThreshold(value))
    }

    pub fn get(&self) -> u64 {
        self.0
    }

    pub fn retains(&self, works_num: u64) -> bool {
        works_num > self.0
    }
}

impl Default for MinimumWorkCount {
    fn default() -> Self {
        Self(DEFAULT_MINIMUM_WORK_COUNT)
    }
}

/// Work/fandom membership and per-fandom counts, restricted to retained
/// fandoms.
#[derive(Debug, Default)]
pub struct FandomTables {
    /// Sorted by (fandom_name, work_id).
    pub work_fandoms: Vec<WorkFandom>,
    /// Sorted by fandom_name.
    pub fandom_counts: Vec<FandomWorkCount>,
    /// Fandoms seen but not retained.
    pub dropped_fandoms: usize,
}

impl FandomTables {
    /// Join index from work id to the retained fandoms it belongs to.
    pub fn fandoms_by_work(&self) -> HashMap<i64, Vec<Arc<str>>> {
        let mut by_work: HashMap<i64, Vec<Arc<str>>> = HashMap::new();
        for wf in &self.work_fandoms {
            by_work
                .entry(wf.work_id)
                .or_default()
                .push(Arc::clone(&wf.fandom_name));
        }
        by_work
    }

    pub fn works_num(&self, fandom_name: &str) -> Option<u64> {
        self.fandom_counts
            .binary_search_by(|c| (*c.fandom_name).cmp(fandom_name))
            .ok()
            .map(|i| self.fandom_counts[i].works_num)
    }
}

/// Derive work/fandom membership from fandom rows, count works per fandom,
/// and keep fandoms above `minimum`.
pub fn extract_fandoms(
    work_tags: &[WorkTag],
    minimum: MinimumWorkCount,
    reporter: &dyn PipelineReporter,
) -> FandomTables {
    reporter.stage_started(Stage::Fandoms);

    let mut memberships: BTreeMap<(Arc<str>, i64), (Option<u64>, NaiveDate)> = BTreeMap::new();
    let mut fandom_rows = 0u64;
    for row in work_tags.iter().filter(|r| r.effective_type.is_fandom()) {
        fandom_rows += 1;
        memberships
            .entry((Arc::clone(&row.effective_name), row.work_id))
            .or_insert((row.word_count, row.creation_date));
    }
    reporter.rows_dropped(
        Stage::Fandoms,
        DropReason::Duplicate,
        fandom_rows - memberships.len() as u64,
    );

    let mut counts: BTreeMap<Arc<str>, u64> = BTreeMap::new();
    for (fandom_name, _) in memberships.keys() {
        *counts.entry(Arc::clone(fandom_name)).or_insert(0) += 1;
    }

    let total_fandoms = counts.len();
    counts.retain(|_, works_num| minimum.retains(*works_num));
    let dropped_fandoms = total_fandoms - counts.len();

    let before = memberships.len() as u64;
    let work_fandoms: Vec<WorkFandom> = memberships
        .into_iter()
        .filter(|((fandom_name, _), _)| counts.contains_key(fandom_name))
        .map(|((fandom_name, work_id), (word_count, creation_date))| WorkFandom {
            fandom_name,
            work_id,
            word_count,
            creation_date,
        })
        .collect();
    reporter.rows_dropped(
        Stage::Fandoms,
        DropReason::UnpopularFandom,
        before - work_fandoms.len() as u64,
    );

    tracing::info!(
        "Kept {} of {} fandoms with more than {} works",
        counts.len(),
        total_fandoms,
        minimum.get()
    );

    let fandom_counts = counts
        .into_iter()
        .map(|(fandom_name, works_num)| FandomWorkCount {
            fandom_name,
            works_num,
        })
        .collect();

    reporter.stage_completed(Stage::Fandoms, fandom_rows, work_fandoms.len() as u64);
    FandomTables {
        work_fandoms,
        fandom_counts,
        dropped_fandoms,
    }
}
