//! Tag explosion: one row per work becomes one row per (work, tag).

use std::collections::HashSet;
use std::sync::Arc;

use super::report::{DropReason, PipelineReporter, Stage};
use super::standardize::TagIndex;
use super::PipelineError;
use crate::models::{Work, WorkTag};
use crate::utils::StringInterner;

/// Counters collected while exploding works.
///
/// Counters only ever add up, so stats from separately processed chunks can be
/// merged in any order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExplosionStats {
    /// Works read.
    pub works: u64,
    /// Works whose tag list was missing or empty.
    pub works_without_tags: u64,
    /// Tag references seen, including malformed ones.
    pub references: u64,
    /// Tokens that were not integer ids.
    pub malformed: u64,
    /// Ids with no row in the tags table.
    pub unresolved: u64,
    /// Rows whose effective type is not retained.
    pub dropped_type: u64,
    /// Rows whose effective name is redacted.
    pub dropped_redacted: u64,
    /// Rows emitted.
    pub rows: u64,
}

impl ExplosionStats {
    pub fn merge(&mut self, other: &ExplosionStats) {
        self.works += other.works;
        self.works_without_tags += other.works_without_tags;
        self.references += other.references;
        self.malformed += other.malformed;
        self.unresolved += other.unresolved;
        self.dropped_type += other.dropped_type;
        self.dropped_redacted += other.dropped_redacted;
        self.rows += other.rows;
    }
}

/// Exploded and filtered (work, tag) rows.
#[derive(Debug, Default)]
pub struct WorkTagTable {
    pub rows: Vec<WorkTag>,
    pub stats: ExplosionStats,
}

impl WorkTagTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Explode a single work against the tag index.
///
/// A work without tags yields no rows. References that do not resolve, whose
/// effective type is not retained, or whose effective name is redacted are
/// counted in `stats` and skipped.
pub fn explode_work(
    work: &Work,
    index: &TagIndex,
    languages: &mut StringInterner,
    stats: &mut ExplosionStats,
) -> Vec<WorkTag> {
    stats.works += 1;
    stats.malformed += work.malformed_tag_refs as u64;
    stats.references += (work.raw_tag_ids.len() + work.malformed_tag_refs) as u64;
    if !work.has_tags() {
        stats.works_without_tags += 1;
        return Vec::new();
    }

    let language = languages.intern(&work.language);
    let mut rows = Vec::with_capacity(work.raw_tag_ids.len());
    for &tag_id in &work.raw_tag_ids {
        let Some(tag) = index.get(tag_id) else {
            stats.unresolved += 1;
            continue;
        };
        if !tag.effective_type.is_retained() {
            stats.dropped_type += 1;
            continue;
        }
        if tag.is_redacted() {
            stats.dropped_redacted += 1;
            continue;
        }

        rows.push(WorkTag {
            work_id: work.work_id,
            tag_id,
            creation_date: work.creation_date,
            language: Arc::clone(&language),
            is_complete: work.is_complete,
            word_count: work.word_count,
            effective_type: tag.effective_type.clone(),
            effective_name: Arc::clone(&tag.effective_name),
            effective_is_canonical: tag.effective_is_canonical,
        });
    }
    stats.rows += rows.len() as u64;
    rows
}

/// Explode a stream of works.
///
/// Accepts the fallible iterator produced by the works reader so the works
/// table never has to be held in memory. A work id seen twice aborts the run.
pub fn explode_works<I>(
    works: I,
    index: &TagIndex,
    reporter: &dyn PipelineReporter,
) -> Result<WorkTagTable, PipelineError>
where
    I: IntoIterator<Item = Result<Work, PipelineError>>,
{
    reporter.stage_started(Stage::Explode);

    let mut table = WorkTagTable::default();
    let mut languages = StringInterner::new();
    let mut seen = HashSet::new();

    for work in works {
        let work = work?;
        if !seen.insert(work.work_id) {
            return Err(PipelineError::DuplicateWorkId(work.work_id));
        }
        let rows = explode_work(&work, index, &mut languages, &mut table.stats);
        table.rows.extend(rows);
    }

    let stats = &table.stats;
    if stats.works_without_tags > 0 {
        tracing::debug!("{} works have no tags", stats.works_without_tags);
    }
    reporter.rows_dropped(Stage::Explode, DropReason::MalformedTagRef, stats.malformed);
    reporter.rows_dropped(Stage::Explode, DropReason::UnresolvedTag, stats.unresolved);
    reporter.rows_dropped(Stage::Explode, DropReason::UntrackedType, stats.dropped_type);
    reporter.rows_dropped(Stage::Explode, DropReason::Redacted, stats.dropped_redacted);
    reporter.stage_completed(Stage::Explode, stats.references, stats.rows);

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Tag, TagType};
    use crate::pipeline::report::{CollectingReporter, TracingReporter};
    use chrono::NaiveDate;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
    }

    fn index(tags: &[Tag]) -> TagIndex {
        TagIndex::build(tags, &TracingReporter).unwrap()
    }

    fn explode(works: Vec<Work>, index: &TagIndex) -> WorkTagTable {
        explode_works(works.into_iter().map(Ok), index, &TracingReporter).unwrap()
    }

    #[test]
    fn test_explodes_one_row_per_tag() {
        let idx = index(&[
            Tag::new(10, TagType::Fandom, "Foo"),
            Tag::new(11, TagType::Relationship, "A/B"),
        ]);
        let table = explode(vec![Work::new(1, date(), Some(500)).with_tags("10+11")], &idx);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0].tag_id, 10);
        assert_eq!(table.rows[0].effective_type, TagType::Fandom);
        assert_eq!(table.rows[1].tag_id, 11);
        assert_eq!(&*table.rows[1].effective_name, "A/B");
        assert_eq!(table.rows[1].word_count, Some(500));
    }

    #[test]
    fn test_redacted_alias_resolves_through_merger() {
        let idx = index(&[
            Tag::new(20, TagType::Freeform, "Redacted").merged_into(21),
            Tag::new(21, TagType::Freeform, "Bar"),
        ]);
        let table = explode(vec![Work::new(1, date(), Some(100)).with_tags("20")], &idx);
        assert_eq!(table.len(), 1);
        assert_eq!(&*table.rows[0].effective_name, "Bar");
        assert_eq!(table.rows[0].effective_type, TagType::Freeform);
        assert_eq!(table.rows[0].tag_id, 20);
    }

    #[test]
    fn test_drops_redacted_without_alternative() {
        let idx = index(&[
            Tag::new(30, TagType::Freeform, "Redacted"),
            Tag::new(31, TagType::Freeform, "Redacted").merged_into(404),
        ]);
        let reporter = CollectingReporter::new();
        let works = vec![Work::new(1, date(), None).with_tags("30+31")];
        let table = explode_works(works.into_iter().map(Ok), &idx, &reporter).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.stats.dropped_redacted, 2);
        assert_eq!(reporter.dropped(Stage::Explode, DropReason::Redacted), 2);
    }

    #[test]
    fn test_drops_untracked_types_and_unknown_ids() {
        let idx = index(&[
            Tag::new(1, TagType::Character, "Someone"),
            Tag::new(2, TagType::Media, "TV Shows"),
            Tag::new(3, TagType::Rating, "Teen And Up Audiences"),
        ]);
        let table = explode(vec![Work::new(1, date(), None).with_tags("1+2+3+99")], &idx);
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows[0].effective_type, TagType::Rating);
        assert_eq!(table.stats.dropped_type, 2);
        assert_eq!(table.stats.unresolved, 1);
    }

    #[test]
    fn test_retained_types_only() {
        let idx = index(&[
            Tag::new(1, TagType::Fandom, "Foo"),
            Tag::new(2, TagType::Relationship, "A/B"),
            Tag::new(3, TagType::Freeform, "Fluff"),
            Tag::new(4, TagType::ArchiveWarning, "No Archive Warnings Apply"),
            Tag::new(5, TagType::Rating, "General Audiences"),
            Tag::new(6, TagType::Category, "F/M"),
            Tag::new(7, TagType::from_str("Mystery"), "?"),
        ]);
        let table = explode(vec![Work::new(1, date(), None).with_tags("1+2+3+4+5+6+7")], &idx);
        assert_eq!(table.len(), 5);
        assert!(table.rows.iter().all(|r| r.effective_type.is_retained()));
        assert!(table.rows.iter().all(|r| &*r.effective_name != "Redacted"));
    }

    #[test]
    fn test_work_without_tags_produces_no_rows() {
        let idx = index(&[Tag::new(1, TagType::Fandom, "Foo")]);
        let table = explode(
            vec![
                Work::new(1, date(), Some(10)),
                Work::new(2, date(), Some(10)).with_tags("   "),
                Work::new(3, date(), Some(10)).with_tags("1"),
            ],
            &idx,
        );
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows[0].work_id, 3);
        assert_eq!(table.stats.works, 3);
        assert_eq!(table.stats.works_without_tags, 2);
    }

    #[test]
    fn test_malformed_refs_are_dropped() {
        let idx = index(&[Tag::new(1, TagType::Fandom, "Foo")]);
        let table = explode(vec![Work::new(1, date(), None).with_tags("1+x+")], &idx);
        assert_eq!(table.len(), 1);
        assert_eq!(table.stats.malformed, 2);
        assert_eq!(table.stats.references, 3);
    }

    #[test]
    fn test_duplicate_work_id_fails() {
        let idx = index(&[Tag::new(1, TagType::Fandom, "Foo")]);
        let works = vec![
            Work::new(1, date(), None).with_tags("1"),
            Work::new(1, date(), None).with_tags("1"),
        ];
        let err = explode_works(works.into_iter().map(Ok), &idx, &TracingReporter).unwrap_err();
        assert!(matches!(err, PipelineError::DuplicateWorkId(1)));
    }

    #[test]
    fn test_reader_error_propagates() {
        let idx = index(&[]);
        let works: Vec<Result<Work, PipelineError>> = vec![Err(PipelineError::MissingColumn {
            table: "works",
            column: "tags",
        })];
        assert!(explode_works(works, &idx, &TracingReporter).is_err());
    }

    #[test]
    fn test_stats_merge() {
        let mut a = ExplosionStats {
            works: 2,
            rows: 5,
            unresolved: 1,
            ..Default::default()
        };
        let b = ExplosionStats {
            works: 3,
            rows: 1,
            dropped_redacted: 4,
            ..Default::default()
        };
        a.merge(&b);
        assert_eq!(a.works, 5);
        assert_eq!(a.rows, 6);
        assert_eq!(a.unresolved, 1);
        assert_eq!(a.dropped_redacted, 4);
    }
}
