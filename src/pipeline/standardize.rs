//! Tag standardization: resolve aliases to their canonical tag.
//!
//! A tag whose `merger_id` points at another row takes that row's type, name
//! and canonical flag. Resolution is a single lookup; the target's own
//! `merger_id` is never followed. A `merger_id` with no matching row leaves the
//! tag's own fields in place.

use std::collections::HashMap;
use std::sync::Arc;

use super::report::{PipelineReporter, Stage};
use super::PipelineError;
use crate::models::{Tag, TagType, REDACTED_TAG_NAME};
use crate::utils::StringInterner;

/// Effective fields of one tag after alias resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardizedTag {
    pub tag_id: i64,
    pub effective_type: TagType,
    pub effective_name: Arc<str>,
    pub effective_is_canonical: bool,
    /// Whether the fields came from a merger target.
    pub merged: bool,
}

impl StandardizedTag {
    pub fn is_redacted(&self) -> bool {
        &*self.effective_name == REDACTED_TAG_NAME
    }
}

/// Lookup from tag id to its standardized record.
#[derive(Debug, Default)]
pub struct TagIndex {
    tags: HashMap<i64, StandardizedTag>,
    resolved_mergers: usize,
    unresolved_mergers: usize,
}

impl TagIndex {
    /// Standardize every tag. One entry per input tag; nothing is dropped.
    ///
    /// Fails if a tag id occurs more than once, since a merger pointing at it
    /// could not be resolved to a single row.
    pub fn build(tags: &[Tag], reporter: &dyn PipelineReporter) -> Result<Self, PipelineError> {
        reporter.stage_started(Stage::Standardize);

        let mut occurrences: HashMap<i64, usize> = HashMap::with_capacity(tags.len());
        for tag in tags {
            *occurrences.entry(tag.tag_id).or_insert(0) += 1;
        }

        for tag in tags {
            if let Some(merger_id) = tag.merger_id {
                let matches = occurrences.get(&merger_id).copied().unwrap_or(0);
                if matches > 1 {
                    return Err(PipelineError::AmbiguousMerger {
                        tag_id: tag.tag_id,
                        merger_id,
                        matches,
                    });
                }
            }
        }
        if let Some((&tag_id, _)) = occurrences.iter().find(|(_, n)| **n > 1) {
            return Err(PipelineError::DuplicateTagId(tag_id));
        }

        let by_id: HashMap<i64, &Tag> = tags.iter().map(|t| (t.tag_id, t)).collect();
        let mut names = StringInterner::new();
        let mut index = TagIndex {
            tags: HashMap::with_capacity(tags.len()),
            resolved_mergers: 0,
            unresolved_mergers: 0,
        };

        for tag in tags {
            let target = tag.merger_id.and_then(|id| by_id.get(&id).copied());
            match (tag.merger_id, target) {
                (Some(_), Some(_)) => index.resolved_mergers += 1,
                (Some(missing), None) => {
                    tracing::debug!(
                        "Tag {} merges into missing tag {}; keeping its own fields",
                        tag.tag_id,
                        missing
                    );
                    index.unresolved_mergers += 1;
                }
                _ => {}
            }

            let standardized = standardize(tag, target, &mut names);
            index.tags.insert(tag.tag_id, standardized);
        }

        reporter.stage_completed(Stage::Standardize, tags.len() as u64, index.len() as u64);
        Ok(index)
    }

    pub fn get(&self, tag_id: i64) -> Option<&StandardizedTag> {
        self.tags.get(&tag_id)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Tags whose merger target was found.
    pub fn resolved_mergers(&self) -> usize {
        self.resolved_mergers
    }

    /// Tags with a merger id that matched no row.
    pub fn unresolved_mergers(&self) -> usize {
        self.unresolved_mergers
    }

    pub fn iter(&self) -> impl Iterator<Item = &StandardizedTag> {
        self.tags.values()
    }
}

/// Coalesce each field from the merger target, falling back to the tag itself.
fn standardize(tag: &Tag, target: Option<&Tag>, names: &mut StringInterner) -> StandardizedTag {
    match target {
        Some(canonical) => {
            let name = if canonical.name.is_empty() {
                &tag.name
            } else {
                &canonical.name
            };
            StandardizedTag {
                tag_id: tag.tag_id,
                effective_type: canonical.tag_type.clone(),
                effective_name: names.intern(name),
                effective_is_canonical: canonical.is_canonical,
                merged: true,
            }
        }
        None => StandardizedTag {
            tag_id: tag.tag_id,
            effective_type: tag.tag_type.clone(),
            effective_name: names.intern(&tag.name),
            effective_is_canonical: tag.is_canonical,
            merged: false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::report::{CollectingReporter, TracingReporter};

    fn build(tags: &[Tag]) -> TagIndex {
        TagIndex::build(tags, &TracingReporter).unwrap()
    }

    #[test]
    fn test_merged_tag_takes_canonical_fields() {
        let tags = vec![
            Tag::new(20, TagType::Fandom, "Redacted").merged_into(21),
            Tag::new(21, TagType::Freeform, "Bar"),
        ];
        let index = build(&tags);
        let t = index.get(20).unwrap();
        assert_eq!(t.effective_type, TagType::Freeform);
        assert_eq!(&*t.effective_name, "Bar");
        assert!(t.effective_is_canonical);
        assert!(t.merged);
        assert_eq!(index.resolved_mergers(), 1);
    }

    #[test]
    fn test_tag_without_merger_keeps_own_fields() {
        let mut tag = Tag::new(5, TagType::Relationship, "A/B");
        tag.is_canonical = false;
        let index = build(&[tag]);
        let t = index.get(5).unwrap();
        assert_eq!(t.effective_type, TagType::Relationship);
        assert_eq!(&*t.effective_name, "A/B");
        assert!(!t.effective_is_canonical);
        assert!(!t.merged);
    }

    #[test]
    fn test_missing_merger_target_is_unresolved() {
        let tags = vec![Tag::new(1, TagType::Freeform, "Fluff").merged_into(999)];
        let index = build(&tags);
        let t = index.get(1).unwrap();
        assert_eq!(&*t.effective_name, "Fluff");
        assert!(!t.effective_is_canonical);
        assert!(!t.merged);
        assert_eq!(index.unresolved_mergers(), 1);
    }

    #[test]
    fn test_resolution_is_single_hop() {
        let tags = vec![
            Tag::new(1, TagType::Freeform, "alias").merged_into(2),
            Tag::new(2, TagType::Freeform, "middle").merged_into(3),
            Tag::new(3, TagType::Freeform, "final"),
        ];
        let index = build(&tags);
        assert_eq!(&*index.get(1).unwrap().effective_name, "middle");
        assert_eq!(&*index.get(2).unwrap().effective_name, "final");
    }

    #[test]
    fn test_empty_canonical_name_falls_back_to_own() {
        let tags = vec![
            Tag::new(1, TagType::Freeform, "Angst").merged_into(2),
            Tag::new(2, TagType::Freeform, ""),
        ];
        let index = build(&tags);
        assert_eq!(&*index.get(1).unwrap().effective_name, "Angst");
    }

    #[test]
    fn test_every_tag_is_kept() {
        let tags = vec![
            Tag::new(1, TagType::Freeform, "Redacted"),
            Tag::new(2, TagType::Character, "Someone"),
            Tag::new(3, TagType::Fandom, "Foo"),
        ];
        let reporter = CollectingReporter::new();
        let index = TagIndex::build(&tags, &reporter).unwrap();
        assert_eq!(index.len(), 3);
        assert!(index.get(1).unwrap().is_redacted());
        assert!(reporter.completed(Stage::Standardize));
    }

    #[test]
    fn test_ambiguous_merger_fails() {
        let tags = vec![
            Tag::new(1, TagType::Freeform, "alias").merged_into(2),
            Tag::new(2, TagType::Freeform, "one"),
            Tag::new(2, TagType::Freeform, "two"),
        ];
        let err = TagIndex::build(&tags, &TracingReporter).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::AmbiguousMerger {
                tag_id: 1,
                merger_id: 2,
                matches: 2
            }
        ));
    }

    #[test]
    fn test_duplicate_tag_id_fails() {
        let tags = vec![
            Tag::new(7, TagType::Freeform, "one"),
            Tag::new(7, TagType::Freeform, "two"),
        ];
        let err = TagIndex::build(&tags, &TracingReporter).unwrap_err();
        assert!(matches!(err, PipelineError::DuplicateTagId(7)));
    }

    #[test]
    fn test_names_are_interned() {
        let tags = vec![
            Tag::new(1, TagType::Freeform, "fluff").merged_into(3),
            Tag::new(2, TagType::Freeform, "Fluff!").merged_into(3),
            Tag::new(3, TagType::Freeform, "Fluff"),
        ];
        let index = build(&tags);
        assert!(Arc::ptr_eq(
            &index.get(1).unwrap().effective_name,
            &index.get(2).unwrap().effective_name
        ));
    }
}
