//! Rows of the tables the pipeline derives from works and tags.

use std::sync::Arc;

use chrono::NaiveDate;

use super::TagType;

/// One (work, tag) pair after explosion and standardization.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkTag {
    pub work_id: i64,
    pub tag_id: i64,
    pub creation_date: NaiveDate,
    pub language: Arc<str>,
    pub is_complete: bool,
    pub word_count: Option<u64>,
    pub effective_type: TagType,
    pub effective_name: Arc<str>,
    pub effective_is_canonical: bool,
}

/// One (fandom, work) membership.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct WorkFandom {
    pub fandom_name: Arc<str>,
    pub work_id: i64,
    pub word_count: Option<u64>,
    pub creation_date: NaiveDate,
}

/// Number of distinct works in a fandom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FandomWorkCount {
    pub fandom_name: Arc<str>,
    pub works_num: u64,
}

/// Works carrying a non-fandom tag within one fandom.
#[derive(Debug, Clone, PartialEq)]
pub struct NonFandomTagAggregate {
    pub fandom_name: Arc<str>,
    pub tag_type: TagType,
    pub tag_name: Arc<str>,
    pub works_num: u64,
    /// Absent when none of the contributing works has a word count.
    pub word_count_mean: Option<f64>,
}
