//! Fandom listing and per-fandom profiles.

use std::collections::BTreeMap;

use chrono::Datelike;

use super::bins::{BinCount, WordCountBins};
use super::relationships::{ChordMatrix, RelationshipKind};
use crate::models::{FandomWorkCount, NonFandomTagAggregate, TagType, WorkFandom};

/// Order of the fandom list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FandomOrder {
    /// Most works first.
    #[default]
    Popularity,
    Alphabetical,
}

impl FandomOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Popularity => "popularity",
            Self::Alphabetical => "alphabetical",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "popularity" | "popular" | "works" => Some(Self::Popularity),
            "alphabetical" | "alpha" | "name" => Some(Self::Alphabetical),
            _ => None,
        }
    }
}

/// Sort fandoms for listing. Ties in popularity fall back to name order.
pub fn order_fandoms(counts: &[FandomWorkCount], order: FandomOrder) -> Vec<&FandomWorkCount> {
    let mut ordered: Vec<&FandomWorkCount> = counts.iter().collect();
    match order {
        FandomOrder::Popularity => ordered.sort_by(|a, b| {
            b.works_num
                .cmp(&a.works_num)
                .then_with(|| a.fandom_name.cmp(&b.fandom_name))
        }),
        FandomOrder::Alphabetical => ordered.sort_by(|a, b| a.fandom_name.cmp(&b.fandom_name)),
    }
    ordered
}

/// Mean and median word count, truncated to whole words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordCountStats {
    pub mean: u64,
    pub median: u64,
    /// Works with a known word count.
    pub works: u64,
}

/// Works published in one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthlyCount {
    pub year: i32,
    pub month: u32,
    pub works: u64,
}

/// One fandom's works and tag aggregates.
#[derive(Debug, Clone)]
pub struct FandomProfile<'a> {
    pub name: String,
    works: Vec<&'a WorkFandom>,
    tags: Vec<&'a NonFandomTagAggregate>,
}

impl<'a> FandomProfile<'a> {
    pub fn new(
        name: &str,
        work_fandoms: &'a [WorkFandom],
        aggregates: &'a [NonFandomTagAggregate],
    ) -> Self {
        Self {
            name: name.to_string(),
            works: work_fandoms
                .iter()
                .filter(|w| &*w.fandom_name == name)
                .collect(),
            tags: aggregates
                .iter()
                .filter(|a| &*a.fandom_name == name)
                .collect(),
        }
    }

    pub fn works(&self) -> &[&'a WorkFandom] {
        &self.works
    }

    pub fn is_empty(&self) -> bool {
        self.works.is_empty()
    }

    /// Aggregates of one tag type, most works first.
    pub fn top_tags(&self, tag_type: &TagType, limit: usize) -> Vec<&'a NonFandomTagAggregate> {
        let mut tags: Vec<&'a NonFandomTagAggregate> = self
            .tags
            .iter()
            .copied()
            .filter(|a| &a.tag_type == tag_type)
            .collect();
        tags.sort_by(|a, b| {
            b.works_num
                .cmp(&a.works_num)
                .then_with(|| a.tag_name.cmp(&b.tag_name))
        });
        tags.truncate(limit);
        tags
    }

    pub fn relationships(&self) -> impl Iterator<Item = &'a NonFandomTagAggregate> + '_ {
        self.tags
            .iter()
            .copied()
            .filter(|a| a.tag_type == TagType::Relationship)
    }

    pub fn chord_matrix(&self, kind: RelationshipKind, top_n: usize) -> ChordMatrix {
        ChordMatrix::from_relationships(self.relationships(), kind, top_n)
    }

    fn word_counts(&self) -> impl Iterator<Item = u64> + '_ {
        self.works.iter().filter_map(|w| w.word_count)
    }

    /// `None` when no work has a word count.
    pub fn word_count_stats(&self) -> Option<WordCountStats> {
        let mut counts: Vec<u64> = self.word_counts().collect();
        if counts.is_empty() {
            return None;
        }
        counts.sort_unstable();

        let n = counts.len();
        let sum: u128 = counts.iter().map(|&c| u128::from(c)).sum();
        let mean = (sum / n as u128) as u64;
        let median = if n % 2 == 1 {
            counts[n / 2]
        } else {
            ((u128::from(counts[n / 2 - 1]) + u128::from(counts[n / 2])) / 2) as u64
        };

        Some(WordCountStats {
            mean,
            median,
            works: n as u64,
        })
    }

    pub fn word_count_distribution(&self, bins: &WordCountBins) -> Vec<BinCount> {
        bins.histogram(self.word_counts())
    }

    /// Works per month of creation, in date order. Months without works are
    /// omitted.
    pub fn works_by_month(&self) -> Vec<MonthlyCount> {
        let mut months: BTreeMap<(i32, u32), u64> = BTreeMap::new();
        for work in &self.works {
            let date = work.creation_date;
            *months.entry((date.year(), date.month())).or_insert(0) += 1;
        }
        months
            .into_iter()
            .map(|((year, month), works)| MonthlyCount { year, month, works })
            .collect()
    }
}
