//! Relationship tags split into character pairs.

use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

use regex::Regex;

use crate::models::{NonFandomTagAggregate, TagType};

/// Parenthesized disambiguation such as " (Marvel)" in "Gamora (Marvel)".
static QUALIFIER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" \(.+\)").unwrap());

/// Kind of relationship, by the separator between character names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationshipKind {
    /// `A/B`
    Romantic,
    /// `A & B`
    Platonic,
}

impl RelationshipKind {
    pub fn separator(&self) -> char {
        match self {
            Self::Romantic => '/',
            Self::Platonic => '&',
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Romantic => "romantic",
            Self::Platonic => "platonic",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "romantic" => Some(Self::Romantic),
            "platonic" => Some(Self::Platonic),
            _ => None,
        }
    }

    /// Classify a relationship name. Romantic wins when both separators occur.
    pub fn classify(name: &str) -> Option<Self> {
        [Self::Romantic, Self::Platonic]
            .into_iter()
            .find(|kind| name.contains(kind.separator()))
    }
}

/// Strip surrounding whitespace and any parenthesized qualifier.
pub fn clean_character_name(name: &str) -> String {
    QUALIFIER.replace_all(name.trim(), "").into_owned()
}

/// Every unordered pair of characters in a relationship, in name order.
///
/// `A/B/C` yields `(A, B)`, `(A, C)` and `(B, C)`.
pub fn character_pairs(name: &str, kind: RelationshipKind) -> Vec<(String, String)> {
    let characters: Vec<String> = name
        .split(kind.separator())
        .map(clean_character_name)
        .collect();

    let mut pairs = Vec::new();
    for (i, first) in characters.iter().enumerate() {
        for second in &characters[i + 1..] {
            pairs.push((first.clone(), second.clone()));
        }
    }
    pairs
}

/// Symmetric character x character matrix of work counts.
#[derive(Debug, Clone, PartialEq)]
pub struct ChordMatrix {
    /// Sorted character names; row and column labels.
    pub characters: Vec<String>,
    /// `values[i][j] == values[j][i]`.
    pub values: Vec<Vec<u64>>,
}

impl ChordMatrix {
    /// Build the matrix from the `top_n` most common pairs among relationship
    /// aggregates of the given kind.
    ///
    /// Each relationship contributes its `works_num` to every pair it names;
    /// `A/B` and `B/A` land in the same cells.
    pub fn from_relationships<'a, I>(aggregates: I, kind: RelationshipKind, top_n: usize) -> Self
    where
        I: IntoIterator<Item = &'a NonFandomTagAggregate>,
    {
        let mut pair_counts: HashMap<(String, String), u64> = HashMap::new();
        for agg in aggregates {
            if agg.tag_type != TagType::Relationship
                || RelationshipKind::classify(&agg.tag_name) != Some(kind)
            {
                continue;
            }
            for pair in character_pairs(&agg.tag_name, kind) {
                *pair_counts.entry(pair).or_insert(0) += agg.works_num;
            }
        }

        let mut top: Vec<((String, String), u64)> = pair_counts.into_iter().collect();
        top.sort_by(|(a_pair, a), (b_pair, b)| b.cmp(a).then_with(|| a_pair.cmp(b_pair)));
        top.truncate(top_n);

        let characters: Vec<String> = top
            .iter()
            .flat_map(|((a, b), _)| [a.clone(), b.clone()])
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let position: HashMap<&str, usize> = characters
            .iter()
            .enumerate()
            .map(|(i, c)| (c.as_str(), i))
            .collect();

        let mut values = vec![vec![0u64; characters.len()]; characters.len()];
        for ((a, b), count) in &top {
            let (i, j) = (position[a.as_str()], position[b.as_str()]);
            values[i][j] += count;
            values[j][i] += count;
        }

        Self { characters, values }
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }

    pub fn get(&self, a: &str, b: &str) -> u64 {
        let index = |name: &str| self.characters.iter().position(|c| c == name);
        match (index(a), index(b)) {
            (Some(i), Some(j)) => self.values[i][j],
            _ => 0,
        }
    }
}
