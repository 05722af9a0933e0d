//! Tag definitions as published in the tags table of the data dump.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Name the archive gives to tags whose text was removed.
pub const REDACTED_TAG_NAME: &str = "Redacted";

/// Tag categories that survive explosion. Everything else is dropped.
pub const RETAINED_TAG_TYPES: [TagType; 5] = [
    TagType::Fandom,
    TagType::Relationship,
    TagType::Freeform,
    TagType::ArchiveWarning,
    TagType::Rating,
];

/// Category of a tag.
///
/// Unknown categories are kept verbatim in `Other` so that standardization
/// stays total; they are filtered out during explosion.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TagType {
    Fandom,
    Relationship,
    Freeform,
    ArchiveWarning,
    Rating,
    Character,
    Category,
    Media,
    UnsortedTag,
    Other(Arc<str>),
}

impl TagType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Fandom => "Fandom",
            Self::Relationship => "Relationship",
            Self::Freeform => "Freeform",
            Self::ArchiveWarning => "ArchiveWarning",
            Self::Rating => "Rating",
            Self::Character => "Character",
            Self::Category => "Category",
            Self::Media => "Media",
            Self::UnsortedTag => "UnsortedTag",
            Self::Other(s) => s,
        }
    }

    /// Parse a type string from the dump. Never fails.
    pub fn from_str(s: &str) -> Self {
        match s.trim() {
            "Fandom" => Self::Fandom,
            "Relationship" => Self::Relationship,
            "Freeform" => Self::Freeform,
            "ArchiveWarning" | "ArchiveWarnings" => Self::ArchiveWarning,
            "Rating" => Self::Rating,
            "Character" => Self::Character,
            "Category" => Self::Category,
            "Media" => Self::Media,
            "UnsortedTag" => Self::UnsortedTag,
            other => Self::Other(Arc::from(other)),
        }
    }

    /// Whether rows of this type are kept after explosion.
    pub fn is_retained(&self) -> bool {
        RETAINED_TAG_TYPES.contains(self)
    }

    pub fn is_fandom(&self) -> bool {
        matches!(self, Self::Fandom)
    }
}

// Ordered by the textual name so sorted outputs match a string-keyed index.
impl Ord for TagType {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl PartialOrd for TagType {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for TagType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the tags table.
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub tag_id: i64,
    pub tag_type: TagType,
    pub name: String,
    pub is_canonical: bool,
    /// Canonical tag this one was merged into, if any.
    pub merger_id: Option<i64>,
    /// Usage count cached by the archive. Not used by the pipeline.
    pub cached_count: Option<i64>,
}

impl Tag {
    pub fn new(tag_id: i64, tag_type: TagType, name: impl Into<String>) -> Self {
        Self {
            tag_id,
            tag_type,
            name: name.into(),
            is_canonical: true,
            merger_id: None,
            cached_count: None,
        }
    }

    /// Builder-style helper marking this tag as an alias of `merger_id`.
    pub fn merged_into(mut self, merger_id: i64) -> Self {
        self.merger_id = Some(merger_id);
        self.is_canonical = false;
        self
    }

    pub fn is_redacted(&self) -> bool {
        self.name == REDACTED_TAG_NAME
    }
}
