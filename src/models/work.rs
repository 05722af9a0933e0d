//! Works as published in the works table of the data dump.

use chrono::NaiveDate;

/// Delimiter between tag ids in the works table `tags` column.
pub const TAG_LIST_DELIMITER: char = '+';

/// One row of the works table.
#[derive(Debug, Clone, PartialEq)]
pub struct Work {
    pub work_id: i64,
    pub creation_date: NaiveDate,
    pub language: String,
    pub is_complete: bool,
    /// Missing in a small share of the dump.
    pub word_count: Option<u64>,
    /// Tag ids in source order.
    pub raw_tag_ids: Vec<i64>,
    /// Tokens in the tag list that were not integers.
    pub malformed_tag_refs: usize,
}

impl Work {
    pub fn new(work_id: i64, creation_date: NaiveDate, word_count: Option<u64>) -> Self {
        Self {
            work_id,
            creation_date,
            language: String::new(),
            is_complete: false,
            word_count,
            raw_tag_ids: Vec::new(),
            malformed_tag_refs: 0,
        }
    }

    /// Builder-style helper setting the tag list from its source encoding.
    pub fn with_tags(mut self, raw: &str) -> Self {
        let (ids, malformed) = parse_tag_list(raw);
        self.raw_tag_ids = ids;
        self.malformed_tag_refs = malformed;
        self
    }

    pub fn has_tags(&self) -> bool {
        !self.raw_tag_ids.is_empty() || self.malformed_tag_refs > 0
    }
}

/// Split a '+'-delimited tag list into ids.
///
/// Returns the parsed ids and the number of tokens that could not be parsed.
/// An empty or blank field yields no ids at all.
pub fn parse_tag_list(raw: &str) -> (Vec<i64>, usize) {
    let raw = raw.trim();
    if raw.is_empty() {
        return (Vec::new(), 0);
    }

    let mut ids = Vec::new();
    let mut malformed = 0;
    for token in raw.split(TAG_LIST_DELIMITER) {
        match token.trim().parse::<i64>() {
            Ok(id) => ids.push(id),
            Err(_) => malformed += 1,
        }
    }
    (ids, malformed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tag_list() {
        assert_eq!(parse_tag_list("10+11+12"), (vec![10, 11, 12], 0));
    }

    #[test]
    fn test_parse_tag_list_strips_whitespace() {
        assert_eq!(parse_tag_list("  10+11 \n"), (vec![10, 11], 0));
    }

    #[test]
    fn test_parse_tag_list_empty() {
        assert_eq!(parse_tag_list(""), (vec![], 0));
        assert_eq!(parse_tag_list("   "), (vec![], 0));
    }

    #[test]
    fn test_parse_tag_list_malformed_tokens() {
        assert_eq!(parse_tag_list("10++abc+11"), (vec![10, 11], 2));
    }

    #[test]
    fn test_work_with_tags() {
        let date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let work = Work::new(1, date, Some(500)).with_tags("10+11");
        assert_eq!(work.raw_tag_ids, vec![10, 11]);
        assert!(work.has_tags());
        assert!(!Work::new(2, date, None).has_tags());
    }
}
