//! Readers for the works and tags CSV tables of the data dump.

mod tags;
mod works;

pub use tags::{read_tags, read_tags_from};
pub use works::WorksReader;

use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;

use crate::pipeline::PipelineError;

/// Positions of named columns in a CSV header.
#[derive(Debug, Clone)]
pub(crate) struct Header {
    table: &'static str,
    names: Vec<String>,
}

impl Header {
    pub(crate) fn new(table: &'static str, record: &StringRecord) -> Self {
        Self {
            table,
            names: record.iter().map(|h| h.trim().to_string()).collect(),
        }
    }

    pub(crate) fn find(&self, column: &str) -> Option<usize> {
        self.names.iter().position(|n| n == column)
    }

    pub(crate) fn require(&self, column: &'static str) -> Result<usize, PipelineError> {
        self.find(column).ok_or(PipelineError::MissingColumn {
            table: self.table,
            column,
        })
    }
}

/// One field of one record, with enough context to build a useful error.
pub(crate) struct Field<'a> {
    pub table: &'static str,
    pub line: u64,
    pub column: &'static str,
    pub value: &'a str,
}

impl<'a> Field<'a> {
    pub(crate) fn of(
        table: &'static str,
        record: &'a StringRecord,
        line: u64,
        column: &'static str,
        index: usize,
    ) -> Self {
        Self {
            table,
            line,
            column,
            value: record.get(index).unwrap_or("").trim(),
        }
    }

    pub(crate) fn invalid(&self) -> PipelineError {
        PipelineError::InvalidValue {
            table: self.table,
            line: self.line,
            column: self.column,
            value: self.value.to_string(),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        is_null(self.value)
    }

    pub(crate) fn int(&self) -> Result<i64, PipelineError> {
        parse_int(self.value).ok_or_else(|| self.invalid())
    }

    pub(crate) fn opt_int(&self) -> Result<Option<i64>, PipelineError> {
        if self.is_empty() {
            return Ok(None);
        }
        self.int().map(Some)
    }

    pub(crate) fn opt_count(&self) -> Result<Option<u64>, PipelineError> {
        match self.opt_int()? {
            Some(n) => u64::try_from(n).map(Some).map_err(|_| self.invalid()),
            None => Ok(None),
        }
    }

    pub(crate) fn bool(&self) -> Result<bool, PipelineError> {
        parse_bool(self.value).ok_or_else(|| self.invalid())
    }

    pub(crate) fn date(&self) -> Result<NaiveDate, PipelineError> {
        parse_date(self.value).ok_or_else(|| self.invalid())
    }
}

fn is_null(value: &str) -> bool {
    let v = value.trim();
    v.is_empty() || v.eq_ignore_ascii_case("nan") || v.eq_ignore_ascii_case("null")
}

/// Parse an integer, accepting float notation with no fractional part
/// ("123.0").
pub(crate) fn parse_int(value: &str) -> Option<i64> {
    let v = value.trim();
    if let Ok(n) = v.parse::<i64>() {
        return Some(n);
    }
    let f = v.parse::<f64>().ok()?;
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 9.007_199_254_740_992e15 {
        Some(f as i64)
    } else {
        None
    }
}

pub(crate) fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "1" => Some(true),
        "false" | "f" | "0" => Some(false),
        _ => None,
    }
}

/// Parse a date, ignoring any time-of-day component.
pub(crate) fn parse_date(value: &str) -> Option<NaiveDate> {
    let v = value.trim();
    if let Ok(d) = NaiveDate::parse_from_str(v, "%Y-%m-%d") {
        return Some(d);
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(v, fmt).ok())
        .map(|dt| dt.date())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int("42"), Some(42));
        assert_eq!(parse_int(" 42 "), Some(42));
        assert_eq!(parse_int("123.0"), Some(123));
        assert_eq!(parse_int("-7"), Some(-7));
        assert_eq!(parse_int("1.5"), None);
        assert_eq!(parse_int("abc"), None);
        assert_eq!(parse_int(""), None);
        assert_eq!(parse_int("NaN"), None);
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool("True"), Some(true));
        assert_eq!(parse_bool("T"), Some(true));
        assert_eq!(parse_bool("1"), Some(true));
        assert_eq!(parse_bool("FALSE"), Some(false));
        assert_eq!(parse_bool("f"), Some(false));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("yes"), None);
    }

    #[test]
    fn test_parse_date() {
        let expected = NaiveDate::from_ymd_opt(2021, 2, 26);
        assert_eq!(parse_date("2021-02-26"), expected);
        assert_eq!(parse_date("2021-02-26 13:45:00"), expected);
        assert_eq!(parse_date("2021-02-26T13:45:00"), expected);
        assert_eq!(parse_date("26/02/2021"), None);
    }

    #[test]
    fn test_header_lookup() {
        let record = StringRecord::from(vec!["id", " type ", "name"]);
        let header = Header::new("tags", &record);
        assert_eq!(header.find("type"), Some(1));
        assert!(matches!(
            header.require("canonical"),
            Err(PipelineError::MissingColumn {
                table: "tags",
                column: "canonical"
            })
        ));
    }
}
