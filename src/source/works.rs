//! Streaming reader for the works table.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter};

use super::{Field, Header};
use crate::models::Work;
use crate::pipeline::PipelineError;

const TABLE: &str = "works";

#[derive(Debug, Clone, Copy)]
struct WorkColumns {
    id: Option<usize>,
    creation_date: usize,
    language: usize,
    complete: usize,
    word_count: usize,
    tags: usize,
}

impl WorkColumns {
    fn from_header(header: &Header) -> Result<Self, PipelineError> {
        Ok(Self {
            id: header.find("id"),
            creation_date: header.require("creation date")?,
            language: header.require("language")?,
            complete: header.require("complete")?,
            word_count: header.require("word_count")?,
            tags: header.require("tags")?,
        })
    }
}

/// Iterates works one record at a time.
///
/// When the table has no `id` column the zero-based row position is used as
/// the work id.
pub struct WorksReader<R = File> {
    records: StringRecordsIntoIter<R>,
    columns: WorkColumns,
    row: i64,
}

impl WorksReader<File> {
    pub fn open(path: &Path) -> Result<Self, PipelineError> {
        let file = File::open(path).map_err(|e| PipelineError::io(path, e))?;
        Self::from_reader(file)
    }
}

impl<R: Read> WorksReader<R> {
    /// Read the header and validate required columns.
    pub fn from_reader(reader: R) -> Result<Self, PipelineError> {
        let mut csv = ReaderBuilder::new().flexible(true).from_reader(reader);
        let header = csv
            .headers()
            .map_err(|source| PipelineError::Csv { table: TABLE, source })?;
        let columns = WorkColumns::from_header(&Header::new(TABLE, header))?;
        if columns.id.is_none() {
            tracing::debug!("works table has no id column; using row position");
        }
        Ok(Self {
            records: csv.into_records(),
            columns,
            row: 0,
        })
    }

    fn parse(&self, record: &StringRecord, row: i64) -> Result<Work, PipelineError> {
        let line = record
            .position()
            .map(|p| p.line())
            .unwrap_or(row as u64 + 2);
        let field = |column, index| Field::of(TABLE, record, line, column, index);
        let c = &self.columns;

        let work_id = match c.id {
            Some(i) => field("id", i).int()?,
            None => row,
        };

        let mut work = Work::new(
            work_id,
            field("creation date", c.creation_date).date()?,
            field("word_count", c.word_count).opt_count()?,
        );
        work.language = field("language", c.language).value.to_string();
        work.is_complete = field("complete", c.complete).bool()?;
        Ok(work.with_tags(field("tags", c.tags).value))
    }
}

impl<R: Read> Iterator for WorksReader<R> {
    type Item = Result<Work, PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.records.next()?;
        let row = self.row;
        self.row += 1;
        Some(
            record
                .map_err(|source| PipelineError::Csv { table: TABLE, source })
                .and_then(|record| self.parse(&record, row)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn read(csv: &str) -> Result<Vec<Work>, PipelineError> {
        WorksReader::from_reader(csv.as_bytes())?.collect()
    }

    #[test]
    fn test_reads_dump_without_id_column() {
        let csv = "creation date,language,restricted,complete,word_count,tags,\n\
                   2021-02-26,en,false,true,388,10+414093+1001939+4577144+1499536,\n\
                   2021-02-26,en,false,true,1638,10+20350917+34816907,\n";
        let works = read(csv).unwrap();
        assert_eq!(works.len(), 2);
        assert_eq!(works[0].work_id, 0);
        assert_eq!(works[1].work_id, 1);
        assert_eq!(
            works[0].creation_date,
            NaiveDate::from_ymd_opt(2021, 2, 26).unwrap()
        );
        assert_eq!(works[0].language, "en");
        assert!(works[0].is_complete);
        assert_eq!(works[0].word_count, Some(388));
        assert_eq!(works[0].raw_tag_ids, vec![10, 414093, 1001939, 4577144, 1499536]);
    }

    #[test]
    fn test_uses_id_column_when_present() {
        let csv = "id,creation date,language,complete,word_count,tags\n\
                   77,2020-01-01,en,False,,\n";
        let works = read(csv).unwrap();
        assert_eq!(works[0].work_id, 77);
        assert!(!works[0].is_complete);
        assert_eq!(works[0].word_count, None);
        assert!(!works[0].has_tags());
    }

    #[test]
    fn test_float_word_count() {
        let csv = "creation date,language,complete,word_count,tags\n\
                   2020-01-01,en,true,1200.0,1\n";
        assert_eq!(read(csv).unwrap()[0].word_count, Some(1200));
    }

    #[test]
    fn test_missing_column() {
        let csv = "creation date,language,complete,tags\n2020-01-01,en,true,1\n";
        let err = WorksReader::from_reader(csv.as_bytes()).err().unwrap();
        assert!(matches!(
            err,
            PipelineError::MissingColumn {
                table: "works",
                column: "word_count"
            }
        ));
    }

    #[test]
    fn test_invalid_value_reports_line_and_column() {
        let csv = "creation date,language,complete,word_count,tags\n\
                   2020-01-01,en,true,10,1\n\
                   not-a-date,en,true,10,1\n";
        let err = read(csv).unwrap_err();
        match err {
            PipelineError::InvalidValue {
                table,
                line,
                column,
                value,
            } => {
                assert_eq!(table, "works");
                assert_eq!(line, 3);
                assert_eq!(column, "creation date");
                assert_eq!(value, "not-a-date");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_negative_word_count_rejected() {
        let csv = "creation date,language,complete,word_count,tags\n\
                   2020-01-01,en,true,-5,1\n";
        assert!(matches!(
            read(csv).unwrap_err(),
            PipelineError::InvalidValue { column: "word_count", .. }
        ));
    }
}
