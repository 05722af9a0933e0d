//! Reader for the tags table.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;

use super::{Field, Header};
use crate::models::{Tag, TagType};
use crate::pipeline::PipelineError;

const TABLE: &str = "tags";

/// Load the whole tags table.
pub fn read_tags(path: &Path) -> Result<Vec<Tag>, PipelineError> {
    let file = File::open(path).map_err(|e| PipelineError::io(path, e))?;
    read_tags_from(file)
}

pub fn read_tags_from<R: Read>(reader: R) -> Result<Vec<Tag>, PipelineError> {
    let mut csv = ReaderBuilder::new().flexible(true).from_reader(reader);
    let header = Header::new(
        TABLE,
        csv.headers()
            .map_err(|source| PipelineError::Csv { table: TABLE, source })?,
    );
    let id = header.require("id")?;
    let tag_type = header.require("type")?;
    let name = header.require("name")?;
    let canonical = header.require("canonical")?;
    let merger_id = header.require("merger_id")?;
    let cached_count = header.find("cached_count");

    let mut tags = Vec::new();
    for (row, record) in csv.records().enumerate() {
        let record = record.map_err(|source| PipelineError::Csv { table: TABLE, source })?;
        let line = record
            .position()
            .map(|p| p.line())
            .unwrap_or(row as u64 + 2);
        let field = |column, index| Field::of(TABLE, &record, line, column, index);

        tags.push(Tag {
            tag_id: field("id", id).int()?,
            tag_type: TagType::from_str(field("type", tag_type).value),
            name: field("name", name).value.to_string(),
            is_canonical: field("canonical", canonical).bool()?,
            merger_id: field("merger_id", merger_id).opt_int()?,
            cached_count: match cached_count {
                Some(i) => field("cached_count", i).opt_int()?,
                None => None,
            },
        });
    }

    tracing::debug!("Read {} tags", tags.len());
    Ok(tags)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_dump_format() {
        let csv = "id,type,name,canonical,cached_count,merger_id\n\
                   1,Media,TV Shows,true,910,\n\
                   10,Rating,Not Rated,true,826,\n\
                   41,Freeform,Redacted,false,0,42.0\n";
        let tags = read_tags_from(csv.as_bytes()).unwrap();
        assert_eq!(tags.len(), 3);
        assert_eq!(tags[0].tag_type, TagType::Media);
        assert_eq!(tags[0].merger_id, None);
        assert_eq!(tags[0].cached_count, Some(910));
        assert_eq!(tags[1].name, "Not Rated");
        assert!(tags[1].is_canonical);
        assert!(tags[2].is_redacted());
        assert!(!tags[2].is_canonical);
        assert_eq!(tags[2].merger_id, Some(42));
    }

    #[test]
    fn test_cached_count_is_optional() {
        let csv = "id,type,name,canonical,merger_id\n5,Fandom,Foo,T,\n";
        let tags = read_tags_from(csv.as_bytes()).unwrap();
        assert_eq!(tags[0].cached_count, None);
        assert_eq!(tags[0].tag_type, TagType::Fandom);
    }

    #[test]
    fn test_missing_merger_column() {
        let csv = "id,type,name,canonical\n5,Fandom,Foo,true\n";
        assert!(matches!(
            read_tags_from(csv.as_bytes()).unwrap_err(),
            PipelineError::MissingColumn {
                table: "tags",
                column: "merger_id"
            }
        ));
    }

    #[test]
    fn test_invalid_canonical() {
        let csv = "id,type,name,canonical,merger_id\n5,Fandom,Foo,maybe,\n";
        assert!(matches!(
            read_tags_from(csv.as_bytes()).unwrap_err(),
            PipelineError::InvalidValue {
                column: "canonical",
                line: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_tags(&dir.path().join("tags.csv")).unwrap_err();
        assert!(matches!(err, PipelineError::Io { .. }));
    }
}
