//! Data models for works, tags, and the tables derived from them.

mod derived;
mod tag;
mod work;

pub use derived::{FandomWorkCount, NonFandomTagAggregate, WorkFandom, WorkTag};
pub use tag::{Tag, TagType, REDACTED_TAG_NAME, RETAINED_TAG_TYPES};
pub use work::{parse_tag_list, Work, TAG_LIST_DELIMITER};
