//! Shared utility functions.
//!
//! - `format`: Human-readable formatting (sizes, counts)
//! - `intern`: Shared storage for repeated strings

mod format;
mod intern;

pub use format::{format_count, format_size};
pub use intern::StringInterner;
