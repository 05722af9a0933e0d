//! Command-line interface for ao3stats.

mod commands;
pub mod icons;
pub mod progress;

pub use commands::{is_verbose, run};
