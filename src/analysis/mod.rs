//! Chart data computed from stored artifacts.
//!
//! Nothing here renders; callers get plain numbers and labels.

mod bins;
mod fandom;
mod pairings;
mod relationships;

pub use bins::{format_thousand, BinCount, WordCountBins};
pub use fandom::{order_fandoms, FandomOrder, FandomProfile, MonthlyCount, WordCountStats};
pub use pairings::{most_popular_pairings, PairingPopularity, DEFAULT_PAIRING_LIMIT};
pub use relationships::{character_pairs, clean_character_name, ChordMatrix, RelationshipKind};

/// Default number of character pairs in a chord matrix.
pub const DEFAULT_CHORD_TOP_N: usize = 50;
