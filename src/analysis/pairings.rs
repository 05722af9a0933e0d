//! Most popular pairing per fandom.

use std::collections::HashMap;
use std::sync::Arc;

use crate::models::{FandomWorkCount, NonFandomTagAggregate, TagType};

/// Default number of fandoms in the pairing overview.
pub const DEFAULT_PAIRING_LIMIT: usize = 100;

/// A fandom's most used relationship tag and its share of the fandom.
#[derive(Debug, Clone, PartialEq)]
pub struct PairingPopularity {
    pub fandom_name: Arc<str>,
    pub relationship: Arc<str>,
    /// Works tagged with the relationship.
    pub works_num: u64,
    /// All works in the fandom.
    pub fandom_works: u64,
    /// `works_num / fandom_works`.
    pub pct_of_fandom: f64,
}

/// For each fandom, the relationship with the most works, largest fandoms
/// first, limited to `limit` fandoms.
///
/// Ties between relationships go to the one listed first in `aggregates`.
/// Fandoms without a work count are skipped.
pub fn most_popular_pairings(
    aggregates: &[NonFandomTagAggregate],
    fandom_counts: &[FandomWorkCount],
    limit: usize,
) -> Vec<PairingPopularity> {
    let mut best: HashMap<&str, &NonFandomTagAggregate> = HashMap::new();
    for agg in aggregates.iter().filter(|a| a.tag_type == TagType::Relationship) {
        best.entry(&*agg.fandom_name)
            .and_modify(|current| {
                if agg.works_num > current.works_num {
                    *current = agg;
                }
            })
            .or_insert(agg);
    }

    let totals: HashMap<&str, u64> = fandom_counts
        .iter()
        .map(|c| (&*c.fandom_name, c.works_num))
        .collect();

    let mut pairings: Vec<PairingPopularity> = best
        .into_values()
        .filter_map(|agg| {
            let fandom_works = *totals.get(&*agg.fandom_name)?;
            let pct_of_fandom = if fandom_works == 0 {
                0.0
            } else {
                agg.works_num as f64 / fandom_works as f64
            };
            Some(PairingPopularity {
                fandom_name: Arc::clone(&agg.fandom_name),
                relationship: Arc::clone(&agg.tag_name),
                works_num: agg.works_num,
                fandom_works,
                pct_of_fandom,
            })
        })
        .collect();

    pairings.sort_by(|a, b| {
        b.fandom_works
            .cmp(&a.fandom_works)
            .then_with(|| a.fandom_name.cmp(&b.fandom_name))
    });
    pairings.truncate(limit);
    pairings
}
