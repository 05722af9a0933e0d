//! Word-count histogram bins.

use std::fmt;

/// Right-closed word-count bins: fine steps up to `low_upper`, coarse steps
/// up to `high_upper`, then one open-ended bin.
///
/// With the defaults the bins are `<1k`, `1k to 2k`, ..., `4k to 5k`,
/// `5k to 10k`, ..., `95k to 100k`, `>100k`. The first bin includes zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordCountBins {
    /// Finite upper edges; the last bin has no upper edge.
    edges: Vec<u64>,
    labels: Vec<String>,
}

/// One histogram bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinCount {
    pub label: String,
    pub works: u64,
}

impl Default for WordCountBins {
    fn default() -> Self {
        Self::new(5_000, 1_000, 100_000, 5_000)
    }
}

impl WordCountBins {
    /// Build bins. Zero steps are treated as one.
    pub fn new(low_upper: u64, low_step: u64, high_upper: u64, high_step: u64) -> Self {
        let low_step = low_step.max(1);
        let high_step = high_step.max(1);

        let mut edges = vec![0];
        let mut edge = low_step;
        while edge < low_upper {
            edges.push(edge);
            edge += low_step;
        }
        let mut edge = low_upper.max(low_step);
        while edge < high_upper {
            if edges.last().is_some_and(|last| *last < edge) {
                edges.push(edge);
            }
            edge += high_step;
        }
        if edges.last().is_some_and(|last| *last < high_upper) {
            edges.push(high_upper);
        }

        let mut labels = Vec::with_capacity(edges.len());
        labels.push(format!("<{}", format_thousand(edges[1.min(edges.len() - 1)])));
        for pair in edges[1..].windows(2) {
            labels.push(format!(
                "{} to {}",
                format_thousand(pair[0]),
                format_thousand(pair[1])
            ));
        }
        labels.push(format!(">{}", format_thousand(high_upper)));

        // edges[0] is the lower bound of the first bin; upper edges follow.
        edges.remove(0);
        Self { edges, labels }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Index of the bin holding `word_count`.
    pub fn bin_of(&self, word_count: u64) -> usize {
        self.edges.partition_point(|&upper| upper < word_count)
    }

    /// Count word counts per bin. Every bin is present, empty ones with zero.
    pub fn histogram(&self, word_counts: impl IntoIterator<Item = u64>) -> Vec<BinCount> {
        let mut counts = vec![0u64; self.len()];
        for wc in word_counts {
            counts[self.bin_of(wc)] += 1;
        }
        self.labels
            .iter()
            .cloned()
            .zip(counts)
            .map(|(label, works)| BinCount { label, works })
            .collect()
    }
}

impl fmt::Display for BinCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.label, self.works)
    }
}

/// `1000` -> `1k`, `1500` -> `1.5k`, `999` -> `999`.
pub fn format_thousand(n: u64) -> String {
    if n < 1_000 {
        return n.to_string();
    }
    if n % 1_000 == 0 {
        format!("{}k", n / 1_000)
    } else {
        let k = format!("{:.1}", n as f64 / 1_000.0);
        format!("{}k", k.trim_end_matches('0').trim_end_matches('.'))
    }
}
