//! Progress and data-quality reporting for pipeline stages.
//!
//! Stages never log through global state directly. Each stage receives a
//! `&dyn PipelineReporter` and emits `PipelineEvent`s; the caller decides
//! whether those become tracing output, a progress spinner, or a list a test
//! can assert on.

use std::fmt;
use std::path::PathBuf;
use std::sync::Mutex;

/// Named pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    ReadTags,
    Standardize,
    Explode,
    Fandoms,
    Aggregate,
    Store,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReadTags => "read_tags",
            Self::Standardize => "standardize",
            Self::Explode => "explode",
            Self::Fandoms => "fandoms",
            Self::Aggregate => "aggregate",
            Self::Store => "store",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why rows left the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DropReason {
    /// Tag id not present in the tags table.
    UnresolvedTag,
    /// Tag list token that is not an integer.
    MalformedTagRef,
    /// Effective type outside the retained set.
    UntrackedType,
    /// Effective name is the redaction sentinel.
    Redacted,
    /// Fandom at or below the minimum work count.
    UnpopularFandom,
    /// Work with no retained fandom.
    WorkWithoutFandom,
    /// Exact duplicate of an earlier row.
    Duplicate,
}

impl DropReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnresolvedTag => "unresolved tag",
            Self::MalformedTagRef => "malformed tag reference",
            Self::UntrackedType => "untracked tag type",
            Self::Redacted => "redacted tag",
            Self::UnpopularFandom => "fandom below minimum",
            Self::WorkWithoutFandom => "work without retained fandom",
            Self::Duplicate => "duplicate row",
        }
    }
}

/// Events emitted by stages.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    StageStarted {
        stage: Stage,
    },
    RowsDropped {
        stage: Stage,
        reason: DropReason,
        count: u64,
    },
    StageCompleted {
        stage: Stage,
        rows_in: u64,
        rows_out: u64,
    },
    ArtifactWritten {
        table: &'static str,
        path: PathBuf,
        rows: u64,
        bytes: u64,
    },
}

/// Sink for pipeline events.
pub trait PipelineReporter: Send + Sync {
    fn report(&self, event: PipelineEvent);

    fn stage_started(&self, stage: Stage) {
        self.report(PipelineEvent::StageStarted { stage });
    }

    fn stage_completed(&self, stage: Stage, rows_in: u64, rows_out: u64) {
        self.report(PipelineEvent::StageCompleted {
            stage,
            rows_in,
            rows_out,
        });
    }

    /// Report dropped rows. Zero counts are not reported.
    fn rows_dropped(&self, stage: Stage, reason: DropReason, count: u64) {
        if count > 0 {
            self.report(PipelineEvent::RowsDropped {
                stage,
                reason,
                count,
            });
        }
    }
}

/// Forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl PipelineReporter for TracingReporter {
    fn report(&self, event: PipelineEvent) {
        match event {
            PipelineEvent::StageStarted { stage } => {
                tracing::debug!("Stage {} started", stage);
            }
            PipelineEvent::RowsDropped {
                stage,
                reason: DropReason::Redacted,
                count,
            } => {
                tracing::info!(
                    "{}: dropped {} rows with redacted tags and no canonical alternative",
                    stage,
                    count
                );
            }
            PipelineEvent::RowsDropped {
                stage,
                reason,
                count,
            } => {
                tracing::debug!("{}: dropped {} rows ({})", stage, count, reason.as_str());
            }
            PipelineEvent::StageCompleted {
                stage,
                rows_in,
                rows_out,
            } => {
                tracing::info!("Stage {} complete: {} rows in, {} rows out", stage, rows_in, rows_out);
            }
            PipelineEvent::ArtifactWritten {
                table,
                path,
                rows,
                bytes,
            } => {
                tracing::info!(
                    "Wrote {} ({} rows, {} bytes) to {}",
                    table,
                    rows,
                    bytes,
                    path.display()
                );
            }
        }
    }
}

/// Records every event. Used by tests and by callers that print a summary.
#[derive(Debug, Default)]
pub struct CollectingReporter {
    events: Mutex<Vec<PipelineEvent>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Total rows dropped by `stage` for `reason`.
    pub fn dropped(&self, stage: Stage, reason: DropReason) -> u64 {
        self.events()
            .iter()
            .filter_map(|e| match e {
                PipelineEvent::RowsDropped {
                    stage: s,
                    reason: r,
                    count,
                } if *s == stage && *r == reason => Some(*count),
                _ => None,
            })
            .sum()
    }

    /// Whether `stage` reported completion.
    pub fn completed(&self, stage: Stage) -> bool {
        self.events()
            .iter()
            .any(|e| matches!(e, PipelineEvent::StageCompleted { stage: s, .. } if *s == stage))
    }
}

impl PipelineReporter for CollectingReporter {
    fn report(&self, event: PipelineEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_drops_are_not_reported() {
        let reporter = CollectingReporter::new();
        reporter.rows_dropped(Stage::Explode, DropReason::Redacted, 0);
        assert!(reporter.events().is_empty());
    }

    #[test]
    fn test_dropped_sums_matching_events() {
        let reporter = CollectingReporter::new();
        reporter.rows_dropped(Stage::Explode, DropReason::Redacted, 2);
        reporter.rows_dropped(Stage::Explode, DropReason::Redacted, 3);
        reporter.rows_dropped(Stage::Explode, DropReason::UnresolvedTag, 7);
        assert_eq!(reporter.dropped(Stage::Explode, DropReason::Redacted), 5);
        assert_eq!(reporter.dropped(Stage::Explode, DropReason::UnresolvedTag), 7);
        assert_eq!(reporter.dropped(Stage::Fandoms, DropReason::Redacted), 0);
    }

    #[test]
    fn test_completed() {
        let reporter = CollectingReporter::new();
        reporter.stage_started(Stage::Fandoms);
        assert!(!reporter.completed(Stage::Fandoms));
        reporter.stage_completed(Stage::Fandoms, 10, 4);
        assert!(reporter.completed(Stage::Fandoms));
    }
}
