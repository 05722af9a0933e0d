//! Spinner display for pipeline runs.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::pipeline::{PipelineEvent, PipelineReporter, TracingReporter};
use crate::utils::{format_count, format_size};

/// Shows the running stage on a spinner and forwards every event to
/// [`TracingReporter`].
pub struct SpinnerReporter {
    bar: ProgressBar,
}

impl SpinnerReporter {
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            bar.set_style(style);
        }
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for SpinnerReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineReporter for SpinnerReporter {
    fn report(&self, event: PipelineEvent) {
        match &event {
            PipelineEvent::StageStarted { stage } => {
                self.bar.set_message(format!("Running {}...", stage));
            }
            PipelineEvent::StageCompleted {
                stage, rows_out, ..
            } => {
                self.bar.set_message(format!(
                    "Finished {} ({} rows)",
                    stage,
                    format_count(*rows_out)
                ));
            }
            PipelineEvent::ArtifactWritten {
                table, rows, bytes, ..
            } => {
                self.bar.set_message(format!(
                    "Wrote {} ({} rows, {})",
                    table,
                    format_count(*rows),
                    format_size(*bytes)
                ));
            }
            PipelineEvent::RowsDropped { .. } => {}
        }
        TracingReporter.report(event);
    }
}
