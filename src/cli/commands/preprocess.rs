//! The `preprocess` command.

use std::sync::Arc;

use console::style;

use crate::cli::icons::{dim_arrow, success, warn};
use crate::cli::progress::SpinnerReporter;
use crate::config::Settings;
use crate::pipeline::Pipeline;
use crate::utils::{format_count, format_size};

/// Run the pipeline and commit artifacts to the output directory.
pub async fn cmd_preprocess(settings: &Settings) -> anyhow::Result<()> {
    // Threshold, partition and shard checks happen before any input is read
    let options = settings.pipeline_options()?;

    let works_csv = settings.works_csv.clone().ok_or_else(|| {
        anyhow::anyhow!("No works CSV configured. Pass --works or set works_csv in the config.")
    })?;
    let tags_csv = settings.tags_csv.clone().ok_or_else(|| {
        anyhow::anyhow!("No tags CSV configured. Pass --tags or set tags_csv in the config.")
    })?;
    let output_dir = settings.output_dir.clone();

    let reporter = Arc::new(SpinnerReporter::new());
    let pipeline = Pipeline::new(options).with_reporter(reporter.clone());

    let result =
        tokio::task::spawn_blocking(move || pipeline.run(&works_csv, &tags_csv, &output_dir))
            .await?;
    reporter.finish();
    let run = result?;

    let stats = &run.outputs.explosion;
    println!(
        "{} Processed {} works and {} tags",
        success(),
        format_count(stats.works),
        format_count(run.outputs.tags_read as u64)
    );
    println!(
        "  {} {} (work, tag) rows from {} references",
        dim_arrow(),
        format_count(stats.rows),
        format_count(stats.references)
    );
    println!(
        "  {} {} fandoms kept (more than {} works), {} dropped",
        dim_arrow(),
        format_count(run.outputs.fandom_counts.len() as u64),
        settings.minimum_work_count,
        format_count(run.outputs.dropped_fandoms as u64)
    );

    let skipped = stats.malformed + stats.unresolved;
    if skipped > 0 {
        println!(
            "  {} {} tag references skipped ({} malformed, {} unknown ids)",
            warn(),
            format_count(skipped),
            format_count(stats.malformed),
            format_count(stats.unresolved)
        );
    }

    println!(
        "{} Wrote {} artifacts ({}) to {}",
        success(),
        run.summary.artifacts.len(),
        format_size(run.summary.total_bytes()),
        style(settings.output_dir.display()).cyan()
    );
    for artifact in &run.summary.artifacts {
        println!(
            "  {} {:<22} {:>12} rows  {}",
            dim_arrow(),
            artifact.table,
            format_count(artifact.rows),
            format_size(artifact.bytes)
        );
    }

    Ok(())
}
