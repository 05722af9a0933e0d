//! Configuration commands.

use console::style;

use crate::cli::icons::dim_arrow;
use crate::config::{Config, Settings, MINIMUM_WORK_COUNT_ENV, OUTPUT_DIR_ENV};

/// Print the config file in use and the settings it resolves to.
pub fn cmd_config_show(settings: &Settings, config: &Config) -> anyhow::Result<()> {
    match config.source_path {
        Some(ref path) => println!("{} {}", style("Config file:").bold(), path.display()),
        None => println!(
            "{} {}",
            style("Config file:").bold(),
            style("none found, using defaults").dim()
        ),
    }

    let optional = |path: &Option<std::path::PathBuf>| {
        path.as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(not set)".to_string())
    };

    println!();
    println!("{}", style("Resolved settings").bold());
    let rows = [
        ("works_csv", optional(&settings.works_csv)),
        ("tags_csv", optional(&settings.tags_csv)),
        ("output_dir", settings.output_dir.display().to_string()),
        ("minimum_work_count", settings.minimum_work_count.to_string()),
        ("save_work_tags", settings.save_work_tags.to_string()),
        ("partitions", settings.partitions.to_string()),
        ("shards", settings.shards.to_string()),
        ("compression", settings.compression.as_str().to_string()),
    ];
    for (key, value) in rows {
        println!("  {} {:<20} {}", dim_arrow(), key, value);
    }

    for name in [OUTPUT_DIR_ENV, MINIMUM_WORK_COUNT_ENV] {
        if let Ok(value) = std::env::var(name) {
            println!(
                "  {} {}",
                style(format!("{} is set:", name)).yellow(),
                value
            );
        }
    }

    if config.source_path.is_some() {
        println!();
        println!("{}", style("File contents").bold());
        println!("{}", serde_json::to_string_pretty(config)?);
    }

    Ok(())
}
