//! CLI parser and command dispatch.

mod config_cmd;
mod explore;
mod preprocess;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::analysis::{DEFAULT_CHORD_TOP_N, DEFAULT_PAIRING_LIMIT};
use crate::config::{load_settings_with_options, LoadOptions, Settings};

#[derive(Parser)]
#[command(name = "ao3stats")]
#[command(about = "Preprocess AO3 works and tags dumps into per-fandom statistics")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Resolve relative paths from current working directory instead of config file location
    #[arg(long, global = true)]
    cwd: bool,

    /// Artifact directory (overrides config and AO3STATS_OUTPUT_DIR)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Standardize tags, explode works and write the derived tables
    Preprocess {
        /// Works CSV (id, creation date, language, restricted, complete, word_count, tags)
        #[arg(long)]
        works: Option<PathBuf>,
        /// Tags CSV (id, type, name, canonical, cached_count, merger_id)
        #[arg(long)]
        tags: Option<PathBuf>,
        /// Keep fandoms with strictly more works than this
        #[arg(short, long, allow_hyphen_values = true)]
        minimum_work_count: Option<i64>,
        /// Also write the exploded works_tags table
        #[arg(long)]
        save_work_tags: bool,
        /// Work-id partitions for aggregation
        #[arg(short, long)]
        partitions: Option<usize>,
        /// Parquet files per artifact
        #[arg(long)]
        shards: Option<usize>,
        /// Parquet compression (snappy, zstd, none)
        #[arg(long)]
        compression: Option<String>,
    },

    /// List retained fandoms
    Fandoms {
        /// Sort order (popularity, alphabetical)
        #[arg(long, default_value = "popularity")]
        order: String,
        /// Number of fandoms to show (0 = all)
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// Show statistics for one fandom
    Fandom {
        /// Fandom name as it appears in `ao3stats fandoms`
        name: String,
        /// Tags to show per tag type
        #[arg(short, long, default_value = "10")]
        top: usize,
        /// Character pairs in the relationship matrices
        #[arg(long, default_value_t = DEFAULT_CHORD_TOP_N)]
        chord_top: usize,
    },

    /// Most popular relationship in each of the largest fandoms
    Pairings {
        /// Number of fandoms to show
        #[arg(short, long, default_value_t = DEFAULT_PAIRING_LIMIT)]
        limit: usize,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the loaded config file and resolved settings
    Show,
}

/// Preprocess flags that override resolved settings.
struct PreprocessOverrides {
    works: Option<PathBuf>,
    tags: Option<PathBuf>,
    minimum_work_count: Option<i64>,
    save_work_tags: bool,
    partitions: Option<usize>,
    shards: Option<usize>,
    compression: Option<String>,
}

impl PreprocessOverrides {
    fn apply(self, settings: &mut Settings) -> anyhow::Result<()> {
        if let Some(works) = self.works {
            settings.works_csv = Some(works);
        }
        if let Some(tags) = self.tags {
            settings.tags_csv = Some(tags);
        }
        if let Some(minimum) = self.minimum_work_count {
            settings.minimum_work_count = minimum;
        }
        if self.save_work_tags {
            settings.save_work_tags = true;
        }
        if let Some(partitions) = self.partitions {
            settings.partitions = partitions;
        }
        if let Some(shards) = self.shards {
            settings.shards = shards;
        }
        if let Some(ref codec) = self.compression {
            settings.compression = crate::storage::Compression::from_str(codec)
                .ok_or_else(|| anyhow::anyhow!("Unknown compression '{}'", codec))?;
        }
        Ok(())
    }
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config,
        use_cwd: cli.cwd,
    };
    let (mut settings, config) = load_settings_with_options(options).await?;

    // Command-line flags take precedence over environment and config
    if let Some(output) = cli.output {
        settings.output_dir = output;
    }

    match cli.command {
        Commands::Preprocess {
            works,
            tags,
            minimum_work_count,
            save_work_tags,
            partitions,
            shards,
            compression,
        } => {
            PreprocessOverrides {
                works,
                tags,
                minimum_work_count,
                save_work_tags,
                partitions,
                shards,
                compression,
            }
            .apply(&mut settings)?;
            preprocess::cmd_preprocess(&settings).await
        }
        Commands::Fandoms { order, limit } => explore::cmd_fandoms(&settings, &order, limit),
        Commands::Fandom {
            name,
            top,
            chord_top,
        } => explore::cmd_fandom(&settings, &name, top, chord_top),
        Commands::Pairings { limit } => explore::cmd_pairings(&settings, limit),
        Commands::Config { command } => match command {
            ConfigCommands::Show => config_cmd::cmd_config_show(&settings, &config),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_negative_minimum_parses() {
        let cli = Cli::try_parse_from([
            "ao3stats",
            "preprocess",
            "--works",
            "w.csv",
            "--minimum-work-count",
            "-5",
        ])
        .unwrap();
        match cli.command {
            Commands::Preprocess {
                minimum_work_count, ..
            } => assert_eq!(minimum_work_count, Some(-5)),
            _ => panic!("expected preprocess"),
        }
    }

    #[test]
    fn test_overrides_replace_settings() {
        let mut settings = Settings::default();
        PreprocessOverrides {
            works: Some(PathBuf::from("w.csv")),
            tags: None,
            minimum_work_count: Some(3),
            save_work_tags: true,
            partitions: Some(4),
            shards: None,
            compression: Some("zstd".to_string()),
        }
        .apply(&mut settings)
        .unwrap();
        assert_eq!(settings.works_csv, Some(PathBuf::from("w.csv")));
        assert_eq!(settings.minimum_work_count, 3);
        assert!(settings.save_work_tags);
        assert_eq!(settings.partitions, 4);
        assert_eq!(settings.shards, 1);
        assert_eq!(settings.compression, crate::storage::Compression::Zstd);
    }
}
