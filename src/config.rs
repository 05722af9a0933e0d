//! Configuration management.
//!
//! A config file is optional. It is found through `prefer` discovery or an
//! explicit `--config` path and may be TOML, YAML or JSON. Resolved values
//! live in [`Settings`]; environment variables override the file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::pipeline::{
    MinimumWorkCount, PipelineError, PipelineOptions, DEFAULT_MINIMUM_WORK_COUNT,
};
use crate::storage::{Compression, StorageOptions};

/// Environment variable overriding the output directory.
pub const OUTPUT_DIR_ENV: &str = "AO3STATS_OUTPUT_DIR";
/// Environment variable overriding the fandom popularity threshold.
pub const MINIMUM_WORK_COUNT_ENV: &str = "AO3STATS_MINIMUM_WORK_COUNT";

/// Name used for config discovery and the default output directory.
const APP_NAME: &str = "ao3stats";

/// Errors while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {format} config {path}: {message}")]
    Parse {
        path: PathBuf,
        format: &'static str,
        message: String,
    },

    #[error("unknown compression codec '{0}' (expected snappy, zstd or none)")]
    UnknownCompression(String),

    #[error("invalid {name} value '{value}'")]
    InvalidEnv { name: &'static str, value: String },
}

/// Contents of a config file. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub works_csv: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags_csv: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_work_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save_work_tags: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partitions: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shards: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression: Option<String>,

    /// File this config was loaded from.
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Discover a config file in the standard locations. Missing or
    /// unreadable files fall back to an empty config.
    pub async fn load() -> Self {
        let discovered = match prefer::load(APP_NAME).await {
            Ok(found) => found.source_path().map(|p| p.to_path_buf()),
            Err(_) => None,
        };
        let Some(path) = discovered else {
            return Self::default();
        };
        match Self::load_from_path(&path).await {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Ignoring config {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Load a config file, choosing the format by extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let mut config = Self::parse(path, &contents)?;
        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    fn parse(path: &Path, contents: &str) -> Result<Self, ConfigError> {
        let parse_error = |format: &'static str, message: String| ConfigError::Parse {
            path: path.to_path_buf(),
            format,
            message,
        };
        match path.extension().and_then(|e| e.to_str()).unwrap_or("json") {
            "toml" => toml::from_str(contents).map_err(|e| parse_error("TOML", e.to_string())),
            "yaml" | "yml" => {
                serde_yaml::from_str(contents).map_err(|e| parse_error("YAML", e.to_string()))
            }
            _ => serde_json::from_str(contents).map_err(|e| parse_error("JSON", e.to_string())),
        }
    }

    /// Directory of the config file, if one was loaded.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(Path::to_path_buf))
    }

    /// Copy configured values over `settings`.
    pub fn apply_to_settings(
        &self,
        settings: &mut Settings,
        base_dir: &Path,
    ) -> Result<(), ConfigError> {
        if let Some(ref works) = self.works_csv {
            settings.works_csv = Some(resolve_path(works, base_dir));
        }
        if let Some(ref tags) = self.tags_csv {
            settings.tags_csv = Some(resolve_path(tags, base_dir));
        }
        if let Some(ref output) = self.output_dir {
            settings.output_dir = resolve_path(output, base_dir);
        }
        if let Some(minimum) = self.minimum_work_count {
            settings.minimum_work_count = minimum;
        }
        if let Some(save) = self.save_work_tags {
            settings.save_work_tags = save;
        }
        if let Some(partitions) = self.partitions {
            settings.partitions = partitions;
        }
        if let Some(shards) = self.shards {
            settings.shards = shards;
        }
        if let Some(ref codec) = self.compression {
            settings.compression = Compression::from_str(codec)
                .ok_or_else(|| ConfigError::UnknownCompression(codec.clone()))?;
        }
        Ok(())
    }
}

/// Expand `~` and resolve relative paths against `base_dir`.
pub fn resolve_path(path_str: &str, base_dir: &Path) -> PathBuf {
    let expanded = shellexpand::tilde(path_str);
    let path = Path::new(expanded.as_ref());
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

/// Resolved settings for a run.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub works_csv: Option<PathBuf>,
    pub tags_csv: Option<PathBuf>,
    /// Where artifacts are written and read back from.
    pub output_dir: PathBuf,
    /// Kept signed so a negative value can be rejected with a pipeline error.
    pub minimum_work_count: i64,
    pub save_work_tags: bool,
    pub partitions: usize,
    pub shards: usize,
    pub compression: Compression,
}

impl Default for Settings {
    fn default() -> Self {
        // ~/Documents/ao3stats, else ~/ao3stats, else ./ao3stats
        let output_dir = dirs::document_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_NAME);

        Self {
            works_csv: None,
            tags_csv: None,
            output_dir,
            minimum_work_count: DEFAULT_MINIMUM_WORK_COUNT as i64,
            save_work_tags: false,
            partitions: 1,
            shards: 1,
            compression: Compression::default(),
        }
    }
}

impl Settings {
    /// Apply `AO3STATS_*` environment overrides.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_from(|name| std::env::var(name).ok())
    }

    fn apply_env_from<F>(&mut self, var: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| var(name).filter(|s| !s.trim().is_empty());

        if let Some(dir) = var(OUTPUT_DIR_ENV) {
            tracing::debug!("Using {} from environment: {}", OUTPUT_DIR_ENV, dir);
            let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            self.output_dir = resolve_path(&dir, &cwd);
        }
        if let Some(value) = var(MINIMUM_WORK_COUNT_ENV) {
            self.minimum_work_count =
                value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                    name: MINIMUM_WORK_COUNT_ENV,
                    value: value.clone(),
                })?;
        }
        Ok(())
    }

    /// Pipeline options for these settings. Fails on a negative threshold.
    pub fn pipeline_options(&self) -> Result<PipelineOptions, PipelineError> {
        Ok(PipelineOptions {
            minimum_work_count: MinimumWorkCount::new(self.minimum_work_count)?,
            partitions: self.partitions,
            save_work_tags: self.save_work_tags,
            storage: StorageOptions {
                compression: self.compression,
                shards: self.shards,
            },
        })
    }
}

/// Options for loading settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path (overrides discovery).
    pub config_path: Option<PathBuf>,
    /// Resolve relative paths against the CWD instead of the config directory.
    pub use_cwd: bool,
}

/// Load config and resolve settings: environment > config file > defaults.
/// Command-line flags are applied on top by the caller.
pub async fn load_settings_with_options(
    options: LoadOptions,
) -> Result<(Settings, Config), ConfigError> {
    let config = match options.config_path {
        Some(ref path) => Config::load_from_path(path).await?,
        None => Config::load().await,
    };

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let base_dir = if options.use_cwd {
        cwd
    } else {
        config.base_dir().unwrap_or(cwd)
    };

    let mut settings = Settings::default();
    config.apply_to_settings(&mut settings, &base_dir)?;
    settings.apply_env()?;

    Ok((settings, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_load_toml_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ao3stats.toml");
        std::fs::write(
            &path,
            "works_csv = \"data/works.csv\"\nminimum_work_count = 5\ncompression = \"zstd\"\n",
        )
        .unwrap();

        let config = Config::load_from_path(&path).await.unwrap();
        assert_eq!(config.works_csv.as_deref(), Some("data/works.csv"));
        assert_eq!(config.minimum_work_count, Some(5));
        assert_eq!(config.base_dir().as_deref(), Some(dir.path()));
    }

    #[tokio::test]
    async fn test_load_yaml_and_json_config() {
        let dir = tempdir().unwrap();
        let yaml = dir.path().join("config.yaml");
        std::fs::write(&yaml, "shards: 4\nsave_work_tags: true\n").unwrap();
        let config = Config::load_from_path(&yaml).await.unwrap();
        assert_eq!(config.shards, Some(4));
        assert_eq!(config.save_work_tags, Some(true));

        let json = dir.path().join("config.json");
        std::fs::write(&json, r#"{"partitions": 3}"#).unwrap();
        let config = Config::load_from_path(&json).await.unwrap();
        assert_eq!(config.partitions, Some(3));
    }

    #[tokio::test]
    async fn test_parse_error_names_format() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "minimum_work_count = [").unwrap();
        let err = Config::load_from_path(&path).await.unwrap_err();
        assert!(matches!(err, ConfigError::Parse { format: "TOML", .. }));
    }

    #[tokio::test]
    async fn test_missing_explicit_config_fails() {
        let options = LoadOptions {
            config_path: Some(PathBuf::from("/nonexistent/ao3stats.toml")),
            use_cwd: false,
        };
        let err = load_settings_with_options(options).await.unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_apply_resolves_relative_paths() {
        let config = Config {
            works_csv: Some("works.csv".to_string()),
            output_dir: Some("/abs/out".to_string()),
            compression: Some("none".to_string()),
            ..Default::default()
        };
        let mut settings = Settings::default();
        config
            .apply_to_settings(&mut settings, Path::new("/configs"))
            .unwrap();
        assert_eq!(settings.works_csv, Some(PathBuf::from("/configs/works.csv")));
        assert_eq!(settings.output_dir, PathBuf::from("/abs/out"));
        assert_eq!(settings.compression, Compression::Uncompressed);
    }

    #[test]
    fn test_unknown_compression_rejected() {
        let config = Config {
            compression: Some("lzma".to_string()),
            ..Default::default()
        };
        let err = config
            .apply_to_settings(&mut Settings::default(), Path::new("/"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownCompression(_)));
    }

    #[test]
    fn test_env_overrides_config() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (OUTPUT_DIR_ENV, "/env/out"),
            (MINIMUM_WORK_COUNT_ENV, "7"),
        ]);
        let mut settings = Settings {
            minimum_work_count: 50,
            ..Default::default()
        };
        settings
            .apply_env_from(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(settings.output_dir, PathBuf::from("/env/out"));
        assert_eq!(settings.minimum_work_count, 7);
    }

    #[test]
    fn test_env_rejects_garbage_threshold() {
        let mut settings = Settings::default();
        let err = settings
            .apply_env_from(|name| (name == MINIMUM_WORK_COUNT_ENV).then(|| "lots".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { .. }));
    }

    #[test]
    fn test_negative_threshold_fails_in_pipeline_options() {
        let settings = Settings {
            minimum_work_count: -1,
            ..Default::default()
        };
        assert!(matches!(
            settings.pipeline_options(),
            Err(PipelineError::InvalidThreshold(_))
        ));
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.minimum_work_count, 100);
        assert_eq!(settings.partitions, 1);
        assert_eq!(settings.shards, 1);
        assert_eq!(settings.compression, Compression::Snappy);
        assert!(settings.output_dir.ends_with("ao3stats"));
    }
}
