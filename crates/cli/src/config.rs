//! `respipe.toml` configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use nodes::PipelineConfig;
use serde::{Deserialize, Serialize};

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "respipe.toml";

/// Top-level configuration. Every section is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(flatten)]
    pub pipeline: PipelineConfig,
    pub file: FileConfig,
    pub memory: MemoryConfig,
    pub settings: SettingsConfig,
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Base directory for relative resource names.
    pub root: PathBuf,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Entries preloaded into the `mem:` controller.
    pub seed: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsConfig {
    /// Values served under `settings:<key>`.
    pub values: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub format: LogFormat,
    /// OTLP gRPC endpoint; spans are exported only when set.
    pub otlp_endpoint: Option<String>,
}

impl AppConfig {
    /// Loads `path`, or [`DEFAULT_CONFIG_FILE`] when `None`.
    ///
    /// A missing default file yields defaults; a missing explicit file is an
    /// error.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if !explicit && e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("reading {}", path.display()));
            }
        };
        Self::parse(&text).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_yields_defaults() {
        let config = AppConfig::parse("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(config.pipeline.cache.enabled);
    }

    #[test]
    fn test_sections() {
        let config = AppConfig::parse(
            r#"
            [cache]
            enabled = false
            default_max_age_secs = 30
            max_entries = 64

            [file]
            root = "/srv/data"

            [memory.seed]
            greeting = "hello"

            [settings.values]
            mode = "fast"

            [telemetry]
            format = "json"
            "#,
        )
        .unwrap();
        assert!(!config.pipeline.cache.enabled);
        assert_eq!(config.pipeline.cache.default_max_age_secs, 30);
        assert_eq!(config.pipeline.cache.max_entries, 64);
        assert!(config.pipeline.expansion.enabled);
        assert_eq!(config.file.root, PathBuf::from("/srv/data"));
        assert_eq!(config.memory.seed["greeting"], "hello");
        assert_eq!(config.settings.values["mode"], "fast");
        assert_eq!(config.telemetry.format, LogFormat::Json);
    }

    #[test]
    fn test_invalid_toml_is_rejected() {
        assert!(AppConfig::parse("[cache\nenabled = 1").is_err());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let missing = std::env::temp_dir().join("respipe-definitely-missing.toml");
        assert!(AppConfig::load(Some(&missing)).is_err());
    }
}
