//! Configuration handling for worklog
//!
//! Configuration is read from `config.toml` in the per-user config
//! directory, or from the file named by `WORKLOG_CONFIG`. A missing file
//! means defaults.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Lang;

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "WORKLOG_CONFIG";

/// Environment variable naming the data directory
pub const DATA_DIR_ENV: &str = "WORKLOG_DATA_DIR";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Output format for commands
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// strftime pattern for dates in new log headers
    pub date_format: String,

    /// strftime pattern for times in new log headers
    pub time_format: String,

    /// Language for files without a `Lang` field
    pub default_lang: Option<String>,

    /// Commit author to collect history for (defaults to `git config user.email`)
    pub author: Option<String>,

    /// Task tracker executable
    pub tracker_command: String,

    /// Seconds before a tracker call is abandoned
    pub tracker_timeout_secs: u64,

    /// Seconds before a commit history query is abandoned
    pub git_timeout_secs: u64,

    /// Default output format (text or json)
    pub default_format: OutputFormat,

    /// Tag => regex; entries whose body matches get the tag
    pub autotag: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            date_format: "%d %B".to_string(),
            time_format: "%H:%M".to_string(),
            default_lang: None,
            author: None,
            tracker_command: "task".to_string(),
            tracker_timeout_secs: 10,
            git_timeout_secs: 10,
            default_format: OutputFormat::Text,
            autotag: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Loads configuration from the default location
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Loads configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;

        config
            .validate()
            .with_context(|| format!("Invalid config: {}", path.display()))?;

        Ok(config)
    }

    /// Returns the config file path
    pub fn config_path() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }
        Self::project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Returns the directory holding per-project state
    pub fn data_dir() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os(DATA_DIR_ENV) {
            return Some(PathBuf::from(path));
        }
        Self::project_dirs().map(|dirs| dirs.data_dir().to_path_buf())
    }

    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("dev", "worklog", "worklog")
    }

    /// Checks values that serde cannot
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.date_format.contains(':') {
            return Err(ConfigError::Invalid(format!(
                "date_format must not contain ':': {:?}",
                self.date_format
            )));
        }
        self.lang()?;
        self.autotag_rules()?;
        Ok(())
    }

    /// Language for files without a `Lang` field
    pub fn lang(&self) -> Result<Lang, ConfigError> {
        match &self.default_lang {
            None => Ok(Lang::default()),
            Some(code) => Lang::from_code(code)
                .ok_or_else(|| ConfigError::Invalid(format!("unknown default_lang {:?}", code))),
        }
    }

    /// Compiled autotag rules, sorted by tag
    pub fn autotag_rules(&self) -> Result<Vec<(String, Regex)>, ConfigError> {
        self.autotag
            .iter()
            .map(|(tag, pattern)| {
                Regex::new(pattern)
                    .map(|re| (tag.clone(), re))
                    .map_err(|e| ConfigError::Invalid(format!("autotag {:?}: {}", tag, e)))
            })
            .collect()
    }

    pub fn tracker_timeout(&self) -> Duration {
        Duration::from_secs(self.tracker_timeout_secs)
    }

    pub fn git_timeout(&self) -> Duration {
        Duration::from_secs(self.git_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ITALIAN;
    use tempfile::TempDir;

    #[test]
    fn default_config() {
        let config = Config::default();

        assert_eq!(config.date_format, "%d %B");
        assert_eq!(config.time_format, "%H:%M");
        assert_eq!(config.tracker_timeout(), Duration::from_secs(10));
        assert_eq!(config.default_format, OutputFormat::Text);
        assert_eq!(config.lang().unwrap(), Lang::default());
    }

    #[test]
    fn parse_config() {
        let toml = r#"
date_format = "%Y-%m-%d"
default_lang = "it"
tracker_timeout_secs = 3

[autotag]
meeting = "(?i)meeting|call"
"#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.date_format, "%Y-%m-%d");
        assert_eq!(config.time_format, "%H:%M");
        assert_eq!(config.lang().unwrap(), ITALIAN);
        assert_eq!(config.tracker_timeout_secs, 3);

        let rules = config.autotag_rules().unwrap();
        assert_eq!(rules.len(), 1);
        assert!(rules[0].1.is_match("weekly Meeting"));
    }

    #[test]
    fn load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "author = \"me@example.org\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.author.as_deref(), Some("me@example.org"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let dir = TempDir::new().unwrap();

        let path = dir.path().join("bad_regex.toml");
        fs::write(&path, "[autotag]\nx = \"(\"\n").unwrap();
        assert!(Config::load_from(&path).is_err());

        let path = dir.path().join("bad_lang.toml");
        fs::write(&path, "default_lang = \"xx\"\n").unwrap();
        assert!(Config::load_from(&path).is_err());

        let path = dir.path().join("bad_toml.toml");
        fs::write(&path, "date_format = [").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse config"));
    }
}
