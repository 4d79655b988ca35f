//! Configuration management for forum-harvest.
//!
//! Configuration is read from `~/.config/forum-harvest/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is created.

use serde::Deserialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_DIR: &str = "forum-harvest";

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub fetch: FetchConfig,
    pub store: StoreConfig,
    pub archive: ArchiveConfig,
}

/// How the origin is contacted.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Endpoint every query string is appended to.
    pub base_url: String,
    /// Minimum mean spacing between request starts, in seconds.
    pub min_interval_secs: f64,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: "https://bitcointalk.org/index.php".to_string(),
            min_interval_secs: 5.0,
            timeout_secs: 30,
            user_agent: "forum-harvest/0.1.0".to_string(),
        }
    }
}

impl FetchConfig {
    pub fn min_interval(&self) -> Duration {
        Duration::from_secs_f64(self.min_interval_secs.max(0.0))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite database file; defaults to the platform data directory.
    pub database_path: Option<PathBuf>,
}

/// Raw page archiving.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    pub enabled: bool,
    pub dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// Missing fields in the config file will use default values.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
            return Ok(Self::default());
        }

        Self::from_path(&config_path)
    }

    /// Load configuration from an explicit path, which must exist.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the default config file path: `~/.config/forum-harvest/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join(APP_DIR).join("config.toml"))
    }

    /// Database path, falling back to `<data_dir>/forum-harvest/harvest.db`.
    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.store.database_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::data_dir()?.join("harvest.db")),
        }
    }

    /// Archive directory when archiving is enabled.
    pub fn archive_dir(&self) -> Result<Option<PathBuf>, ConfigError> {
        if !self.archive.enabled {
            return Ok(None);
        }
        match &self.archive.dir {
            Some(dir) => Ok(Some(dir.clone())),
            None => Ok(Some(Self::data_dir()?.join("pages"))),
        }
    }

    fn data_dir() -> Result<PathBuf, ConfigError> {
        let data_dir = dirs::data_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(data_dir.join(APP_DIR))
    }

    /// Create a default config file with comments.
    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    fn default_config_content() -> String {
        r##"# forum-harvest configuration

[fetch]
# Forum endpoint; board, profile and topic queries are appended to it
base_url = "https://bitcointalk.org/index.php"

# Requests start on average at least this many seconds apart.
# Each wait is jittered uniformly between zero and twice the remaining gap.
min_interval_secs = 5.0

# Give up on a single request after this many seconds
timeout_secs = 30

user_agent = "forum-harvest/0.1.0"

[store]
# SQLite database file (default: <data dir>/forum-harvest/harvest.db)
# database_path = "/var/lib/forum-harvest/harvest.db"

[archive]
# Keep a copy of every fetched page as <kind>_<id>_<unix time>.html
enabled = false
# dir = "/var/lib/forum-harvest/pages"
"##
        .to_string()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl From<ConfigError> for crate::app::HarvestError {
    fn from(err: ConfigError) -> Self {
        crate::app::HarvestError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_deserializes() {
        let content = Config::default_config_content();
        let config: Config = toml::from_str(&content).expect("Default config should be valid TOML");

        assert_eq!(config.fetch.base_url, "https://bitcointalk.org/index.php");
        assert_eq!(config.fetch.min_interval(), Duration::from_secs(5));
        assert_eq!(config.fetch.timeout_secs, 30);
        assert!(!config.archive.enabled);
        assert!(config.store.database_path.is_none());
    }

    #[test]
    fn test_partial_config() {
        let content = r##"
[fetch]
min_interval_secs = 0.5

[store]
database_path = "/tmp/harvest-test.db"
"##;
        let config: Config = toml::from_str(content).expect("Partial config should work");

        assert_eq!(config.fetch.min_interval(), Duration::from_millis(500));
        assert_eq!(config.fetch.user_agent, "forum-harvest/0.1.0");
        assert_eq!(
            config.database_path().unwrap(),
            PathBuf::from("/tmp/harvest-test.db")
        );
    }

    #[test]
    fn test_empty_config() {
        let config: Config = toml::from_str("").expect("Empty config should work");
        assert_eq!(config.fetch.timeout_secs, 30);
        assert!(config.archive_dir().unwrap().is_none());
    }

    #[test]
    fn test_archive_dir_when_enabled() {
        let content = r##"
[archive]
enabled = true
dir = "/tmp/pages"
"##;
        let config: Config = toml::from_str(content).unwrap();
        assert_eq!(config.archive_dir().unwrap(), Some(PathBuf::from("/tmp/pages")));
    }

    #[test]
    fn test_negative_interval_clamps_to_zero() {
        let fetch = FetchConfig {
            min_interval_secs: -1.0,
            ..FetchConfig::default()
        };
        assert_eq!(fetch.min_interval(), Duration::ZERO);
    }

    #[test]
    fn test_from_path_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[fetch\nbase_url = ").unwrap();

        let err = Config::from_path(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
