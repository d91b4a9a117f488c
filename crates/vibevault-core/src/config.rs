//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/vibevault/config.toml, `VIBEVAULT_CONFIG` or `--config`)
//! 3. Environment variables (VIBEVAULT_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::models::DEFAULT_TAG_COLOR;
use crate::search::SearchOptions;

/// Environment variable prefix
const ENV_PREFIX: &str = "VIBEVAULT";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Directory holding the SQLite database
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Email of the user commands act as
    #[serde(default)]
    pub user_email: Option<String>,

    /// Links per page in listings
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Color given to tags created without one
    #[serde(default = "default_tag_color")]
    pub default_tag_color: String,

    /// Fuzzy search cut-off (0.0 exact .. 1.0 anything)
    #[serde(default = "default_search_threshold")]
    pub search_threshold: f64,

    /// How far from its expected position a match may drift
    #[serde(default = "default_search_distance")]
    pub search_distance: u32,

    /// Write logs here instead of stderr
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            user_email: None,
            page_size: default_page_size(),
            default_tag_color: default_tag_color(),
            search_threshold: default_search_threshold(),
            search_distance: default_search_distance(),
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (VIBEVAULT_DATA_DIR, VIBEVAULT_USER, ...)
    /// 2. Config file (~/.config/vibevault/config.toml or VIBEVAULT_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load from an explicit path when one is given (the `--config` flag)
    pub fn load_with_override(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        config.ensure_data_dir()?;
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            self.data_dir = PathBuf::from(val);
        }

        // Empty string clears the configured user
        if let Ok(val) = std::env::var(format!("{}_USER", ENV_PREFIX)) {
            self.user_email = if val.trim().is_empty() {
                None
            } else {
                Some(val)
            };
        }

        if let Ok(val) = std::env::var(format!("{}_PAGE_SIZE", ENV_PREFIX)) {
            if let Ok(size) = val.trim().parse() {
                self.page_size = size;
            }
        }

        if let Ok(val) = std::env::var(format!("{}_LOG_FILE", ENV_PREFIX)) {
            self.log_file = if val.is_empty() {
                None
            } else {
                Some(PathBuf::from(val))
            };
        }
    }

    fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            anyhow::bail!("page_size must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.search_threshold) {
            anyhow::bail!(
                "search_threshold must be between 0.0 and 1.0, got {}",
                self.search_threshold
            );
        }
        if self.search_distance == 0 {
            anyhow::bail!("search_distance must be at least 1");
        }
        Ok(())
    }

    /// Ensure data directory exists
    fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)
                .with_context(|| format!("Failed to create data directory: {:?}", self.data_dir))?;
        }
        Ok(())
    }

    /// Save configuration to the default config file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Set a single key from its string form (used by `config set`)
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "data_dir" => self.data_dir = PathBuf::from(value),
            "user_email" => {
                self.user_email = if value.trim().is_empty() {
                    None
                } else {
                    Some(value.trim().to_string())
                }
            }
            "page_size" => {
                self.page_size = value
                    .parse()
                    .with_context(|| format!("Invalid page_size: {}", value))?
            }
            "default_tag_color" => self.default_tag_color = value.to_string(),
            "search_threshold" => {
                self.search_threshold = value
                    .parse()
                    .with_context(|| format!("Invalid search_threshold: {}", value))?
            }
            "search_distance" => {
                self.search_distance = value
                    .parse()
                    .with_context(|| format!("Invalid search_distance: {}", value))?
            }
            "log_file" => {
                self.log_file = if value.is_empty() {
                    None
                } else {
                    Some(PathBuf::from(value))
                }
            }
            _ => anyhow::bail!(
                "Unknown config key '{}'. Valid keys: {}",
                key,
                Self::KEYS.join(", ")
            ),
        }
        self.validate()
    }

    /// Keys accepted by `set_value`
    pub const KEYS: &'static [&'static str] = &[
        "data_dir",
        "user_email",
        "page_size",
        "default_tag_color",
        "search_threshold",
        "search_distance",
        "log_file",
    ];

    /// Get the config file path
    ///
    /// Can be overridden with VIBEVAULT_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vibevault")
            .join("config.toml")
    }

    /// Get the path to the SQLite database
    pub fn sqlite_path(&self) -> PathBuf {
        self.data_dir.join("vibevault.db")
    }

    /// Fuzzy search tuning taken from this configuration
    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            threshold: self.search_threshold,
            distance: self.search_distance as usize,
        }
    }
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vibevault")
}

fn default_page_size() -> u32 {
    20
}

fn default_tag_color() -> String {
    DEFAULT_TAG_COLOR.to_string()
}

fn default_search_threshold() -> f64 {
    0.3
}

fn default_search_distance() -> u32 {
    100
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // Mutex to serialize tests that touch environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// Guard that locks env access and saves/restores env vars
    struct EnvGuard<'a> {
        _lock: std::sync::MutexGuard<'a, ()>,
        saved: Vec<(String, Option<String>)>,
    }

    impl<'a> EnvGuard<'a> {
        fn new(vars: &[&str]) -> Self {
            let lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
            let saved = vars
                .iter()
                .map(|&name| (name.to_string(), env::var(name).ok()))
                .collect();
            for name in vars {
                env::remove_var(name);
            }
            Self { _lock: lock, saved }
        }
    }

    impl Drop for EnvGuard<'_> {
        fn drop(&mut self) {
            for (name, value) in &self.saved {
                match value {
                    Some(v) => env::set_var(name, v),
                    None => env::remove_var(name),
                }
            }
        }
    }

    const ENV_VARS: &[&str] = &[
        "VIBEVAULT_DATA_DIR",
        "VIBEVAULT_USER",
        "VIBEVAULT_PAGE_SIZE",
        "VIBEVAULT_LOG_FILE",
    ];

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.user_email.is_none());
        assert_eq!(config.page_size, 20);
        assert_eq!(config.default_tag_color, "#8b5cf6");
        assert_eq!(config.search_threshold, 0.3);
        assert_eq!(config.search_distance, 100);
        assert!(config.data_dir.ends_with("vibevault"));
        assert!(config.sqlite_path().ends_with("vibevault.db"));
    }

    #[test]
    fn test_env_override_data_dir() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        env::set_var("VIBEVAULT_DATA_DIR", "/tmp/vibevault-test");
        config.apply_env_overrides();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/vibevault-test"));
    }

    #[test]
    fn test_env_override_user() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        env::set_var("VIBEVAULT_USER", "ada@example.com");
        config.apply_env_overrides();
        assert_eq!(config.user_email.as_deref(), Some("ada@example.com"));

        // Empty string clears it
        env::set_var("VIBEVAULT_USER", "");
        config.apply_env_overrides();
        assert!(config.user_email.is_none());
    }

    #[test]
    fn test_env_override_page_size_ignores_garbage() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        env::set_var("VIBEVAULT_PAGE_SIZE", "50");
        config.apply_env_overrides();
        assert_eq!(config.page_size, 50);

        env::set_var("VIBEVAULT_PAGE_SIZE", "lots");
        config.apply_env_overrides();
        assert_eq!(config.page_size, 50);
    }

    #[test]
    fn test_load_from_str() {
        let _guard = EnvGuard::new(ENV_VARS);

        let toml = r#"
            data_dir = "/custom/data"
            user_email = "grace@example.com"
            page_size = 5
            search_threshold = 0.2
        "#;

        let config = Config::load_from_str(toml).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/custom/data"));
        assert_eq!(config.user_email.as_deref(), Some("grace@example.com"));
        assert_eq!(config.page_size, 5);
        assert_eq!(config.search_options().threshold, 0.2);
        assert_eq!(config.search_options().distance, 100);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let _guard = EnvGuard::new(ENV_VARS);

        assert!(Config::load_from_str("page_size = 0").is_err());
        assert!(Config::load_from_str("search_threshold = 1.5").is_err());
    }

    #[test]
    fn test_load_from_path_missing_file() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = TempDir::new().unwrap();
        env::set_var("VIBEVAULT_DATA_DIR", temp_dir.path().join("data"));

        let config = Config::load_from_path(&temp_dir.path().join("missing.toml")).unwrap();
        assert!(config.user_email.is_none());
        assert!(config.data_dir.exists());
    }

    #[test]
    fn test_save_and_reload() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        let mut config = Config {
            data_dir: temp_dir.path().join("data"),
            ..Config::default()
        };
        config.set_value("user_email", " ada@example.com ").unwrap();
        config.set_value("page_size", "10").unwrap();
        config.save_to_path(&path).unwrap();

        let loaded = Config::load_with_override(Some(&path)).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_set_value_rejects_unknown_key() {
        let mut config = Config::default();
        let err = config.set_value("sync_url", "ws://x").unwrap_err();
        assert!(err.to_string().contains("Unknown config key"));
        assert!(config.set_value("page_size", "many").is_err());
    }
}
