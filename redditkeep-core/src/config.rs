use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// What a multi-subreddit harvest does when one subreddit fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchPolicy {
    #[default]
    Abort,
    Continue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub store_path: PathBuf,
    pub user_agent: String,
    pub base_url: String,
    pub subreddits: Vec<String>,
    pub batch_policy: BatchPolicy,
    pub fetch: FetchSettings,
    pub cache: CacheSettings,
    pub server: ServerSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    pub max_pages: u32,
    pub delay_ms: u64,
    pub jitter_ms: u64,
    pub save_each_page: bool,
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub freshness_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("config/data.json"),
            user_agent: "redditkeep/0.1 (subreddit archiver)".to_string(),
            base_url: "https://www.reddit.com".to_string(),
            subreddits: vec!["sibo".to_string(), "lpr".to_string(), "gerd".to_string()],
            batch_policy: BatchPolicy::default(),
            fetch: FetchSettings::default(),
            cache: CacheSettings::default(),
            server: ServerSettings::default(),
        }
    }
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            max_pages: 50,
            delay_ms: 2500,
            jitter_ms: 700,
            save_each_page: false,
            output_dir: PathBuf::from("reddit-data"),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self { freshness_secs: 300 }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl AppConfig {
    /// Load from a TOML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config = match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_toml(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No config file at {}, using defaults", path.display());
                Self::default()
            }
            Err(source) => {
                return Err(ConfigError::Unreadable {
                    path: path.display().to_string(),
                    source,
                })
            }
        };
        config.with_env_overrides()
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Ok(port) = std::env::var("PORT") {
            self.server.port = port.parse().map_err(|_| ConfigError::InvalidValue {
                field: "PORT".to_string(),
                value: port.clone(),
            })?;
            self.validate()?;
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fetch.max_pages == 0 {
            return Err(ConfigError::InvalidValue {
                field: "fetch.max_pages".to_string(),
                value: "0".to_string(),
            });
        }
        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.port".to_string(),
                value: "0".to_string(),
            });
        }
        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "user_agent".to_string(),
                value: self.user_agent.clone(),
            });
        }
        Ok(())
    }
}

impl FetchSettings {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn jitter(&self) -> Duration {
        Duration::from_millis(self.jitter_ms)
    }

    /// Directory for one subreddit's per-page files.
    pub fn output_dir_for(&self, subreddit: &str) -> PathBuf {
        self.output_dir.join(format!("{}-data", subreddit))
    }
}

impl CacheSettings {
    pub fn freshness_window(&self) -> Duration {
        Duration::from_secs(self.freshness_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.fetch.max_pages, 50);
        assert_eq!(config.fetch.delay(), Duration::from_millis(2500));
        assert_eq!(config.cache.freshness_window(), Duration::from_secs(300));
        assert_eq!(config.batch_policy, BatchPolicy::Abort);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml(
            r#"
            store_path = "/tmp/posts.json"
            subreddits = ["rust"]
            batch_policy = "continue"

            [fetch]
            max_pages = 3
            save_each_page = true
            "#,
        )
        .unwrap();

        assert_eq!(config.store_path, PathBuf::from("/tmp/posts.json"));
        assert_eq!(config.subreddits, vec!["rust".to_string()]);
        assert_eq!(config.batch_policy, BatchPolicy::Continue);
        assert_eq!(config.fetch.max_pages, 3);
        assert!(config.fetch.save_each_page);
        assert_eq!(config.fetch.delay_ms, 2500);
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn test_zero_max_pages_rejected() {
        let result = AppConfig::from_toml("[fetch]\nmax_pages = 0\n");
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_malformed_toml() {
        let result = AppConfig::from_toml("store_path = [");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.store_path, AppConfig::default().store_path);
    }

    #[test]
    fn test_unreadable_path_keeps_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppConfig::load(dir.path()).unwrap_err();

        match &err {
            ConfigError::Unreadable { path, source } => {
                assert_eq!(path, &dir.path().display().to_string());
                assert_ne!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("expected Unreadable, got {:?}", other),
        }
        assert!(err.to_string().contains("Cannot read configuration file"));
    }

    #[test]
    fn test_output_dir_per_subreddit() {
        let settings = FetchSettings::default();
        assert_eq!(
            settings.output_dir_for("lpr"),
            PathBuf::from("reddit-data").join("lpr-data")
        );
    }
}
