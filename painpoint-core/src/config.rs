use crate::error::{ConfigError, CoreError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

pub const DEFAULT_SUBREDDITS: &[&str] = &[
    "SaaS",
    "startups",
    "Entrepreneur",
    "SideProject",
    "indiehackers",
    "webdev",
];

pub const DEFAULT_SEARCH_PHRASES: &[&str] = &[
    "I wish there was",
    "frustrated with",
    "looking for a tool",
    "need an app",
    "why isn't there",
];

pub const DEFAULT_USER_AGENT: &str = "painpoint/0.1 (market research tool)";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub database_url: String,
    pub reddit: RedditConfig,
    pub hackernews: HackerNewsConfig,
    pub backoff: BackoffConfig,
    pub scheduler: SchedulerConfig,
    pub trends: TrendConfig,
}

/// How the Reddit adapter talks to Reddit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RedditAuthMode {
    /// Unauthenticated `.json` endpoints on www.reddit.com.
    Public,
    /// Client-credentials grant, requests against oauth.reddit.com.
    OAuth,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RedditConfig {
    pub auth: RedditAuthMode,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub user_agent: String,
    pub subreddits: Vec<String>,
    pub search_phrases: Vec<String>,
    pub limit_per_search: u32,
    pub min_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HackerNewsConfig {
    pub base_url: String,
    pub max_candidates: usize,
    pub max_results: usize,
    pub min_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BackoffConfig {
    pub seed_ms: u64,
    pub cap_ms: u64,
    pub max_retries: u32,
    /// Fraction of the delay added as random jitter, `0.0` disables it.
    pub jitter_factor: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SchedulerConfig {
    pub sync_interval_minutes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrendConfig {
    pub snapshot_window_days: i64,
    pub default_window_days: i64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://painpoint.db".to_string(),
            reddit: RedditConfig::default(),
            hackernews: HackerNewsConfig::default(),
            backoff: BackoffConfig::default(),
            scheduler: SchedulerConfig::default(),
            trends: TrendConfig::default(),
        }
    }
}

impl Default for RedditConfig {
    fn default() -> Self {
        Self {
            auth: RedditAuthMode::Public,
            client_id: None,
            client_secret: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            subreddits: DEFAULT_SUBREDDITS.iter().map(|s| s.to_string()).collect(),
            search_phrases: DEFAULT_SEARCH_PHRASES.iter().map(|s| s.to_string()).collect(),
            limit_per_search: 10,
            min_interval_ms: 6000, // ~10 requests per minute
        }
    }
}

impl Default for HackerNewsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://hacker-news.firebaseio.com/v0".to_string(),
            max_candidates: 100,
            max_results: 25,
            min_interval_ms: 0,
        }
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            seed_ms: 1000,
            cap_ms: 60000,
            max_retries: 5,
            jitter_factor: 0.0,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            sync_interval_minutes: 60,
        }
    }
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            snapshot_window_days: 7,
            default_window_days: 7,
        }
    }
}

impl AppConfig {
    /// Load from an optional TOML file, apply environment overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Self, CoreError> {
        let mut config = match path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::FileNotFound {
                        path: path.display().to_string(),
                    }
                    .into());
                }
                let raw = std::fs::read_to_string(path)?;
                info!("Loading configuration from {}", path.display());
                Self::from_toml_str(&raw)?
            }
            None => {
                debug!("No configuration file given, using defaults");
                Self::default()
            }
        };

        config.apply_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Apply overrides from a variable lookup (the process environment in production).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("PAINPOINT_DATABASE_URL") {
            self.database_url = url;
        }
        if let Some(id) = lookup("REDDIT_CLIENT_ID") {
            self.reddit.client_id = Some(id);
        }
        if let Some(secret) = lookup("REDDIT_CLIENT_SECRET") {
            self.reddit.client_secret = Some(secret);
        }
        if let Some(agent) = lookup("REDDIT_USER_AGENT") {
            self.reddit.user_agent = agent;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_url.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "database_url".to_string(),
            });
        }

        if self.reddit.auth == RedditAuthMode::OAuth {
            let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
            if !present(&self.reddit.client_id) {
                return Err(ConfigError::MissingField {
                    field: "reddit.client_id".to_string(),
                });
            }
            if !present(&self.reddit.client_secret) {
                return Err(ConfigError::MissingField {
                    field: "reddit.client_secret".to_string(),
                });
            }
        }

        if self.reddit.subreddits.is_empty() {
            return Err(ConfigError::ValidationFailed {
                reason: "reddit.subreddits must list at least one subreddit".to_string(),
            });
        }
        if self.reddit.search_phrases.is_empty() {
            return Err(ConfigError::ValidationFailed {
                reason: "reddit.search_phrases must list at least one phrase".to_string(),
            });
        }
        if self.reddit.limit_per_search == 0 || self.reddit.limit_per_search > 100 {
            return Err(ConfigError::InvalidValue {
                field: "reddit.limit_per_search".to_string(),
                value: self.reddit.limit_per_search.to_string(),
            });
        }
        if self.hackernews.max_results == 0 {
            return Err(ConfigError::InvalidValue {
                field: "hackernews.max_results".to_string(),
                value: "0".to_string(),
            });
        }
        if self.backoff.seed_ms == 0 || self.backoff.seed_ms > self.backoff.cap_ms {
            return Err(ConfigError::ValidationFailed {
                reason: format!(
                    "backoff.seed_ms ({}) must be non-zero and not exceed backoff.cap_ms ({})",
                    self.backoff.seed_ms, self.backoff.cap_ms
                ),
            });
        }
        if !(0.0..=1.0).contains(&self.backoff.jitter_factor) {
            return Err(ConfigError::InvalidValue {
                field: "backoff.jitter_factor".to_string(),
                value: self.backoff.jitter_factor.to_string(),
            });
        }
        if self.scheduler.sync_interval_minutes == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scheduler.sync_interval_minutes".to_string(),
                value: "0".to_string(),
            });
        }
        if self.trends.snapshot_window_days < 1 || self.trends.default_window_days < 1 {
            return Err(ConfigError::ValidationFailed {
                reason: "trend windows must be at least one day".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.reddit.min_interval_ms, 6000);
        assert_eq!(config.backoff.seed_ms, 1000);
        assert_eq!(config.backoff.cap_ms, 60000);
        assert_eq!(config.reddit.subreddits.len(), 6);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let raw = r#"
            database_url = "sqlite://ideas.db"

            [reddit]
            subreddits = ["rust", "golang"]
            limit_per_search = 25

            [backoff]
            max_retries = 2
        "#;
        let config = AppConfig::from_toml_str(raw).unwrap();
        assert_eq!(config.database_url, "sqlite://ideas.db");
        assert_eq!(config.reddit.subreddits, vec!["rust", "golang"]);
        assert_eq!(config.reddit.limit_per_search, 25);
        assert_eq!(config.reddit.min_interval_ms, 6000);
        assert_eq!(config.backoff.max_retries, 2);
        assert_eq!(config.backoff.seed_ms, 1000);
        assert_eq!(config.hackernews.max_results, 25);
    }

    #[test]
    fn test_oauth_mode_requires_credentials() {
        let raw = r#"
            [reddit]
            auth = "oauth"
        "#;
        let mut config = AppConfig::from_toml_str(raw).unwrap();
        assert_eq!(config.reddit.auth, RedditAuthMode::OAuth);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingField { field }) if field == "reddit.client_id"
        ));

        let env: HashMap<&str, &str> = [
            ("REDDIT_CLIENT_ID", "id"),
            ("REDDIT_CLIENT_SECRET", "secret"),
        ]
        .into_iter()
        .collect();
        config.apply_overrides(|name| env.get(name).map(|v| v.to_string()));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_backoff_rejected() {
        let mut config = AppConfig::default();
        config.backoff.seed_ms = 120_000;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationFailed { .. })
        ));
    }

    #[test]
    fn test_bad_toml_is_parse_error() {
        let result = AppConfig::from_toml_str("database_url = [");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let result = AppConfig::load(Some(Path::new("/definitely/not/here.toml")));
        assert!(matches!(
            result,
            Err(CoreError::Config(ConfigError::FileNotFound { .. }))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[scheduler]\nsync_interval_minutes = 15").unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.scheduler.sync_interval_minutes, 15);
    }
}
