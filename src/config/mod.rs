//! Configuration loading and management

use crate::auth::GuardSettings;
use crate::core::error::{ClientError, ClientResult};
use anyhow::{Context, Result};
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Overrides `base_url`
pub const ENV_API_URL: &str = "STAFFDESK_API_URL";

/// Overrides `timeout_secs`
pub const ENV_TIMEOUT_SECS: &str = "STAFFDESK_TIMEOUT_SECS";

/// Client configuration
///
/// # Example
/// ```yaml
/// base_url: https://hr.example.com
/// timeout_secs: 15
/// default_page_size: 25
/// token_file: /var/lib/staffdesk/token
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Backend origin; request paths are appended to it
    pub base_url: String,

    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Initial page size of every store
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,

    /// Route guards send unauthenticated users here
    #[serde(default = "default_login_path")]
    pub login_path: String,

    /// Route guards send unauthorized users here
    #[serde(default = "default_home_path")]
    pub home_path: String,

    /// Age after which the signed-in profile is re-fetched
    #[serde(default = "default_profile_refresh_secs")]
    pub profile_refresh_secs: u64,

    /// Persist the session token to this file; kept in memory when unset
    #[serde(default)]
    pub token_file: Option<PathBuf>,

    #[serde(default)]
    pub user_agent: Option<String>,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_page_size() -> u32 {
    crate::store::DEFAULT_PAGE_SIZE
}

fn default_login_path() -> String {
    "/login".to_string()
}

fn default_home_path() -> String {
    "/".to_string()
}

fn default_profile_refresh_secs() -> u64 {
    300
}

impl ClientConfig {
    /// Defaults for everything but the backend URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_secs: default_timeout_secs(),
            default_page_size: default_page_size(),
            login_path: default_login_path(),
            home_path: default_home_path(),
            profile_refresh_secs: default_profile_refresh_secs(),
            token_file: None,
            user_agent: None,
        }
    }

    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_yaml_str(&content)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Configuration built from environment variables alone
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var(ENV_API_URL)
            .with_context(|| format!("{ENV_API_URL} is not set"))?;
        Self::new(base_url).with_env_overrides()
    }

    /// Apply `STAFFDESK_*` environment variables on top of this configuration
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(url) = lookup(ENV_API_URL) {
            self.base_url = url;
        }
        if let Some(timeout) = lookup(ENV_TIMEOUT_SECS) {
            self.timeout_secs = timeout
                .trim()
                .parse()
                .with_context(|| format!("{ENV_TIMEOUT_SECS} must be a number of seconds"))?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Reject configurations no client can run with
    pub fn validate(&self) -> ClientResult<()> {
        if self.base_url.trim().is_empty() {
            return Err(ClientError::Config("base_url is empty".to_string()));
        }
        reqwest::Url::parse(&self.base_url).map_err(|e| {
            ClientError::Config(format!("base_url '{}' is not a URL: {e}", self.base_url))
        })?;
        if self.default_page_size == 0 {
            return Err(ClientError::Config(
                "default_page_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Routes and refresh interval used by the route guards
    pub fn guard_settings(&self) -> GuardSettings {
        let max_age = i64::try_from(self.profile_refresh_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX);

        GuardSettings {
            login_path: self.login_path.clone(),
            home_path: self.home_path.clone(),
            profile_max_age: max_age,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_minimal_yaml() {
        let config = ClientConfig::from_yaml_str("base_url: http://localhost:3000").unwrap();

        assert_eq!(config, ClientConfig::new("http://localhost:3000"));
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.default_page_size, 10);
        assert_eq!(config.guard_settings().profile_max_age, TimeDelta::minutes(5));
    }

    #[test]
    fn test_yaml_serialization() {
        let mut config = ClientConfig::new("https://hr.example.com");
        config.token_file = Some(PathBuf::from("/tmp/staffdesk-token"));
        let yaml = serde_yaml::to_string(&config).unwrap();

        let parsed = ClientConfig::from_yaml_str(&yaml).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_validation() {
        assert!(matches!(
            ClientConfig::new("").validate(),
            Err(ClientError::Config(_))
        ));
        assert!(ClientConfig::new("not a url").validate().is_err());

        let mut config = ClientConfig::new("http://localhost:3000");
        config.default_page_size = 0;
        assert!(config.validate().is_err());
        assert!(ClientConfig::from_yaml_str("base_url: http://x\ndefault_page_size: 0").is_err());
    }

    #[test]
    fn test_overrides() {
        let config = ClientConfig::new("http://localhost:3000")
            .with_overrides(|key| match key {
                ENV_API_URL => Some("https://staging.example.com".to_string()),
                ENV_TIMEOUT_SECS => Some(" 5 ".to_string()),
                _ => None,
            })
            .unwrap();

        assert_eq!(config.base_url, "https://staging.example.com");
        assert_eq!(config.timeout_secs, 5);

        let bad = ClientConfig::new("http://localhost:3000").with_overrides(|key| {
            (key == ENV_TIMEOUT_SECS).then(|| "soon".to_string())
        });
        assert!(bad.is_err());
    }
}
