//! Application configuration management.
//!
//! Configuration is stored at `~/.config/reviewdesk/config.json` and may be
//! overridden from the environment (or a `.env` file):
//!
//! - `REVIEWDESK_API_URL`
//! - `REVIEWDESK_DATA_POLICY` (`strict` or `degrade_to_mock`)
//! - `REVIEWDESK_LOGIN_TIMEOUT_SECS`
//! - `REVIEWDESK_STORAGE_PASSPHRASE` (required for the encrypted file backend)

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "reviewdesk";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const DEFAULT_API_URL: &str = "http://localhost:3000/api/v1";

/// HTTP request timeout in seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// How long the login flow waits before reporting a timeout.
const DEFAULT_LOGIN_TIMEOUT_SECS: u64 = 30;

pub const ENV_API_URL: &str = "REVIEWDESK_API_URL";
pub const ENV_DATA_POLICY: &str = "REVIEWDESK_DATA_POLICY";
pub const ENV_LOGIN_TIMEOUT: &str = "REVIEWDESK_LOGIN_TIMEOUT_SECS";
pub const ENV_STORAGE_PASSPHRASE: &str = "REVIEWDESK_STORAGE_PASSPHRASE";

/// Names of the four persisted session entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageKeys {
    pub token: String,
    pub refresh_token: String,
    pub user: String,
    pub token_expiry: String,
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            token: "flex_auth_token".to_string(),
            refresh_token: "flex_refresh_token".to_string(),
            user: "flex_user_data".to_string(),
            token_expiry: "flex_token_expiry".to_string(),
        }
    }
}

impl StorageKeys {
    pub fn all(&self) -> [&str; 4] {
        [
            self.token.as_str(),
            self.refresh_token.as_str(),
            self.user.as_str(),
            self.token_expiry.as_str(),
        ]
    }
}

/// What data calls do when the backend fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataPolicy {
    /// Surface every failure to the caller.
    Strict,
    /// Log a warning and serve cached or built-in mock data instead.
    #[default]
    DegradeToMock,
}

impl FromStr for DataPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "strict" => Ok(DataPolicy::Strict),
            "degrade_to_mock" | "degrade" | "mock" => Ok(DataPolicy::DegradeToMock),
            other => Err(anyhow::anyhow!("Unknown data policy: {}", other)),
        }
    }
}

/// Where the token store keeps its entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    Memory,
    #[default]
    File,
    EncryptedFile,
    Keyring,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_url: String,
    pub request_timeout_secs: u64,
    pub login_timeout_secs: u64,
    pub storage_keys: StorageKeys,
    pub storage_backend: StorageBackend,
    pub data_policy: DataPolicy,
    pub cache_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            login_timeout_secs: DEFAULT_LOGIN_TIMEOUT_SECS,
            storage_keys: StorageKeys::default(),
            storage_backend: StorageBackend::default(),
            data_policy: DataPolicy::default(),
            cache_dir: None,
        }
    }
}

impl Config {
    /// Load the config file (defaults if absent), then apply `.env` and
    /// environment overrides.
    pub fn load() -> Result<Self> {
        // Missing .env is fine
        let _ = dotenvy::dotenv();
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Apply overrides from a variable lookup. Invalid values are logged and
    /// ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL).filter(|u| !u.trim().is_empty()) {
            self.api_url = url.trim().to_string();
        }
        if let Some(policy) = lookup(ENV_DATA_POLICY) {
            match policy.parse() {
                Ok(policy) => self.data_policy = policy,
                Err(e) => warn!(error = %e, "Ignoring {}", ENV_DATA_POLICY),
            }
        }
        if let Some(secs) = lookup(ENV_LOGIN_TIMEOUT) {
            match secs.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => self.login_timeout_secs = secs,
                _ => warn!(value = %secs, "Ignoring invalid {}", ENV_LOGIN_TIMEOUT),
            }
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.cache_dir {
            return Ok(dir.clone());
        }
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn login_timeout(&self) -> Duration {
        Duration::from_secs(self.login_timeout_secs)
    }

    /// Join the API base URL and an endpoint path.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
