//! # Client Configuration
//!
//! Where the API lives, how long to wait for it, and dashboard defaults.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     STOCKROOM_API_URL=https://api.example.com                          │
//! │     STOCKROOM_TIMEOUT_SECS=15                                          │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/stockroom/stockroom.toml (Linux)                         │
//! │     ~/Library/Application Support/com.stockroom.dashboard/ (macOS)     │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     http://localhost:8080/api, 30s timeout, 10 rows per page           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # stockroom.toml
//! [api]
//! base_url = "https://inventory.example.com/api"
//! timeout_secs = 30
//!
//! [listing]
//! default_page_size = 10
//!
//! [session]
//! idle_lock_secs = 900   # 0 disables the idle lock
//!
//! [storage]
//! path = "/var/lib/stockroom/state.json"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{ClientError, ClientResult};
use stockroom_core::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

const CONFIG_FILE_NAME: &str = "stockroom.toml";
const STATE_FILE_NAME: &str = "state.json";

// =============================================================================
// Sections
// =============================================================================

/// `[api]`: the REST endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    /// Base URL every resource path is appended to.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout (seconds). This is the only timeout applied.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:8080/api".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Default for ApiSettings {
    fn default() -> Self {
        ApiSettings {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
        }
    }
}

/// `[listing]`: defaults for every paginated listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingSettings {
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

impl Default for ListingSettings {
    fn default() -> Self {
        ListingSettings {
            default_page_size: default_page_size(),
        }
    }
}

/// `[session]`: credential lifetime on this device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Lock the session after this many idle seconds. 0 disables.
    #[serde(default = "default_idle_lock")]
    pub idle_lock_secs: u64,
}

fn default_idle_lock() -> u64 {
    900
}

impl Default for SessionSettings {
    fn default() -> Self {
        SessionSettings {
            idle_lock_secs: default_idle_lock(),
        }
    }
}

/// `[storage]`: where persisted hints (theme, refresh token, user) live.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Explicit state file. Defaults to the platform data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete client configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub api: ApiSettings,

    #[serde(default)]
    pub listing: ListingSettings,

    #[serde(default)]
    pub session: SessionSettings,

    #[serde(default)]
    pub storage: StorageSettings,
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults, then
    /// validates it.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (stockroom.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ClientResult<Self> {
        let config = Self::read(config_path)?;
        config.validate()?;
        Ok(config)
    }

    /// Like [`ClientConfig::load`] but without validation, for callers that
    /// layer further overrides (command-line flags) on top and validate once
    /// at the end.
    pub fn read(config_path: Option<PathBuf>) -> ClientResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading client config from file");
                let contents = std::fs::read_to_string(&path)
                    .map_err(|e| ClientError::Config(format!("{}: {}", path.display(), e)))?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        Ok(config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ClientResult<()> {
        let url = Url::parse(&self.api.base_url)
            .map_err(|e| ClientError::Config(format!("api.base_url: {}", e)))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ClientError::Config(format!(
                "api.base_url must start with http:// or https://, got: {}",
                self.api.base_url
            )));
        }

        if self.api.timeout_secs == 0 {
            return Err(ClientError::Config(
                "api.timeout_secs must be greater than 0".into(),
            ));
        }

        let size = self.listing.default_page_size;
        if size == 0 || size > MAX_PAGE_SIZE {
            return Err(ClientError::Config(format!(
                "listing.default_page_size must be between 1 and {}, got: {}",
                MAX_PAGE_SIZE, size
            )));
        }

        Ok(())
    }

    /// Applies `STOCKROOM_*` environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("STOCKROOM_API_URL") {
            debug!(url = %url, "Overriding API URL from environment");
            self.api.base_url = url;
        }

        if let Some(secs) = lookup("STOCKROOM_TIMEOUT_SECS") {
            match secs.parse::<u64>() {
                Ok(s) => self.api.timeout_secs = s,
                Err(_) => warn!(value = %secs, "Ignoring non-numeric STOCKROOM_TIMEOUT_SECS"),
            }
        }

        if let Some(size) = lookup("STOCKROOM_PAGE_SIZE") {
            match size.parse::<usize>() {
                Ok(n) => self.listing.default_page_size = n,
                Err(_) => warn!(value = %size, "Ignoring non-numeric STOCKROOM_PAGE_SIZE"),
            }
        }

        if let Some(secs) = lookup("STOCKROOM_IDLE_LOCK_SECS") {
            match secs.parse::<u64>() {
                Ok(s) => self.session.idle_lock_secs = s,
                Err(_) => warn!(value = %secs, "Ignoring non-numeric STOCKROOM_IDLE_LOCK_SECS"),
            }
        }

        if let Some(path) = lookup("STOCKROOM_STORAGE_PATH") {
            debug!(path = %path, "Overriding storage path from environment");
            self.storage.path = Some(PathBuf::from(path));
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "stockroom", "dashboard")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Parsed base URL.
    pub fn base_url(&self) -> ClientResult<Url> {
        Ok(Url::parse(&self.api.base_url)?)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    /// Idle period after which the session locks, if enabled.
    pub fn idle_lock(&self) -> Option<Duration> {
        match self.session.idle_lock_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// State file for persisted hints.
    pub fn storage_path(&self) -> Option<PathBuf> {
        self.storage.path.clone().or_else(|| {
            directories::ProjectDirs::from("com", "stockroom", "dashboard")
                .map(|dirs| dirs.data_dir().join(STATE_FILE_NAME))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.listing.default_page_size, 10);
        assert_eq!(config.idle_lock(), Some(Duration::from_secs(900)));
    }

    #[test]
    fn test_config_validation() {
        let mut config = ClientConfig::default();

        config.api.base_url = "ftp://files.example.com".into();
        assert!(config.validate().is_err());

        config.api.base_url = "not a url".into();
        assert!(config.validate().is_err());

        config.api.base_url = "https://api.example.com".into();
        assert!(config.validate().is_ok());

        config.listing.default_page_size = 0;
        assert!(config.validate().is_err());
        config.listing.default_page_size = MAX_PAGE_SIZE + 1;
        assert!(config.validate().is_err());
        config.listing.default_page_size = 25;

        config.api.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("STOCKROOM_API_URL", "https://override.example.com/api"),
            ("STOCKROOM_PAGE_SIZE", "25"),
            ("STOCKROOM_IDLE_LOCK_SECS", "0"),
            ("STOCKROOM_TIMEOUT_SECS", "soon"),
        ]
        .into_iter()
        .collect();

        let mut config = ClientConfig::default();
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.api.base_url, "https://override.example.com/api");
        assert_eq!(config.listing.default_page_size, 25);
        assert_eq!(config.idle_lock(), None);
        assert_eq!(config.api.timeout_secs, 30);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stockroom.toml");
        std::fs::write(
            &path,
            "[api]\nbase_url = \"https://inventory.example.com/api\"\n\n[listing]\ndefault_page_size = 50\n",
        )
        .unwrap();

        let config = ClientConfig::load(Some(path)).unwrap();
        assert_eq!(config.api.base_url, "https://inventory.example.com/api");
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.listing.default_page_size, 50);
    }

    #[test]
    fn test_read_defers_validation_to_later_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stockroom.toml");
        std::fs::write(&path, "[api]\nbase_url = \"not a url\"\n").unwrap();

        assert!(ClientConfig::load(Some(path.clone())).is_err());

        let mut config = ClientConfig::read(Some(path)).unwrap();
        assert!(config.validate().is_err());
        config.api.base_url = "https://cli.example.com/api".into();
        config.validate().unwrap();
    }

    #[test]
    fn test_toml_serialization() {
        let toml_str = toml::to_string_pretty(&ClientConfig::default()).unwrap();
        assert!(toml_str.contains("[api]"));
        assert!(toml_str.contains("[listing]"));
    }
}
