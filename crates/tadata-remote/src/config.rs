use crate::ApiVersion;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_SERVICE_URL: &str = "https://api.tadata.com";
pub const STAGING_SERVICE_URL: &str = "https://api.stage.tadata.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("credentials I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid credentials file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("HOME not set")]
    NoHome,
}

/// Settings for one [`ApiClient`](crate::ApiClient).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_key: String,
    pub service_url: String,
    pub api_version: ApiVersion,
    /// Applied to each HTTP request, not to a whole deployment.
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_owned(),
            service_url: DEFAULT_SERVICE_URL.to_owned(),
            api_version: ApiVersion::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_service_url(mut self, url: &str) -> Self {
        url.trim_end_matches('/').clone_into(&mut self.service_url);
        self
    }

    #[must_use]
    pub fn with_api_version(mut self, version: ApiVersion) -> Self {
        self.api_version = version;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Stored API credentials, read by the CLI when no key is given explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub api_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_url: Option<String>,
}

impl Credentials {
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_owned(),
            service_url: None,
        }
    }

    /// Load credentials from `~/.config/tadata/credentials.json`.
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load(&default_credentials_path()?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }
}

pub fn default_credentials_path() -> Result<PathBuf, ConfigError> {
    let home = std::env::var("HOME").map_err(|_| ConfigError::NoHome)?;
    Ok(PathBuf::from(home).join(".config/tadata/credentials.json"))
}
