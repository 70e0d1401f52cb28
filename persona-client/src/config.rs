use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Settings for the HTTP adapter.
///
/// Values come from an optional YAML file and are then overridden by
/// `PERSONA_API_BASE_URL` and `PERSONA_TIMEOUT_SECS`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: format!("persona-client/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientConfig {
    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        let config: ClientConfig = serde_yaml::from_str(raw)
            .map_err(|e| Error::Config(format!("invalid config file: {e}")))?;
        config.validate()
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_yaml_str(&raw)
    }

    /// File (if any), then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        base.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from a key lookup; kept separate from `std::env` for tests.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("PERSONA_API_BASE_URL") {
            self.base_url = url;
        }
        if let Some(secs) = lookup("PERSONA_TIMEOUT_SECS") {
            self.timeout_secs = secs
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("PERSONA_TIMEOUT_SECS is not a number: {secs}")))?;
        }
        self.validate()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn validate(self) -> Result<Self> {
        reqwest::Url::parse(&self.base_url)
            .map_err(|e| Error::Config(format!("invalid base URL {}: {e}", self.base_url)))?;
        if self.timeout_secs == 0 {
            return Err(Error::Config("timeout must be greater than zero".into()));
        }
        Ok(self)
    }
}
