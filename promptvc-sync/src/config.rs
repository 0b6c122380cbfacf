//! Remote service configuration
//!
//! Stored at `<dir>/remote-config.json`; individual fields can be overridden
//! from the environment.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const ENV_API_BASE_URL: &str = "PROMPTVC_API_BASE_URL";
pub const ENV_CLIENT_ID: &str = "PROMPTVC_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "PROMPTVC_CLIENT_SECRET";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the hosting service's JSON API.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Endpoint exchanging an authorization code for an access token.
    #[serde(default = "default_token_url")]
    pub token_url: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_api_base_url() -> String {
    "https://api.promptvc.dev".to_string()
}

fn default_token_url() -> String {
    "https://api.promptvc.dev/oauth/token".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("promptvc-sync/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            token_url: default_token_url(),
            client_id: String::new(),
            client_secret: None,
            redirect_uri: None,
            request_timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl RemoteConfig {
    /// Config pointing both endpoints at one base URL (`<base>/oauth/token`)
    pub fn for_base_url(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            api_base_url: base.to_string(),
            token_url: format!("{}/oauth/token", base),
            ..Self::default()
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Load from a directory, then apply environment overrides.
    pub fn load(dir: &Path) -> Result<Self> {
        let config_path = dir.join("remote-config.json");
        let mut config = if config_path.exists() {
            let data = fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read remote config from {:?}", config_path))?;
            serde_json::from_str(&data).with_context(|| "Failed to parse remote config JSON")?
        } else {
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Save to a directory.
    pub fn save(&self, dir: &Path) -> Result<()> {
        let config_path = dir.join("remote-config.json");
        let tmp_path = config_path.with_extension("tmp");
        let data = serde_json::to_string_pretty(self)?;
        fs::write(&tmp_path, &data)?;
        fs::rename(&tmp_path, &config_path)?;
        Ok(())
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_API_BASE_URL) {
            self.api_base_url = url;
        }
        if let Some(id) = lookup(ENV_CLIENT_ID) {
            self.client_id = id;
        }
        if let Some(secret) = lookup(ENV_CLIENT_SECRET) {
            self.client_secret = Some(secret);
        }
    }
}
