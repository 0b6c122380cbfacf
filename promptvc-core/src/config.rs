//! History store configuration

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Store configuration, optionally kept at `<dir>/store-config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Key under which the workspace document is stored.
    #[serde(default = "default_storage_key")]
    pub storage_key: String,
    /// Branch created (and selected) for a brand-new workspace.
    #[serde(default = "default_branch")]
    pub default_branch: String,
    /// Whether the remote access token is written to local storage.
    #[serde(default = "default_true")]
    pub persist_credentials: bool,
}

fn default_storage_key() -> String {
    "prompt-vc".to_string()
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            storage_key: default_storage_key(),
            default_branch: default_branch(),
            persist_credentials: true,
        }
    }
}

impl StoreConfig {
    /// Config for a specific prompt; each prompt gets its own workspace key.
    pub fn for_prompt(prompt_id: &str) -> Self {
        Self {
            storage_key: format!("{}-{}", default_storage_key(), prompt_id),
            ..Self::default()
        }
    }

    /// Key of the sync-state document belonging to this workspace.
    pub fn sync_state_key(&self) -> String {
        format!("{}.sync", self.storage_key)
    }

    /// Key of the sync-log document belonging to this workspace.
    pub fn sync_log_key(&self) -> String {
        format!("{}.sync-log", self.storage_key)
    }

    /// Load config from a directory, falling back to defaults.
    pub fn load(dir: &Path) -> Result<Self> {
        let config_path = dir.join("store-config.json");
        if !config_path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read store config from {:?}", config_path))?;
        let config: StoreConfig =
            serde_json::from_str(&data).with_context(|| "Failed to parse store config JSON")?;
        Ok(config)
    }

    /// Save config to a directory.
    pub fn save(&self, dir: &Path) -> Result<()> {
        let config_path = dir.join("store-config.json");
        let tmp_path = config_path.with_extension("tmp");
        let data = serde_json::to_string_pretty(self)?;
        fs::write(&tmp_path, &data)?;
        fs::rename(&tmp_path, &config_path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_when_missing() {
        let tmp = TempDir::new().unwrap();
        let config = StoreConfig::load(tmp.path()).unwrap();
        assert_eq!(config, StoreConfig::default());
        assert_eq!(config.sync_state_key(), "prompt-vc.sync");
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("store-config.json"),
            r#"{"persist_credentials": false}"#,
        )
        .unwrap();
        let config = StoreConfig::load(tmp.path()).unwrap();
        assert!(!config.persist_credentials);
        assert_eq!(config.default_branch, "main");
    }

    #[test]
    fn test_save_load() {
        let tmp = TempDir::new().unwrap();
        let config = StoreConfig::for_prompt("42");
        config.save(tmp.path()).unwrap();
        assert_eq!(StoreConfig::load(tmp.path()).unwrap().storage_key, "prompt-vc-42");
    }
}
