//! Hot exit configuration.

use crate::env;
use crate::session::MAX_SESSION_AGE_DAYS;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_RESTORE_TIMEOUT_MS: u64 = 15_000;
pub const DEFAULT_CAPTURE_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HotExitConfig {
    /// Directory holding the snapshot. Defaults to `$HOME/.hot-exit`.
    pub data_dir: Option<PathBuf>,
    pub restore_timeout_ms: u64,
    pub capture_timeout_secs: u64,
    /// 0 disables the staleness check.
    pub max_session_age_days: i64,
    pub keep_backup: bool,
    pub secondary_poll_attempts: u32,
    pub secondary_poll_interval_ms: u64,
}

impl Default for HotExitConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            restore_timeout_ms: DEFAULT_RESTORE_TIMEOUT_MS,
            capture_timeout_secs: DEFAULT_CAPTURE_TIMEOUT_SECS,
            max_session_age_days: MAX_SESSION_AGE_DAYS,
            keep_backup: true,
            secondary_poll_attempts: 3,
            secondary_poll_interval_ms: 50,
        }
    }
}

impl HotExitConfig {
    pub fn restore_timeout(&self) -> Duration {
        Duration::from_millis(self.restore_timeout_ms)
    }

    pub fn capture_timeout(&self) -> Duration {
        Duration::from_secs(self.capture_timeout_secs)
    }

    pub fn secondary_poll_interval(&self) -> Duration {
        Duration::from_millis(self.secondary_poll_interval_ms)
    }

    /// Configured data directory, or the default under the home directory.
    pub fn resolve_data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            env::home_dir()
                .map(|home| env::app_data_dir_path(&home))
                .unwrap_or_else(|| PathBuf::from(env::APP_DIR_NAME))
        })
    }

    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML configuration")
    }

    pub fn to_toml_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = self.to_toml_string()?;
        std::fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")
    }
}
