//! User configuration in `<config dir>/mergeit/config.toml`.

use crate::error::{Error, Result};
use crate::merge::{DEFAULT_RETRY_INTERVAL, MergeOptions};
use crate::types::MergeMethod;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory name for mergeit within the platform config dir.
const CONFIG_DIR: &str = "mergeit";

/// Filename for the configuration file.
const CONFIG_FILE: &str = "config.toml";

/// Settings read from the config file. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MergeitConfig {
    /// Seconds to wait between observations when nothing is actionable
    pub retry_interval_secs: Option<u64>,
    /// Maximum number of waits before giving up
    pub max_retries: Option<u32>,
    /// Overall time limit for a run, in seconds
    pub timeout_secs: Option<u64>,
    /// Merge method used when none is given on the command line
    pub default_method: Option<MergeMethod>,
}

impl MergeitConfig {
    /// Merge options described by this config, before command-line overrides
    pub fn merge_options(&self) -> MergeOptions {
        MergeOptions {
            method: self.default_method.unwrap_or_default(),
            retry_interval: self
                .retry_interval_secs
                .map_or(DEFAULT_RETRY_INTERVAL, Duration::from_secs),
            max_retries: self.max_retries,
            timeout: self.timeout_secs.map(Duration::from_secs),
        }
    }
}

/// Get path to the default config file, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
}

/// Load configuration from disk.
///
/// Returns the default config if the file doesn't exist.
pub fn load_config(path: &Path) -> Result<MergeitConfig> {
    if !path.exists() {
        return Ok(MergeitConfig::default());
    }

    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;

    let config: MergeitConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("failed to parse {}: {e}", path.display())))?;

    if config.retry_interval_secs == Some(0) {
        return Err(Error::Config(format!(
            "{}: retry_interval_secs must be greater than zero",
            path.display()
        )));
    }

    Ok(config)
}
