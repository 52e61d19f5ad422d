//! Configuration types for sysbars.
//!
//! The configuration file supports JSONC format (JSON with comments).
//! Both single-line (`//`) and multi-line (`/* */`) comments are allowed.
//!
//! ```jsonc
//! {
//!   "settingsFile": "~/.config/sysbars/settings.json",
//!   "persistency": {
//!     "default": "default",
//!     // The car's rear display hides bars unless asked for
//!     "displays": { "2": "hide-unless-requested" }
//!   },
//!   "logLevel": "debug"
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::display::{PersistencyBehavior, PersistencySource};
use crate::insets::DisplayId;

/// Default location of the settings file holding the bar policy.
pub const DEFAULT_SETTINGS_FILE: &str = "~/.config/sysbars/settings.json";

/// Default log filter when neither `RUST_LOG` nor `logLevel` is set.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Persistency behavior per display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct PersistencyConfig {
    /// Behavior for displays not listed in `displays`.
    pub default: PersistencyBehavior,

    /// Behavior overrides keyed by display id.
    pub displays: BTreeMap<DisplayId, PersistencyBehavior>,
}

impl PersistencyConfig {
    /// Behavior configured for `display_id`.
    #[must_use]
    pub fn behavior_for(&self, display_id: DisplayId) -> PersistencyBehavior {
        self.displays.get(&display_id).copied().unwrap_or(self.default)
    }
}

impl PersistencySource for PersistencyConfig {
    fn persistency_behavior(&self, display_id: DisplayId) -> PersistencyBehavior {
        self.behavior_for(display_id)
    }
}

/// Root configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct SysbarsConfig {
    /// Key/value settings file holding `system_bar_visibility_override`.
    /// `~` is expanded to the home directory.
    /// Default: "~/.config/sysbars/settings.json"
    pub settings_file: String,

    /// Bar persistency per display.
    pub persistency: PersistencyConfig,

    /// Log filter used when `RUST_LOG` is not set (e.g. "debug", "sysbars_lib=trace").
    /// Default: "info"
    pub log_level: String,
}

impl Default for SysbarsConfig {
    fn default() -> Self {
        Self {
            settings_file: DEFAULT_SETTINGS_FILE.to_string(),
            persistency: PersistencyConfig::default(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl SysbarsConfig {
    /// Settings file path with `~` expanded.
    #[must_use]
    pub fn settings_path(&self) -> PathBuf { expand(&self.settings_file) }
}

/// Expands `~` in `path`. Empty input yields an empty path.
#[must_use]
pub fn expand(path: &str) -> PathBuf {
    let path = path.trim();
    if path.is_empty() {
        return PathBuf::new();
    }
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No configuration file was found in any of the expected locations.
    #[error(
        "No configuration file found. Expected at ~/.config/sysbars/config.json \
         or the platform configuration directory"
    )]
    NotFound,
    /// The configuration file exists but could not be read.
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),
    /// The configuration file contains invalid JSON.
    #[error("Failed to parse configuration file: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// Configuration file names to search for (in priority order).
const CONFIG_FILE_NAMES: &[&str] = &["config.jsonc", "config.json"];

/// Returns the possible configuration file paths in priority order.
///
/// The function checks the following locations (both `.jsonc` and `.json` variants):
/// 1. `$XDG_CONFIG_HOME/sysbars/` if set
/// 2. `~/.config/sysbars/`
/// 3. the platform configuration directory (`dirs::config_dir`)
#[must_use]
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    let mut push_dir = |dir: PathBuf| {
        for filename in CONFIG_FILE_NAMES {
            let path = dir.join(filename);
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
    };

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        push_dir(PathBuf::from(xdg_config).join("sysbars"));
    }
    if let Some(home) = dirs::home_dir() {
        push_dir(home.join(".config").join("sysbars"));
    }
    if let Some(config_dir) = dirs::config_dir() {
        push_dir(config_dir.join("sysbars"));
    }

    paths
}

/// Loads the configuration from the first available config file.
///
/// # Errors
///
/// Returns `ConfigError::NotFound` if no configuration file exists in any of the expected locations.
/// Returns `ConfigError::IoError` if a configuration file exists but could not be read.
/// Returns `ConfigError::ParseError` if the configuration file contains invalid JSON.
pub fn load_config() -> Result<(SysbarsConfig, PathBuf), ConfigError> {
    for path in config_paths() {
        if path.exists() {
            return load_config_from_path(&path);
        }
    }

    Err(ConfigError::NotFound)
}

/// Loads the configuration from a specific file.
///
/// # Errors
///
/// Returns `ConfigError::NotFound` if the file does not exist, or the I/O and
/// parse errors of [`load_config`].
pub fn load_config_from_path(path: impl AsRef<Path>) -> Result<(SysbarsConfig, PathBuf), ConfigError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ConfigError::NotFound);
    }
    let file = fs::File::open(path)?;
    // Strip comments from JSONC before parsing
    let reader = json_comments::StripComments::new(file);
    let config: SysbarsConfig = serde_json::from_reader(reader)?;
    Ok((config, path.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SysbarsConfig::default();
        assert_eq!(config.settings_file, DEFAULT_SETTINGS_FILE);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.persistency.behavior_for(0), PersistencyBehavior::Default);
        assert!(!config.settings_path().to_string_lossy().starts_with('~'));
    }

    #[test]
    fn test_config_deserializes_persistency() {
        let json = r#"{
            "persistency": {
                "default": "always-hide-nav",
                "displays": { "2": "hide-unless-requested" }
            }
        }"#;

        let config: SysbarsConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.persistency.behavior_for(1), PersistencyBehavior::AlwaysHideNav);
        assert_eq!(
            config.persistency.persistency_behavior(2),
            PersistencyBehavior::HideUnlessRequested
        );
        assert_eq!(config.settings_file, DEFAULT_SETTINGS_FILE);
    }

    #[test]
    fn test_unknown_behavior_is_a_parse_error() {
        let json = r#"{ "persistency": { "default": "sometimes" } }"#;
        assert!(serde_json::from_str::<SysbarsConfig>(json).is_err());
    }

    #[test]
    fn test_load_config_from_path_with_comments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.jsonc");
        fs::write(
            &path,
            r#"{
                // where the policy lives
                "settingsFile": "/tmp/sysbars-settings.json", /* absolute */
                "logLevel": "debug"
            }"#,
        )
        .unwrap();

        let (config, loaded) = load_config_from_path(&path).unwrap();
        assert_eq!(loaded, path);
        assert_eq!(config.settings_path(), PathBuf::from("/tmp/sysbars-settings.json"));
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_load_config_from_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_config_from_path(dir.path().join("absent.json")),
            Err(ConfigError::NotFound)
        ));
    }

    #[test]
    fn test_load_config_from_malformed_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ \"logLevel\": ").unwrap();
        assert!(matches!(load_config_from_path(&path), Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_config_paths_are_not_empty() {
        let paths = config_paths();
        assert!(!paths.is_empty() || std::env::var("HOME").is_err());
        assert!(paths.iter().all(|p| p.to_string_lossy().contains("sysbars")));
    }

    #[test]
    fn test_expand() {
        assert_eq!(expand(""), PathBuf::new());
        assert_eq!(expand("/usr/local"), PathBuf::from("/usr/local"));
        assert_eq!(expand("relative/file"), PathBuf::from("relative/file"));
    }
}
