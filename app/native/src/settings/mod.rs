//! Key/value settings holding the raw bar policy string.
//!
//! The policy value is read on demand and re-read whenever the source
//! reports a change. Change callbacks may fire on any thread; receivers
//! must re-post onto their own execution context before touching state.

mod file;
mod memory;

use std::sync::Arc;

pub use file::FileSettings;
pub use memory::MemorySettings;
use thiserror::Error;

/// Setting key holding the bar visibility override policy.
pub const SYSTEM_BAR_VISIBILITY_OVERRIDE: &str = "system_bar_visibility_override";

/// Callback invoked when a watched key may have changed.
pub type ChangeCallback = Arc<dyn Fn() + Send + Sync>;

/// Errors raised by settings sources.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The backing file could not be read.
    #[error("Failed to read settings: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file is not a JSON object of strings.
    #[error("Failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),

    /// A key holds something other than a string.
    #[error("Setting '{0}' is not a string")]
    InvalidValue(String),

    /// Change notifications could not be registered.
    #[error("Failed to watch settings: {0}")]
    Watch(String),

    /// The source is temporarily unavailable.
    #[error("Settings unavailable: {0}")]
    Unavailable(String),
}

/// A source of string settings with change notification.
pub trait SettingsSource: Send + Sync {
    /// Reads the current value of `key`. `Ok(None)` means unset.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn read(&self, key: &str) -> Result<Option<String>, SettingsError>;

    /// Registers `on_change` to be called whenever `key` may have changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the notification channel cannot be set up.
    fn watch(&self, key: &str, on_change: ChangeCallback) -> Result<(), SettingsError>;
}
