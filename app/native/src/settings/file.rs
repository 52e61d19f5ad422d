//! Settings stored in a JSONC file of string values, watched for changes.
//!
//! ```jsonc
//! {
//!   // Hide the status bar for the media player everywhere
//!   "system_bar_visibility_override": "immersive.status=com.example.player"
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::RecvTimeoutError;
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use serde_json::{Map, Value};

use super::{ChangeCallback, SettingsError, SettingsSource};

/// Quiet period after the last file event before watchers are notified.
/// Some editors trigger multiple events per save (write to temp, rename, etc.).
const SETTINGS_DEBOUNCE_MS: u64 = 200;

/// File-backed settings.
#[derive(Debug, Clone)]
pub struct FileSettings {
    path: PathBuf,
}

impl FileSettings {
    /// Creates a source backed by `path`. The file does not need to exist.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into() } }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path { &self.path }

    fn load(&self) -> Result<Option<Map<String, Value>>, SettingsError> {
        let file = match fs::File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let reader = json_comments::StripComments::new(file);
        Ok(Some(serde_json::from_reader(reader)?))
    }
}

impl SettingsSource for FileSettings {
    fn read(&self, key: &str) -> Result<Option<String>, SettingsError> {
        let Some(map) = self.load()? else {
            return Ok(None);
        };
        match map.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(value)) => Ok(Some(value.clone())),
            Some(_) => Err(SettingsError::InvalidValue(key.to_string())),
        }
    }

    fn watch(&self, key: &str, on_change: ChangeCallback) -> Result<(), SettingsError> {
        let file_name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .ok_or_else(|| SettingsError::Watch(format!("{} has no file name", self.path.display())))?;

        // Watch the parent directory to catch file replacements
        let watch_path = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

        let (tx, rx) = std::sync::mpsc::channel();
        let mut watcher: RecommendedWatcher =
            notify::recommended_watcher(tx).map_err(|err| SettingsError::Watch(err.to_string()))?;
        watcher
            .watch(&watch_path, RecursiveMode::NonRecursive)
            .map_err(|err| SettingsError::Watch(err.to_string()))?;

        let key = key.to_string();
        let path = self.path.clone();
        std::thread::Builder::new()
            .name("sysbars-settings-watcher".to_string())
            .spawn(move || {
                // The watcher lives as long as this thread
                let _watcher = watcher;
                let debounce = Duration::from_millis(SETTINGS_DEBOUNCE_MS);
                let mut pending = false;

                loop {
                    let received = if pending {
                        rx.recv_timeout(debounce)
                    } else {
                        rx.recv().map_err(|_| RecvTimeoutError::Disconnected)
                    };

                    match received {
                        Ok(Ok(event)) => {
                            let notify::Event { paths, .. } = event;
                            if paths.iter().any(|p| p.file_name() == Some(file_name.as_os_str())) {
                                pending = true;
                            }
                        }
                        Ok(Err(err)) => {
                            tracing::warn!(error = %err, path = %path.display(), "settings watch error");
                        }
                        Err(RecvTimeoutError::Timeout) => {
                            pending = false;
                            tracing::debug!(key = %key, path = %path.display(), "settings file changed");
                            on_change();
                        }
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            })
            .map_err(|err| SettingsError::Watch(err.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn settings_debounce_duration_is_reasonable() {
        const { assert!(SETTINGS_DEBOUNCE_MS >= 100) };
        const { assert!(SETTINGS_DEBOUNCE_MS <= 1000) };
    }

    #[test]
    fn test_missing_file_reads_as_unset() {
        let dir = tempfile::tempdir().unwrap();
        let settings = FileSettings::new(dir.path().join("settings.json"));
        assert_eq!(settings.read("any").unwrap(), None);
    }

    #[test]
    fn test_reads_string_values_with_comments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.jsonc");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"{{
                // admin policy
                "system_bar_visibility_override": "immersive.full=*",
                "cleared": null,
                "count": 3
            }}"#
        )
        .unwrap();

        let settings = FileSettings::new(&path);
        assert_eq!(
            settings.read("system_bar_visibility_override").unwrap().as_deref(),
            Some("immersive.full=*")
        );
        assert_eq!(settings.read("cleared").unwrap(), None);
        assert_eq!(settings.read("absent").unwrap(), None);
        assert!(matches!(
            settings.read("count"),
            Err(SettingsError::InvalidValue(key)) if key == "count"
        ));
    }

    #[test]
    fn test_malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();

        let settings = FileSettings::new(&path);
        assert!(matches!(settings.read("key"), Err(SettingsError::Parse(_))));
    }

    #[test]
    fn test_watch_existing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let settings = FileSettings::new(dir.path().join("settings.json"));
        assert!(settings.watch("key", std::sync::Arc::new(|| {})).is_ok());
    }
}
