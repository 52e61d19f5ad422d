//! In-process settings map, used by tests and embedders.

use std::collections::HashMap;

use parking_lot::{Mutex, RwLock};

use super::{ChangeCallback, SettingsError, SettingsSource};

/// Settings kept in memory. Writing a key fires its watchers synchronously
/// on the writer's thread.
#[derive(Default)]
pub struct MemorySettings {
    values: RwLock<HashMap<String, String>>,
    watchers: Mutex<Vec<(String, ChangeCallback)>>,
}

impl MemorySettings {
    /// Creates an empty settings map.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Sets (`Some`) or clears (`None`) `key` and notifies its watchers.
    pub fn put(&self, key: &str, value: Option<&str>) {
        {
            let mut values = self.values.write();
            match value {
                Some(value) => values.insert(key.to_string(), value.to_string()),
                None => values.remove(key),
            };
        }

        let callbacks: Vec<ChangeCallback> = self
            .watchers
            .lock()
            .iter()
            .filter(|(watched, _)| watched == key)
            .map(|(_, callback)| callback.clone())
            .collect();
        for callback in callbacks {
            callback();
        }
    }

    /// Number of registered watchers.
    #[must_use]
    pub fn watcher_count(&self) -> usize { self.watchers.lock().len() }
}

impl SettingsSource for MemorySettings {
    fn read(&self, key: &str) -> Result<Option<String>, SettingsError> {
        Ok(self.values.read().get(key).cloned())
    }

    fn watch(&self, key: &str, on_change: ChangeCallback) -> Result<(), SettingsError> {
        self.watchers.lock().push((key.to_string(), on_change));
        Ok(())
    }
}
