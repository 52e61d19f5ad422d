//! Registry of live displays and owner of the bar policy store.
//!
//! The registry is not thread-safe by itself: it is meant to live on a
//! single execution context (see [`crate::actor`]) that every event is
//! marshalled onto.

use std::collections::BTreeMap;
use std::sync::Arc;

use eyeball::Subscriber;
use serde::Serialize;

use super::coordinator::{DisplaySnapshot, PerDisplayCoordinator};
use super::shell::WindowShell;
use super::state::PersistencyBehavior;
use crate::broadcast::CrossProcessEventBroadcaster;
use crate::events::DisplayEvent;
use crate::insets::{BarVisibility, DisplayId, InsetTypes, InsetsState};
use crate::policy::{FilterPolicyStore, PolicySnapshot};
use crate::settings::{ChangeCallback, SYSTEM_BAR_VISIBILITY_OVERRIDE, SettingsSource};

/// Supplies the persistency behavior configured for a display.
pub trait PersistencySource: Send + Sync {
    /// Behavior for `display_id`, re-read on every overlay change.
    fn persistency_behavior(&self, display_id: DisplayId) -> PersistencyBehavior;
}

impl PersistencySource for PersistencyBehavior {
    fn persistency_behavior(&self, _display_id: DisplayId) -> PersistencyBehavior { *self }
}

/// Serializable view of the whole registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrySnapshot {
    /// Current bar policy.
    pub policy: PolicySnapshot,
    /// Live displays, ordered by id.
    pub displays: Vec<DisplaySnapshot>,
}

/// Live displays and the policy shared by all of them.
pub struct DisplayRegistry {
    store: FilterPolicyStore,
    policy_loaded: bool,
    coordinators: BTreeMap<DisplayId, PerDisplayCoordinator>,
    settings: Arc<dyn SettingsSource>,
    shell: Arc<dyn WindowShell>,
    persistency: Arc<dyn PersistencySource>,
    broadcaster: Arc<CrossProcessEventBroadcaster>,
    on_settings_change: ChangeCallback,
}

impl DisplayRegistry {
    /// Creates an empty registry.
    ///
    /// `on_settings_change` is registered with `settings` when the first
    /// display is added. It must re-post onto the registry's execution
    /// context and call [`Self::on_settings_changed`] there.
    #[must_use]
    pub fn new(
        settings: Arc<dyn SettingsSource>,
        shell: Arc<dyn WindowShell>,
        persistency: Arc<dyn PersistencySource>,
        broadcaster: Arc<CrossProcessEventBroadcaster>,
        on_settings_change: ChangeCallback,
    ) -> Self {
        Self {
            store: FilterPolicyStore::new(),
            policy_loaded: false,
            coordinators: BTreeMap::new(),
            settings,
            shell,
            persistency,
            broadcaster,
            on_settings_change,
        }
    }

    // ========================================================================
    // Display lifecycle
    // ========================================================================

    /// Starts driving the bars of `display_id`.
    ///
    /// The first display ever added loads the policy and subscribes to its
    /// changes. Adding a display twice is a no-op returning `false`.
    pub fn on_display_added(&mut self, display_id: DisplayId) -> bool {
        if self.coordinators.contains_key(&display_id) {
            tracing::debug!(display = display_id, "display already registered");
            return false;
        }

        if !self.policy_loaded {
            self.policy_loaded = true;
            self.store.reload_from(self.settings.as_ref());
            if let Err(err) =
                self.settings.watch(SYSTEM_BAR_VISIBILITY_OVERRIDE, Arc::clone(&self.on_settings_change))
            {
                tracing::warn!(error = %err, "unable to watch bar policy, changes will be missed");
            }
        }

        let behavior = self.persistency.persistency_behavior(display_id);
        let proxy = self.shell.insets_controller(display_id);
        self.coordinators
            .insert(display_id, PerDisplayCoordinator::new(display_id, behavior, proxy));
        tracing::info!(display = display_id, persistency = ?behavior, "display added");
        true
    }

    /// Stops driving `display_id` and hands its insets back to the shell.
    ///
    /// Removing an unknown display is a no-op returning `false`.
    pub fn on_display_removed(&mut self, display_id: DisplayId) -> bool {
        if self.coordinators.remove(&display_id).is_none() {
            tracing::debug!(display = display_id, "removing unknown display");
            return false;
        }
        if let Err(err) = self.shell.release(display_id) {
            tracing::warn!(display = display_id, error = %err, "unable to release insets controller");
        }
        tracing::info!(display = display_id, "display removed");
        true
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Re-reads the policy and, if it changed, recomputes every display.
    ///
    /// Returns the number of displays whose bars were pushed.
    pub fn on_settings_changed(&mut self) -> usize {
        if !self.store.reload_from(self.settings.as_ref()) {
            return 0;
        }
        self.recompute_all()
    }

    /// Forwards a focus change to the display's coordinator.
    pub fn on_focused_window_changed(
        &mut self,
        display_id: DisplayId,
        package: Option<&str>,
        requested: InsetTypes,
    ) -> bool {
        let Some(coordinator) = self.coordinators.get_mut(&display_id) else {
            tracing::debug!(display = display_id, "focus change for unknown display");
            return false;
        };
        coordinator.on_focused_window_changed(&self.store, package, requested)
    }

    /// Forwards a new inset state to the display's coordinator.
    pub fn on_insets_state_changed(&mut self, display_id: DisplayId, insets: InsetsState) -> bool {
        let Some(coordinator) = self.coordinators.get_mut(&display_id) else {
            tracing::debug!(display = display_id, "insets change for unknown display");
            return false;
        };
        coordinator.on_insets_state_changed(&self.store, insets)
    }

    /// Re-reads the persistency behavior of the display after a resource or
    /// overlay change.
    pub fn on_overlay_changed(&mut self, display_id: DisplayId) {
        let behavior = self.persistency.persistency_behavior(display_id);
        if let Some(coordinator) = self.coordinators.get_mut(&display_id) {
            coordinator.on_persistency_changed(behavior);
        }
    }

    /// Tells every listener of the display that the keyboard was shown or hidden.
    pub fn on_ime_visibility_changed(&self, display_id: DisplayId, showing: bool) {
        self.broadcaster.publish(display_id, DisplayEvent::KeyboardVisibilityChanged { showing });
    }

    /// Shows insets on request of the shell; keyboard requests become
    /// keyboard events.
    pub fn show_insets(&self, display_id: DisplayId, types: InsetTypes) {
        let Some(coordinator) = self.coordinators.get(&display_id) else {
            return;
        };
        if !coordinator.show_insets(types) {
            self.on_ime_visibility_changed(display_id, true);
        }
    }

    /// Hides insets on request of the shell; keyboard requests become
    /// keyboard events.
    pub fn hide_insets(&self, display_id: DisplayId, types: InsetTypes) {
        let Some(coordinator) = self.coordinators.get(&display_id) else {
            return;
        };
        if !coordinator.hide_insets(types) {
            self.on_ime_visibility_changed(display_id, false);
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Authoritative bar decision for `package`, without touching any display.
    #[must_use]
    pub fn compute_visibility(&self, package: &str, requested: InsetTypes) -> BarVisibility {
        self.store.compute_visibility(package, requested)
    }

    /// Bars that stay visible on `display_id` regardless of the focused window.
    #[must_use]
    pub fn persistent_bars(&self, display_id: DisplayId, host_package: &str) -> Option<InsetTypes> {
        self.coordinators
            .get(&display_id)
            .map(|coordinator| coordinator.persistent_bars(&self.store, host_package))
    }

    /// Subscribes to the pairs pushed on `display_id`.
    #[must_use]
    pub fn subscribe_visibility(
        &self,
        display_id: DisplayId,
    ) -> Option<Subscriber<Option<BarVisibility>>> {
        self.coordinators.get(&display_id).map(PerDisplayCoordinator::subscribe_visibility)
    }

    /// Ids of the live displays, ascending.
    #[must_use]
    pub fn display_ids(&self) -> Vec<DisplayId> { self.coordinators.keys().copied().collect() }

    /// The policy store.
    #[must_use]
    pub const fn store(&self) -> &FilterPolicyStore { &self.store }

    /// The broadcaster keyboard events go through.
    #[must_use]
    pub const fn broadcaster(&self) -> &Arc<CrossProcessEventBroadcaster> { &self.broadcaster }

    /// Serializable view of the policy and every display.
    #[must_use]
    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            policy: self.store.snapshot(),
            displays: self.coordinators.values().map(PerDisplayCoordinator::snapshot).collect(),
        }
    }

    /// Drops the cached policy and recomputes every display with no filters.
    ///
    /// The next settings change reloads the policy from scratch.
    pub fn reset_policy(&mut self) -> usize {
        self.store.reset();
        tracing::debug!("bar policy reset");
        self.recompute_all()
    }

    fn recompute_all(&mut self) -> usize {
        let store = &self.store;
        self.coordinators
            .values_mut()
            .map(|coordinator| coordinator.on_policy_changed(store))
            .filter(|pushed| *pushed)
            .count()
    }
}
