//! Bar policy actor.
//!
//! The actor owns the [`DisplayRegistry`] and processes messages one at a
//! time, so the policy store and every display state are only ever touched
//! from a single task. Settings-change callbacks, which may fire on any
//! thread, set a pending flag and queue [`BarMessage::SettingsChanged`] to
//! wake the actor. If the queue is full the flag alone carries the change:
//! the actor checks it after every message, so a reload is never lost.
//!
//! # Panic Recovery
//!
//! If a message handler panics:
//! 1. The panic is caught and logged
//! 2. The actor continues processing subsequent messages
//! 3. State may be partially inconsistent but bars keep being driven
//!
//! Recovery needs unwinding. Release builds set `panic = "abort"`, where a
//! handler panic terminates the process instead.

mod handle;
mod messages;

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub use handle::{ActorError, BarPolicyHandle};
pub use messages::{BarMessage, BarQuery, QueryResult};
use tokio::sync::mpsc;

use crate::broadcast::CrossProcessEventBroadcaster;
use crate::display::{DisplayRegistry, PersistencySource, WindowShell};
use crate::settings::{ChangeCallback, SettingsSource};

/// Channel buffer size for the actor.
const CHANNEL_BUFFER_SIZE: usize = 256;

/// The actor that owns all bar state.
pub struct BarPolicyActor {
    registry: DisplayRegistry,
    receiver: mpsc::Receiver<BarMessage>,
    settings_pending: Arc<AtomicBool>,
}

impl BarPolicyActor {
    /// Spawn the actor on the current tokio runtime and return a handle.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    #[must_use]
    pub fn spawn(
        settings: Arc<dyn SettingsSource>,
        shell: Arc<dyn WindowShell>,
        persistency: Arc<dyn PersistencySource>,
        broadcaster: Arc<CrossProcessEventBroadcaster>,
    ) -> BarPolicyHandle {
        tracing::debug!("spawning bar policy actor");
        let (sender, receiver) = mpsc::channel(CHANNEL_BUFFER_SIZE);

        // A weak sender keeps the settings watcher from holding the actor alive
        let weak = sender.downgrade();
        let settings_pending = Arc::new(AtomicBool::new(false));
        let pending = Arc::clone(&settings_pending);
        let on_settings_change: ChangeCallback = Arc::new(move || {
            let Some(sender) = weak.upgrade() else {
                return;
            };
            pending.store(true, Ordering::Release);
            if sender.try_send(BarMessage::SettingsChanged).is_err() {
                tracing::debug!("bar policy queue full, settings change left pending");
            }
        });

        let actor = Self {
            registry: DisplayRegistry::new(
                settings,
                shell,
                persistency,
                broadcaster,
                on_settings_change,
            ),
            receiver,
            settings_pending,
        };

        tokio::spawn(async move {
            actor.run().await;
        });

        BarPolicyHandle::new(sender)
    }

    /// Run the message loop until shutdown or until every handle is dropped.
    async fn run(mut self) {
        tracing::trace!("bar policy actor message loop starting");

        while let Some(msg) = self.receiver.recv().await {
            if matches!(msg, BarMessage::Shutdown) {
                tracing::debug!("bar policy actor received shutdown message");
                return;
            }

            let msg_name = msg.name();
            let result = catch_unwind(AssertUnwindSafe(|| {
                self.handle_message(msg);
            }));

            if let Err(panic_info) = result {
                let panic_msg = panic_info
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic_info.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());

                tracing::error!(
                    message = msg_name,
                    panic = %panic_msg,
                    "bar policy actor recovered from panic, state may be inconsistent"
                );
            }

            if self.settings_pending.load(Ordering::Acquire) {
                self.reload_settings();
            }
        }

        tracing::debug!("bar policy actor channel closed, exiting");
    }

    /// Handle a single message.
    fn handle_message(&mut self, msg: BarMessage) {
        match msg {
            BarMessage::DisplayAdded { display_id } => {
                self.registry.on_display_added(display_id);
            }
            BarMessage::DisplayRemoved { display_id } => {
                self.registry.on_display_removed(display_id);
            }
            BarMessage::FocusedWindowChanged { display_id, package, requested } => {
                self.registry.on_focused_window_changed(display_id, package.as_deref(), requested);
            }
            BarMessage::InsetsStateChanged { display_id, state } => {
                self.registry.on_insets_state_changed(display_id, state);
            }
            BarMessage::OverlayChanged { display_id } => self.registry.on_overlay_changed(display_id),
            BarMessage::ImeVisibilityChanged { display_id, showing } => {
                self.registry.on_ime_visibility_changed(display_id, showing);
            }
            BarMessage::ShowInsets { display_id, types } => {
                self.registry.show_insets(display_id, types);
            }
            BarMessage::HideInsets { display_id, types } => {
                self.registry.hide_insets(display_id, types);
            }
            BarMessage::SettingsChanged => self.reload_settings(),
            BarMessage::ResetPolicy => {
                self.registry.reset_policy();
            }
            BarMessage::Query { query, respond_to } => {
                let result = self.execute_query(query);
                if respond_to.send(result).is_err() {
                    tracing::warn!("failed to send query response (channel closed)");
                }
            }
            // Handled in run()
            BarMessage::Shutdown => {}
        }
    }

    fn reload_settings(&mut self) {
        self.settings_pending.store(false, Ordering::Release);
        let pushed = self.registry.on_settings_changed();
        tracing::debug!(displays = pushed, "settings change handled");
    }

    // ========================================================================
    // Query Execution
    // ========================================================================

    fn execute_query(&self, query: BarQuery) -> QueryResult {
        match query {
            BarQuery::ComputeVisibility { package, requested } => {
                QueryResult::Visibility(self.registry.compute_visibility(&package, requested))
            }
            BarQuery::PersistentBars { display_id, host_package } => {
                QueryResult::Bars(self.registry.persistent_bars(display_id, &host_package))
            }
            BarQuery::Policy => QueryResult::Policy(self.registry.store().snapshot()),
            BarQuery::DisplayIds => QueryResult::DisplayIds(self.registry.display_ids()),
            BarQuery::Snapshot => QueryResult::Snapshot(Box::new(self.registry.snapshot())),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::PersistencyBehavior;
    use crate::display::shell::testing::RecordingShell;
    use crate::insets::{BarVisibility, InsetTypes};
    use crate::settings::{MemorySettings, SYSTEM_BAR_VISIBILITY_OVERRIDE};

    fn spawn_actor(settings: Arc<MemorySettings>, shell: &RecordingShell) -> BarPolicyHandle {
        BarPolicyActor::spawn(
            settings,
            Arc::new(shell.clone()),
            Arc::new(PersistencyBehavior::Default),
            Arc::new(CrossProcessEventBroadcaster::new()),
        )
    }

    #[tokio::test]
    async fn test_actor_processes_events_in_order() {
        let settings = Arc::new(MemorySettings::new());
        settings.put(SYSTEM_BAR_VISIBILITY_OVERRIDE, Some("immersive.status=com.video"));
        let shell = RecordingShell::new();
        let handle = spawn_actor(settings, &shell);

        handle.display_added(1).unwrap();
        handle.focused_window_changed(1, Some("com.video"), InsetTypes::empty()).unwrap();

        assert_eq!(handle.display_ids().await.unwrap(), vec![1]);
        assert_eq!(shell.push_count(), 1);

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(
            snapshot.displays[0].last_pushed,
            Some(BarVisibility::new(InsetTypes::NAVIGATION_BARS, InsetTypes::STATUS_BARS))
        );
    }

    #[tokio::test]
    async fn test_settings_callback_posts_to_actor() {
        let settings = Arc::new(MemorySettings::new());
        let shell = RecordingShell::new();
        let handle = spawn_actor(settings.clone(), &shell);

        handle.display_added(1).unwrap();
        handle.focused_window_changed(1, Some("com.a"), InsetTypes::empty()).unwrap();
        assert_eq!(handle.policy().await.unwrap().setting_value, None);

        settings.put(SYSTEM_BAR_VISIBILITY_OVERRIDE, Some("immersive.full=com.a"));

        let policy = handle.policy().await.unwrap();
        assert_eq!(policy.setting_value.as_deref(), Some("immersive.full=com.a"));
        assert!(policy.aliased);
        assert_eq!(shell.push_count(), 2);
    }

    #[tokio::test]
    async fn test_settings_change_survives_full_queue() {
        let settings = Arc::new(MemorySettings::new());
        let shell = RecordingShell::new();
        let handle = spawn_actor(settings.clone(), &shell);

        handle.display_added(1).unwrap();
        handle.focused_window_changed(1, Some("com.a"), InsetTypes::empty()).unwrap();
        assert_eq!(handle.display_ids().await.unwrap(), vec![1]);

        let mut queued = 0;
        while handle.send(BarMessage::OverlayChanged { display_id: 1 }).is_ok() {
            queued += 1;
        }
        assert_eq!(queued, CHANNEL_BUFFER_SIZE);

        settings.put(SYSTEM_BAR_VISIBILITY_OVERRIDE, Some("immersive.full=com.a"));

        let policy = handle.policy().await.unwrap();
        assert_eq!(policy.setting_value.as_deref(), Some("immersive.full=com.a"));
        assert_eq!(shell.push_count(), 2);
        assert_eq!(
            handle.snapshot().await.unwrap().displays[0].last_pushed,
            Some(BarVisibility::new(InsetTypes::empty(), InsetTypes::SYSTEM_BARS))
        );
    }

    #[tokio::test]
    async fn test_compute_visibility_query() {
        let settings = Arc::new(MemorySettings::new());
        settings.put(SYSTEM_BAR_VISIBILITY_OVERRIDE, Some("immersive.navigation=pkgB"));
        let handle = spawn_actor(settings, &RecordingShell::new());

        // The policy loads with the first display
        handle.display_added(1).unwrap();
        let visibility =
            handle.compute_visibility("pkgB", InsetTypes::SYSTEM_BARS).await.unwrap();
        assert_eq!(visibility.hide, InsetTypes::NAVIGATION_BARS);
        assert_eq!(handle.persistent_bars(2, "pkgB").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_shutdown_stops_actor() {
        let handle = spawn_actor(Arc::new(MemorySettings::new()), &RecordingShell::new());
        handle.shutdown().unwrap();

        for _ in 0..100 {
            if !handle.is_alive() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(!handle.is_alive());
    }
}
