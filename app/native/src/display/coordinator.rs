//! Bar visibility coordinator for a single display.
//!
//! The coordinator turns focus, inset and policy events into one show/hide
//! pair and pushes it to the display's insets controller. Pushes are
//! idempotent: recomputing the same pair makes no shell calls at all.

use eyeball::{Observable, Subscriber};
use serde::Serialize;

use super::shell::InsetsControllerProxy;
use super::state::{DisplayBarState, PersistencyBehavior};
use crate::insets::{BarVisibility, DisplayId, InsetTypes, InsetsState};
use crate::policy::FilterPolicyStore;

/// Serializable view of one display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplaySnapshot {
    /// Display identifier.
    pub display_id: DisplayId,
    /// Bar state of the display.
    pub state: DisplayBarState,
    /// Aggregate visible types last forwarded to the shell.
    pub requested_visibilities: InsetTypes,
    /// Last pair pushed to the insets controller.
    pub last_pushed: Option<BarVisibility>,
}

/// Owns the bar state of one display and drives its insets controller.
pub struct PerDisplayCoordinator {
    display_id: DisplayId,
    state: DisplayBarState,
    proxy: Box<dyn InsetsControllerProxy>,
    requested_visibilities: InsetTypes,
    last_pushed: Option<BarVisibility>,
    visibility: Observable<Option<BarVisibility>>,
}

impl PerDisplayCoordinator {
    /// Creates a coordinator with fresh state.
    #[must_use]
    pub fn new(
        display_id: DisplayId,
        persistency: PersistencyBehavior,
        proxy: Box<dyn InsetsControllerProxy>,
    ) -> Self {
        Self {
            display_id,
            state: DisplayBarState::new(persistency),
            proxy,
            requested_visibilities: InsetTypes::SYSTEM_BARS,
            last_pushed: None,
            visibility: Observable::new(None),
        }
    }

    /// Display this coordinator drives.
    #[must_use]
    pub const fn display_id(&self) -> DisplayId { self.display_id }

    /// Current bar state.
    #[must_use]
    pub const fn state(&self) -> &DisplayBarState { &self.state }

    /// Aggregate visible types last forwarded to the shell.
    #[must_use]
    pub const fn requested_visibilities(&self) -> InsetTypes { self.requested_visibilities }

    /// Handles a change of the focused window or of its requested types.
    ///
    /// Returns `true` if new visibilities were pushed to the shell. A repeat
    /// of the previous observation never pushes.
    pub fn on_focused_window_changed(
        &mut self,
        store: &FilterPolicyStore,
        package: Option<&str>,
        requested: InsetTypes,
    ) -> bool {
        let repeat = self.state.is_repeat(package, requested);
        let immersive = self.state.observe_focus(package, requested);
        tracing::debug!(
            display = self.display_id,
            package = package.unwrap_or("<none>"),
            requested = %requested,
            immersive = ?immersive,
            repeat,
            "focused window changed"
        );
        if repeat {
            return false;
        }
        self.update(store)
    }

    /// Handles a new inset state reported by the shell.
    pub fn on_insets_state_changed(&mut self, store: &FilterPolicyStore, insets: InsetsState) -> bool {
        self.state.insets = insets;
        self.update(store)
    }

    /// Re-evaluates after the administrator policy changed.
    pub fn on_policy_changed(&mut self, store: &FilterPolicyStore) -> bool { self.update(store) }

    /// Replaces the persistency behavior. Takes effect on the next focus
    /// transition; the current immersive state is left alone.
    pub fn on_persistency_changed(&mut self, behavior: PersistencyBehavior) {
        if self.state.persistency != behavior {
            tracing::debug!(display = self.display_id, behavior = ?behavior, "persistency changed");
            self.state.persistency = behavior;
        }
    }

    /// Shows bar insets on request of the shell.
    ///
    /// Returns `false` without touching the bars if `types` involves the
    /// keyboard; those requests belong to the keyboard controller.
    pub fn show_insets(&self, types: InsetTypes) -> bool {
        if types.contains(InsetTypes::IME) {
            return false;
        }
        self.proxy.show(types);
        true
    }

    /// Hides bar insets on request of the shell. See [`Self::show_insets`].
    pub fn hide_insets(&self, types: InsetTypes) -> bool {
        if types.contains(InsetTypes::IME) {
            return false;
        }
        self.proxy.hide(types);
        true
    }

    /// Bars that stay visible on this display whatever window is focused,
    /// as seen by the host package itself.
    #[must_use]
    pub fn persistent_bars(&self, store: &FilterPolicyStore, host_package: &str) -> InsetTypes {
        match self.state.persistency {
            PersistencyBehavior::Default => {
                store.compute_visibility(host_package, InsetTypes::SYSTEM_BARS).show
                    & InsetTypes::SYSTEM_BARS
            }
            PersistencyBehavior::HideUnlessRequested | PersistencyBehavior::AlwaysHideNav => {
                InsetTypes::empty()
            }
        }
    }

    /// Subscribes to the pairs pushed to the shell.
    #[must_use]
    pub fn subscribe_visibility(&self) -> Subscriber<Option<BarVisibility>> {
        Observable::subscribe(&self.visibility)
    }

    /// Serializable view of this display.
    #[must_use]
    pub fn snapshot(&self) -> DisplaySnapshot {
        DisplaySnapshot {
            display_id: self.display_id,
            state: self.state.clone(),
            requested_visibilities: self.requested_visibilities,
            last_pushed: self.last_pushed,
        }
    }

    /// The admin policy applies on every display; a persistency behavior
    /// can only hide more on top of it.
    fn compute(&self, store: &FilterPolicyStore) -> Option<BarVisibility> {
        let package = self.state.focused_package.as_deref()?;
        let policy = store.compute_visibility(package, self.state.requested_visible_types);
        let visibility = match self.state.persistency {
            PersistencyBehavior::Default => policy,
            PersistencyBehavior::HideUnlessRequested | PersistencyBehavior::AlwaysHideNav => {
                self.state.immersive.visibility().restrict(policy)
            }
        };
        Some(visibility)
    }

    fn update(&mut self, store: &FilterPolicyStore) -> bool {
        let Some(visibility) = self.compute(store) else {
            tracing::trace!(display = self.display_id, "no focused package, skipping update");
            return false;
        };
        if self.last_pushed == Some(visibility) {
            return false;
        }

        self.last_pushed = Some(visibility);
        self.requested_visibilities = visibility.apply_to(self.requested_visibilities);
        Observable::set(&mut self.visibility, Some(visibility));

        if !visibility.show.is_empty() {
            self.proxy.show(visibility.show);
        }
        if !visibility.hide.is_empty() {
            self.proxy.hide(visibility.hide);
        }

        // Local state stays transitioned even if the shell rejects the push;
        // the next triggering event retries naturally.
        if let Err(err) =
            self.proxy.set_requested_visible_types(self.display_id, self.requested_visibilities)
        {
            tracing::warn!(
                display = self.display_id,
                error = %err,
                "unable to update window manager with requested visibilities"
            );
        }

        tracing::debug!(display = self.display_id, visibility = %visibility, "bar visibility pushed");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::shell::testing::{RecordingShell, ShellCall};

    const DISPLAY: DisplayId = 1;

    fn coordinator(
        shell: &RecordingShell,
        behavior: PersistencyBehavior,
    ) -> PerDisplayCoordinator {
        PerDisplayCoordinator::new(DISPLAY, behavior, shell.proxy(DISPLAY))
    }

    fn store_with(value: &str) -> FilterPolicyStore {
        let mut store = FilterPolicyStore::new();
        store.reload(Some(value));
        store
    }

    #[test]
    fn test_no_push_without_focused_package() {
        let shell = RecordingShell::new();
        let mut coordinator = coordinator(&shell, PersistencyBehavior::Default);
        let store = FilterPolicyStore::new();

        assert!(!coordinator.on_policy_changed(&store));
        assert!(!coordinator.on_insets_state_changed(&store, InsetsState::default()));
        assert!(shell.calls().is_empty());
    }

    #[test]
    fn test_focus_pushes_policy_visibility() {
        let shell = RecordingShell::new();
        let mut coordinator = coordinator(&shell, PersistencyBehavior::Default);
        let store = store_with("immersive.status=com.video");

        assert!(coordinator.on_focused_window_changed(
            &store,
            Some("com.video"),
            InsetTypes::SYSTEM_BARS
        ));

        assert_eq!(
            shell.calls(),
            vec![
                ShellCall::Show(DISPLAY, InsetTypes::NAVIGATION_BARS),
                ShellCall::Hide(DISPLAY, InsetTypes::STATUS_BARS),
                ShellCall::SetRequested(DISPLAY, InsetTypes::NAVIGATION_BARS),
            ]
        );
        assert_eq!(coordinator.requested_visibilities(), InsetTypes::NAVIGATION_BARS);
    }

    #[test]
    fn test_identical_focus_events_push_once() {
        let shell = RecordingShell::new();
        let mut coordinator = coordinator(&shell, PersistencyBehavior::Default);
        let store = store_with("immersive.full=com.video");

        for _ in 0..3 {
            coordinator.on_focused_window_changed(&store, Some("com.video"), InsetTypes::empty());
        }
        assert_eq!(shell.push_count(), 1);
    }

    #[test]
    fn test_recompute_with_unchanged_result_is_noop() {
        let shell = RecordingShell::new();
        let mut coordinator = coordinator(&shell, PersistencyBehavior::Default);
        let store = FilterPolicyStore::new();

        coordinator.on_focused_window_changed(&store, Some("com.a"), InsetTypes::empty());
        shell.clear();

        assert!(!coordinator.on_focused_window_changed(&store, Some("com.b"), InsetTypes::empty()));
        assert!(!coordinator.on_policy_changed(&store));
        assert!(!coordinator.on_insets_state_changed(
            &store,
            InsetsState::new(InsetTypes::STATUS_BARS)
        ));
        assert!(shell.calls().is_empty());
        assert_eq!(coordinator.state().insets.visible_types, InsetTypes::STATUS_BARS);
    }

    #[test]
    fn test_policy_change_recomputes() {
        let shell = RecordingShell::new();
        let mut coordinator = coordinator(&shell, PersistencyBehavior::Default);
        let mut store = FilterPolicyStore::new();

        coordinator.on_focused_window_changed(&store, Some("com.maps"), InsetTypes::empty());
        assert_eq!(shell.push_count(), 1);

        store.reload(Some("immersive.navigation=com.maps"));
        assert!(coordinator.on_policy_changed(&store));
        assert_eq!(shell.push_count(), 2);
        assert_eq!(
            coordinator.snapshot().last_pushed,
            Some(BarVisibility::new(InsetTypes::STATUS_BARS, InsetTypes::NAVIGATION_BARS))
        );
    }

    #[test]
    fn test_hide_unless_requested_uses_state_table() {
        let shell = RecordingShell::new();
        let mut coordinator = coordinator(&shell, PersistencyBehavior::HideUnlessRequested);
        let store = FilterPolicyStore::new();

        coordinator.on_focused_window_changed(&store, Some("com.a"), InsetTypes::NAVIGATION_BARS);

        let expected = BarVisibility::new(
            InsetTypes::NAVIGATION_BARS | InsetTypes::CAPTION_BAR | InsetTypes::SYSTEM_OVERLAYS,
            InsetTypes::STATUS_BARS,
        );
        assert_eq!(coordinator.snapshot().last_pushed, Some(expected));
        assert_eq!(
            shell.calls().last(),
            Some(&ShellCall::SetRequested(
                DISPLAY,
                InsetTypes::NAVIGATION_BARS | InsetTypes::CAPTION_BAR | InsetTypes::SYSTEM_OVERLAYS
            ))
        );
    }

    #[test]
    fn test_identical_focus_events_push_once_for_every_behavior() {
        let store = FilterPolicyStore::new();
        for behavior in [
            PersistencyBehavior::Default,
            PersistencyBehavior::HideUnlessRequested,
            PersistencyBehavior::AlwaysHideNav,
        ] {
            let shell = RecordingShell::new();
            let mut coordinator = coordinator(&shell, behavior);

            assert!(coordinator.on_focused_window_changed(&store, Some("com.a"), InsetTypes::empty()));
            let first = coordinator.snapshot().last_pushed;
            for _ in 0..2 {
                assert!(!coordinator.on_focused_window_changed(
                    &store,
                    Some("com.a"),
                    InsetTypes::empty()
                ));
            }

            assert_eq!(shell.push_count(), 1, "{behavior:?}");
            assert_eq!(coordinator.snapshot().last_pushed, first, "{behavior:?}");
        }
    }

    #[test]
    fn test_admin_policy_applies_under_hide_unless_requested() {
        let shell = RecordingShell::new();
        let mut coordinator = coordinator(&shell, PersistencyBehavior::HideUnlessRequested);
        let store = store_with("immersive.full=com.a");

        assert!(coordinator.on_focused_window_changed(&store, Some("com.a"), InsetTypes::SYSTEM_BARS));
        assert_eq!(
            coordinator.snapshot().last_pushed,
            Some(BarVisibility::new(InsetTypes::empty(), InsetTypes::SYSTEM_BARS))
        );
        assert_eq!(store.compute_visibility("com.a", InsetTypes::SYSTEM_BARS).hide, InsetTypes::SYSTEM_BARS);
    }

    #[test]
    fn test_policy_change_recomputes_under_always_hide_nav() {
        let shell = RecordingShell::new();
        let mut coordinator = coordinator(&shell, PersistencyBehavior::AlwaysHideNav);
        let mut store = FilterPolicyStore::new();

        coordinator.on_focused_window_changed(&store, Some("com.a"), InsetTypes::STATUS_BARS);
        assert_eq!(
            coordinator.snapshot().last_pushed,
            Some(BarVisibility::new(
                InsetTypes::STATUS_BARS | InsetTypes::CAPTION_BAR | InsetTypes::SYSTEM_OVERLAYS,
                InsetTypes::NAVIGATION_BARS,
            ))
        );

        store.reload(Some("immersive.status=com.a"));
        assert!(coordinator.on_policy_changed(&store));
        assert_eq!(
            coordinator.snapshot().last_pushed,
            Some(BarVisibility::new(
                InsetTypes::CAPTION_BAR | InsetTypes::SYSTEM_OVERLAYS,
                InsetTypes::SYSTEM_BARS,
            ))
        );
        assert_eq!(shell.push_count(), 2);
    }

    #[test]
    fn test_always_hide_nav() {
        let shell = RecordingShell::new();
        let mut coordinator = coordinator(&shell, PersistencyBehavior::AlwaysHideNav);
        let store = FilterPolicyStore::new();

        coordinator.on_focused_window_changed(&store, Some("com.a"), InsetTypes::SYSTEM_BARS);
        let pushed = coordinator.snapshot().last_pushed.unwrap();
        assert!(pushed.show.has_status());
        assert_eq!(pushed.hide, InsetTypes::NAVIGATION_BARS);
    }

    #[test]
    fn test_persistency_change_only_affects_future_transitions() {
        let shell = RecordingShell::new();
        let mut coordinator = coordinator(&shell, PersistencyBehavior::HideUnlessRequested);
        let store = FilterPolicyStore::new();

        coordinator.on_focused_window_changed(&store, Some("com.a"), InsetTypes::empty());
        let before = coordinator.state().immersive;

        coordinator.on_persistency_changed(PersistencyBehavior::AlwaysHideNav);
        assert_eq!(coordinator.state().immersive, before);
        assert_eq!(coordinator.state().persistency, PersistencyBehavior::AlwaysHideNav);

        coordinator.on_focused_window_changed(&store, Some("com.b"), InsetTypes::STATUS_BARS);
        assert_eq!(
            coordinator.state().immersive,
            crate::display::ImmersiveState::ImmersiveWithStatus
        );
    }

    #[test]
    fn test_shell_failure_keeps_local_state() {
        let shell = RecordingShell::new();
        *shell.fail_requested.lock() = true;
        let mut coordinator = coordinator(&shell, PersistencyBehavior::Default);
        let store = store_with("immersive.full=com.a");

        assert!(coordinator.on_focused_window_changed(&store, Some("com.a"), InsetTypes::empty()));
        assert_eq!(coordinator.requested_visibilities(), InsetTypes::empty());

        // No retry on identical recompute
        assert!(!coordinator.on_policy_changed(&store));
        assert_eq!(shell.push_count(), 1);
    }

    #[test]
    fn test_ime_requests_are_not_bar_requests() {
        let shell = RecordingShell::new();
        let coordinator = coordinator(&shell, PersistencyBehavior::Default);

        assert!(!coordinator.show_insets(InsetTypes::IME));
        assert!(!coordinator.hide_insets(InsetTypes::IME | InsetTypes::STATUS_BARS));
        assert!(shell.calls().is_empty());

        assert!(coordinator.show_insets(InsetTypes::STATUS_BARS));
        assert_eq!(shell.calls(), vec![ShellCall::Show(DISPLAY, InsetTypes::STATUS_BARS)]);
    }

    #[test]
    fn test_persistent_bars() {
        let shell = RecordingShell::new();
        let store = store_with("immersive.navigation=com.host");

        let default = coordinator(&shell, PersistencyBehavior::Default);
        assert_eq!(default.persistent_bars(&store, "com.host"), InsetTypes::STATUS_BARS);
        assert_eq!(default.persistent_bars(&store, "com.other"), InsetTypes::SYSTEM_BARS);

        let hidden = coordinator(&shell, PersistencyBehavior::HideUnlessRequested);
        assert!(hidden.persistent_bars(&store, "com.other").is_empty());
    }

    #[test]
    fn test_visibility_subscription_sees_pushes() {
        let shell = RecordingShell::new();
        let mut coordinator = coordinator(&shell, PersistencyBehavior::Default);
        let subscriber = coordinator.subscribe_visibility();
        assert_eq!(subscriber.get(), None);

        coordinator.on_focused_window_changed(
            &FilterPolicyStore::new(),
            Some("com.a"),
            InsetTypes::empty(),
        );
        assert_eq!(subscriber.get(), Some(BarVisibility::show_all()));
    }
}
