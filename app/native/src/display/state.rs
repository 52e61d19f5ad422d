//! Per-display bar state and the immersive state table.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::insets::{BarVisibility, InsetTypes, InsetsState};

/// How bars behave on a display when no window asks for them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum PersistencyBehavior {
    /// Bars follow the administrator policy.
    #[default]
    Default,
    /// Bars stay hidden unless the focused window requests them.
    HideUnlessRequested,
    /// The navigation bar is always hidden; the status bar follows the request.
    AlwaysHideNav,
}

/// Immersive sub-state of a display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImmersiveState {
    /// Both bars visible.
    #[default]
    NonImmersive,
    /// Only the navigation bar visible.
    ImmersiveWithNav,
    /// Only the status bar visible.
    ImmersiveWithStatus,
    /// Both bars hidden.
    FullImmersive,
}

impl ImmersiveState {
    /// Derives the state from the persistency behavior and which bars the
    /// focused window requested.
    #[must_use]
    pub const fn resolve(
        behavior: PersistencyBehavior,
        nav_requested: bool,
        status_requested: bool,
    ) -> Self {
        match behavior {
            PersistencyBehavior::Default => Self::NonImmersive,
            PersistencyBehavior::HideUnlessRequested => match (nav_requested, status_requested) {
                (true, true) => Self::NonImmersive,
                (true, false) => Self::ImmersiveWithNav,
                (false, true) => Self::ImmersiveWithStatus,
                (false, false) => Self::FullImmersive,
            },
            PersistencyBehavior::AlwaysHideNav => {
                if status_requested {
                    Self::ImmersiveWithStatus
                } else {
                    Self::FullImmersive
                }
            }
        }
    }

    /// Fixed show/hide pair for this state.
    #[must_use]
    pub const fn visibility(self) -> BarVisibility {
        let decorations = InsetTypes::CAPTION_BAR.union(InsetTypes::SYSTEM_OVERLAYS);
        match self {
            Self::NonImmersive => BarVisibility::new(InsetTypes::SYSTEM_BARS, InsetTypes::empty()),
            Self::ImmersiveWithNav => BarVisibility::new(
                InsetTypes::NAVIGATION_BARS.union(decorations),
                InsetTypes::STATUS_BARS,
            ),
            Self::ImmersiveWithStatus => BarVisibility::new(
                InsetTypes::STATUS_BARS.union(decorations),
                InsetTypes::NAVIGATION_BARS,
            ),
            Self::FullImmersive => BarVisibility::new(InsetTypes::empty(), InsetTypes::SYSTEM_BARS),
        }
    }
}

/// Mutable bar state of one display. Reset to defaults on creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayBarState {
    /// Types last requested by the focused window.
    pub requested_visible_types: InsetTypes,
    /// Package of the focused window, if any.
    pub focused_package: Option<String>,
    /// Configured persistency behavior.
    pub persistency: PersistencyBehavior,
    /// Current immersive sub-state.
    pub immersive: ImmersiveState,
    /// Last inset state reported by the shell.
    pub insets: InsetsState,
}

impl DisplayBarState {
    /// Creates a fresh state with the given persistency behavior.
    #[must_use]
    pub fn new(persistency: PersistencyBehavior) -> Self {
        Self { persistency, ..Self::default() }
    }

    /// Returns `true` if `(package, requested)` equals the last observation.
    #[must_use]
    pub fn is_repeat(&self, package: Option<&str>, requested: InsetTypes) -> bool {
        self.focused_package.as_deref() == package && self.requested_visible_types == requested
    }

    /// Records a focused window observation and recomputes the immersive state.
    ///
    /// An observation identical to the previous one drops back to
    /// [`ImmersiveState::NonImmersive`]; only a change arms immersive handling.
    /// Callers must not push a repeat to the shell. A later recompute (policy
    /// or insets change) then sees `NonImmersive`, which collapses a
    /// deliberately repeated immersive request; this may be a latent bug, but
    /// it matches the shell's existing behavior.
    pub fn observe_focus(&mut self, package: Option<&str>, requested: InsetTypes) -> ImmersiveState {
        let unchanged = self.is_repeat(package, requested);

        self.focused_package = package.map(str::to_string);
        self.requested_visible_types = requested;
        self.immersive = if unchanged {
            ImmersiveState::NonImmersive
        } else {
            ImmersiveState::resolve(
                self.persistency,
                requested.has_navigation(),
                requested.has_status(),
            )
        };
        self.immersive
    }
}
