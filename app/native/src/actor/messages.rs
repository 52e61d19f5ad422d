//! Message types for the bar policy actor.
//!
//! All communication with the actor happens through messages:
//! - `BarMessage` - events and commands sent to the actor
//! - `BarQuery` - requests for state data (with response channel)
//! - `QueryResult` - responses from queries

use tokio::sync::oneshot;

use crate::display::RegistrySnapshot;
use crate::insets::{BarVisibility, DisplayId, InsetTypes, InsetsState};
use crate::policy::PolicySnapshot;

// ============================================================================
// Bar Messages
// ============================================================================

/// Messages sent to the bar policy actor.
#[derive(Debug)]
pub enum BarMessage {
    // ════════════════════════════════════════════════════════════════════════
    // Display Lifecycle
    // ════════════════════════════════════════════════════════════════════════
    /// A display was connected.
    DisplayAdded { display_id: DisplayId },

    /// A display was disconnected.
    DisplayRemoved { display_id: DisplayId },

    // ════════════════════════════════════════════════════════════════════════
    // Shell Events
    // ════════════════════════════════════════════════════════════════════════
    /// The focused window of a display changed, or its requested types did.
    FocusedWindowChanged {
        display_id: DisplayId,
        package: Option<String>,
        requested: InsetTypes,
    },

    /// The shell reported a new inset state for a display.
    InsetsStateChanged { display_id: DisplayId, state: InsetsState },

    /// Resources or overlays of a display changed.
    OverlayChanged { display_id: DisplayId },

    /// The on-screen keyboard of a display was shown or hidden.
    ImeVisibilityChanged { display_id: DisplayId, showing: bool },

    /// The shell asked for insets to be shown.
    ShowInsets { display_id: DisplayId, types: InsetTypes },

    /// The shell asked for insets to be hidden.
    HideInsets { display_id: DisplayId, types: InsetTypes },

    // ════════════════════════════════════════════════════════════════════════
    // Policy
    // ════════════════════════════════════════════════════════════════════════
    /// The settings source reported a possible policy change.
    SettingsChanged,

    /// Drop the cached policy.
    ResetPolicy,

    // ════════════════════════════════════════════════════════════════════════
    // Queries
    // ════════════════════════════════════════════════════════════════════════
    /// Query state (response sent via oneshot channel).
    Query {
        query: BarQuery,
        respond_to: oneshot::Sender<QueryResult>,
    },

    /// Shutdown the actor gracefully.
    Shutdown,
}

impl BarMessage {
    /// Returns a human-readable name for this message type.
    ///
    /// Used for logging, especially in panic recovery.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::DisplayAdded { .. } => "DisplayAdded",
            Self::DisplayRemoved { .. } => "DisplayRemoved",
            Self::FocusedWindowChanged { .. } => "FocusedWindowChanged",
            Self::InsetsStateChanged { .. } => "InsetsStateChanged",
            Self::OverlayChanged { .. } => "OverlayChanged",
            Self::ImeVisibilityChanged { .. } => "ImeVisibilityChanged",
            Self::ShowInsets { .. } => "ShowInsets",
            Self::HideInsets { .. } => "HideInsets",
            Self::SettingsChanged => "SettingsChanged",
            Self::ResetPolicy => "ResetPolicy",
            Self::Query { .. } => "Query",
            Self::Shutdown => "Shutdown",
        }
    }
}

// ============================================================================
// Queries
// ============================================================================

/// Queries answered by the actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BarQuery {
    /// Authoritative bar decision for a package.
    ComputeVisibility { package: String, requested: InsetTypes },

    /// Bars that stay visible on a display whatever window is focused.
    PersistentBars { display_id: DisplayId, host_package: String },

    /// Current bar policy.
    Policy,

    /// Ids of the live displays.
    DisplayIds,

    /// Policy and every display.
    Snapshot,
}

/// Query responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryResult {
    Visibility(BarVisibility),
    Bars(Option<InsetTypes>),
    Policy(PolicySnapshot),
    DisplayIds(Vec<DisplayId>),
    Snapshot(Box<RegistrySnapshot>),
}

impl QueryResult {
    /// Try to get a visibility pair from the result.
    #[must_use]
    pub fn into_visibility(self) -> Option<BarVisibility> {
        match self {
            Self::Visibility(visibility) => Some(visibility),
            _ => None,
        }
    }

    /// Try to get persistent bars from the result.
    #[must_use]
    pub fn into_bars(self) -> Option<Option<InsetTypes>> {
        match self {
            Self::Bars(bars) => Some(bars),
            _ => None,
        }
    }

    /// Try to get the policy from the result.
    #[must_use]
    pub fn into_policy(self) -> Option<PolicySnapshot> {
        match self {
            Self::Policy(policy) => Some(policy),
            _ => None,
        }
    }

    /// Try to get display ids from the result.
    #[must_use]
    pub fn into_display_ids(self) -> Option<Vec<DisplayId>> {
        match self {
            Self::DisplayIds(ids) => Some(ids),
            _ => None,
        }
    }

    /// Try to get a full snapshot from the result.
    #[must_use]
    pub fn into_snapshot(self) -> Option<RegistrySnapshot> {
        match self {
            Self::Snapshot(snapshot) => Some(*snapshot),
            _ => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
