//! Events published to per-display listener groups.
//!
//! ## Naming Convention
//!
//! Every event has a stable name of the form `sysbars://<module>/<event-name>`,
//! used in logs and in the JSON form printed by the CLI.
//!
//! - `sysbars://keyboard/visibility-changed` - On-screen keyboard shown or hidden

use serde::{Deserialize, Serialize};

/// Keyboard related event names.
pub mod keyboard {
    /// Emitted when the on-screen keyboard of a display is shown or hidden.
    ///
    /// Payload: `{ showing: bool }`
    pub const VISIBILITY_CHANGED: &str = "sysbars://keyboard/visibility-changed";
}

/// An event delivered to every listener of one display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum DisplayEvent {
    /// The on-screen keyboard was shown (`true`) or hidden (`false`).
    KeyboardVisibilityChanged {
        /// Whether the keyboard is now on screen.
        showing: bool,
    },
}

impl DisplayEvent {
    /// Stable event name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::KeyboardVisibilityChanged { .. } => keyboard::VISIBILITY_CHANGED,
        }
    }
}
