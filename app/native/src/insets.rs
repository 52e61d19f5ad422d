//! Inset type bitmasks and the show/hide pair derived from them.
//!
//! Every decision in this crate is expressed as a pair of disjoint masks:
//! the inset types that must be shown and the ones that must be hidden.

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Identifier of a physical display.
pub type DisplayId = u32;

bitflags! {
    /// Window inset types a display can show or hide.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct InsetTypes: u32 {
        /// The status bar.
        const STATUS_BARS = 1 << 0;

        /// The navigation bar.
        const NAVIGATION_BARS = 1 << 1;

        /// Caption bar decorations of freeform windows.
        const CAPTION_BAR = 1 << 2;

        /// The on-screen keyboard.
        const IME = 1 << 3;

        /// System overlays drawn above applications.
        const SYSTEM_OVERLAYS = 1 << 4;

        /// Both system bars.
        const SYSTEM_BARS = Self::STATUS_BARS.bits() | Self::NAVIGATION_BARS.bits();
    }
}

impl Default for InsetTypes {
    fn default() -> Self { Self::empty() }
}

impl InsetTypes {
    /// Returns `true` if the status bar bit is set.
    #[must_use]
    pub const fn has_status(self) -> bool { self.contains(Self::STATUS_BARS) }

    /// Returns `true` if the navigation bar bit is set.
    #[must_use]
    pub const fn has_navigation(self) -> bool { self.contains(Self::NAVIGATION_BARS) }

    /// Parses a comma separated list of type names (`status`, `navigation`,
    /// `caption`, `ime`, `overlays`, `all`, `none`).
    ///
    /// # Errors
    ///
    /// Returns the offending token if a name is not recognized.
    pub fn parse_list(value: &str) -> Result<Self, String> {
        let mut types = Self::empty();
        for token in value.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            types |= match token.to_ascii_lowercase().as_str() {
                "status" => Self::STATUS_BARS,
                "navigation" | "nav" => Self::NAVIGATION_BARS,
                "caption" => Self::CAPTION_BAR,
                "ime" | "keyboard" => Self::IME,
                "overlays" => Self::SYSTEM_OVERLAYS,
                "all" | "bars" => Self::SYSTEM_BARS,
                "none" => Self::empty(),
                _ => return Err(token.to_string()),
            };
        }
        Ok(types)
    }

    /// Short human readable names of the set bits.
    #[must_use]
    pub fn names(self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.contains(Self::STATUS_BARS) {
            names.push("status");
        }
        if self.contains(Self::NAVIGATION_BARS) {
            names.push("navigation");
        }
        if self.contains(Self::CAPTION_BAR) {
            names.push("caption");
        }
        if self.contains(Self::IME) {
            names.push("ime");
        }
        if self.contains(Self::SYSTEM_OVERLAYS) {
            names.push("overlays");
        }
        names
    }
}

impl fmt::Display for InsetTypes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("-");
        }
        f.write_str(&self.names().join("+"))
    }
}

/// Inset types to show and to hide, always disjoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BarVisibility {
    /// Types that must become visible.
    pub show: InsetTypes,
    /// Types that must become hidden.
    pub hide: InsetTypes,
}

impl BarVisibility {
    /// Creates a new pair.
    #[must_use]
    pub const fn new(show: InsetTypes, hide: InsetTypes) -> Self { Self { show, hide } }

    /// Both bars shown, nothing hidden.
    #[must_use]
    pub const fn show_all() -> Self { Self::new(InsetTypes::SYSTEM_BARS, InsetTypes::empty()) }

    /// Applies this pair on top of an aggregate visibility mask.
    #[must_use]
    pub fn apply_to(self, visible: InsetTypes) -> InsetTypes { (visible | self.show) - self.hide }

    /// Combines two decisions: anything either side hides stays hidden, and
    /// only the remainder of this pair's show mask is shown.
    #[must_use]
    pub fn restrict(self, other: Self) -> Self {
        let hide = self.hide | other.hide;
        Self::new(self.show - hide, hide)
    }
}

impl fmt::Display for BarVisibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "show: {}, hide: {}", self.show, self.hide)
    }
}

/// Inset state reported by the windowing shell for one display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InsetsState {
    /// Types the shell currently reports as visible.
    pub visible_types: InsetTypes,
}

impl InsetsState {
    /// Creates a state with the given visible types.
    #[must_use]
    pub const fn new(visible_types: InsetTypes) -> Self { Self { visible_types } }
}
