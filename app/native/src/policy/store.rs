//! Cache of the status and navigation filters built from one setting value.

use std::sync::Arc;

use serde::Serialize;

use super::filter::BarFilter;
use crate::insets::{BarVisibility, InsetTypes};
use crate::settings::{SYSTEM_BAR_VISIBILITY_OVERRIDE, SettingsSource};

/// Forces immersive mode for both bars.
pub const NAME_IMMERSIVE_FULL: &str = "immersive.full";

/// Forces immersive mode for the status bar.
pub const NAME_IMMERSIVE_STATUS: &str = "immersive.status";

/// Forces immersive mode for the navigation bar.
pub const NAME_IMMERSIVE_NAVIGATION: &str = "immersive.navigation";

/// Process-wide filter cache.
///
/// The setting value is a `:` separated list of `name=value` pairs, e.g.
/// `immersive.status=com.package:immersive.navigation=*,+com.maps`.
/// A missing filter means "no override", so the bar is always shown.
#[derive(Debug, Default)]
pub struct FilterPolicyStore {
    setting_value: Option<String>,
    status_filter: Option<Arc<BarFilter>>,
    navigation_filter: Option<Arc<BarFilter>>,
}

/// Serializable view of the store for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicySnapshot {
    /// Last applied raw setting value.
    pub setting_value: Option<String>,
    /// Dump of the status bar filter.
    pub status_filter: Option<String>,
    /// Dump of the navigation bar filter.
    pub navigation_filter: Option<String>,
    /// Whether both bars share one filter (`immersive.full`).
    pub aliased: bool,
}

impl FilterPolicyStore {
    /// Creates an empty store with no filters.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Applies a new setting value.
    ///
    /// Returns `false` without side effects if `value` equals the last one
    /// applied (two missing values are equal).
    pub fn reload(&mut self, value: Option<&str>) -> bool {
        if self.setting_value.as_deref() == value {
            return false;
        }
        self.set_filters(value);
        self.setting_value = value.map(str::to_string);
        tracing::debug!(
            value = value.unwrap_or("<unset>"),
            status = ?self.status_filter.as_deref().map(ToString::to_string),
            navigation = ?self.navigation_filter.as_deref().map(ToString::to_string),
            "bar policy reloaded"
        );
        true
    }

    /// Reads the override setting from `source` and applies it.
    ///
    /// A read failure is logged and treated as "no change": the previous
    /// filters stay in place.
    pub fn reload_from(&mut self, source: &dyn SettingsSource) -> bool {
        match source.read(SYSTEM_BAR_VISIBILITY_OVERRIDE) {
            Ok(value) => self.reload(value.as_deref()),
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    previous = self.setting_value.as_deref().unwrap_or("<unset>"),
                    "failed to load bar policy, keeping previous filters"
                );
                false
            }
        }
    }

    /// Drops every filter and the cached value.
    pub fn reset(&mut self) {
        self.setting_value = None;
        self.status_filter = None;
        self.navigation_filter = None;
    }

    fn set_filters(&mut self, value: Option<&str>) {
        self.status_filter = None;
        self.navigation_filter = None;
        let Some(value) = value else {
            return;
        };
        for pair in value.split(':') {
            let Some((name, filter)) = pair.split_once('=') else {
                continue;
            };
            match name {
                NAME_IMMERSIVE_FULL => {
                    let filter = Arc::new(BarFilter::parse(filter));
                    self.status_filter = Some(Arc::clone(&filter));
                    self.navigation_filter = Some(filter);
                }
                NAME_IMMERSIVE_STATUS => {
                    self.status_filter = Some(Arc::new(BarFilter::parse(filter)));
                }
                NAME_IMMERSIVE_NAVIGATION => {
                    self.navigation_filter = Some(Arc::new(BarFilter::parse(filter)));
                }
                _ => {}
            }
        }
    }

    /// Decides which bars `package` gets, given the types its window requested.
    ///
    /// Each bar is resolved on its own: an allow-control package gets its
    /// request verbatim, a matching package gets the bar hidden, everything
    /// else gets it shown.
    #[must_use]
    pub fn compute_visibility(&self, package: &str, requested: InsetTypes) -> BarVisibility {
        let mut visibility = BarVisibility::default();
        resolve_bar(
            self.status_filter.as_deref(),
            InsetTypes::STATUS_BARS,
            package,
            requested,
            &mut visibility,
        );
        resolve_bar(
            self.navigation_filter.as_deref(),
            InsetTypes::NAVIGATION_BARS,
            package,
            requested,
            &mut visibility,
        );
        visibility
    }

    /// Last applied raw value.
    #[must_use]
    pub fn setting_value(&self) -> Option<&str> { self.setting_value.as_deref() }

    /// Current status bar filter.
    #[must_use]
    pub fn status_filter(&self) -> Option<&BarFilter> { self.status_filter.as_deref() }

    /// Current navigation bar filter.
    #[must_use]
    pub fn navigation_filter(&self) -> Option<&BarFilter> { self.navigation_filter.as_deref() }

    /// Returns `true` if both bars share one filter instance.
    #[must_use]
    pub fn filters_aliased(&self) -> bool {
        match (&self.status_filter, &self.navigation_filter) {
            (Some(status), Some(navigation)) => Arc::ptr_eq(status, navigation),
            _ => false,
        }
    }

    /// Serializable view of the store.
    #[must_use]
    pub fn snapshot(&self) -> PolicySnapshot {
        PolicySnapshot {
            setting_value: self.setting_value.clone(),
            status_filter: self.status_filter.as_deref().map(ToString::to_string),
            navigation_filter: self.navigation_filter.as_deref().map(ToString::to_string),
            aliased: self.filters_aliased(),
        }
    }
}

fn resolve_bar(
    filter: Option<&BarFilter>,
    bar: InsetTypes,
    package: &str,
    requested: InsetTypes,
    visibility: &mut BarVisibility,
) {
    let visible = match filter {
        Some(filter) if filter.is_control_allowed(package) => requested.contains(bar),
        Some(filter) => !filter.matches(package),
        None => true,
    };
    if visible {
        visibility.show |= bar;
    } else {
        visibility.hide |= bar;
    }
}
