//! A single immersive rule parsed from a comma separated token list.
//!
//! Grammar: `token (',' token)*` where each trimmed token is one of
//! - `-pkg` exempts `pkg` from the rule,
//! - `+pkg` lets `pkg` control the bar through its own request,
//! - `pkg` or `*` applies the rule.
//!
//! A lone `-` or `+` is taken literally as a package name.

use std::collections::BTreeSet;
use std::fmt;

/// Token matching every package.
pub const WILDCARD: &str = "*";

/// Immutable include/exclude/allow-control rule set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BarFilter {
    to_include: BTreeSet<String>,
    to_exclude: BTreeSet<String>,
    allow_control: BTreeSet<String>,
}

impl BarFilter {
    /// Parses a comma separated token list. Malformed tokens are never
    /// rejected, so parsing always yields a filter.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        let mut filter = Self::default();
        for token in value.split(',').map(str::trim) {
            if let Some(package) = token.strip_prefix('-').filter(|p| !p.is_empty()) {
                filter.to_exclude.insert(package.to_string());
            } else if let Some(package) = token.strip_prefix('+').filter(|p| !p.is_empty()) {
                filter.allow_control.insert(package.to_string());
            } else {
                filter.to_include.insert(token.to_string());
            }
        }
        filter
    }

    /// Returns `true` if the rule applies to `package`.
    ///
    /// Exclusion always wins over inclusion.
    #[must_use]
    pub fn matches(&self, package: &str) -> bool {
        if self.is_excluded(package) {
            return false;
        }
        self.to_include.contains(WILDCARD) || self.to_include.contains(package)
    }

    /// Returns `true` if `package` may override the rule with its own request.
    #[must_use]
    pub fn is_control_allowed(&self, package: &str) -> bool {
        self.allow_control.contains(WILDCARD) || self.allow_control.contains(package)
    }

    fn is_excluded(&self, package: &str) -> bool {
        self.to_exclude.contains(WILDCARD) || self.to_exclude.contains(package)
    }

    /// Packages the rule applies to.
    #[must_use]
    pub const fn included(&self) -> &BTreeSet<String> { &self.to_include }

    /// Packages exempted from the rule.
    #[must_use]
    pub const fn excluded(&self) -> &BTreeSet<String> { &self.to_exclude }

    /// Packages allowed to control the bar.
    #[must_use]
    pub const fn control_allowed(&self) -> &BTreeSet<String> { &self.allow_control }
}

fn write_set(f: &mut fmt::Formatter<'_>, name: &str, set: &BTreeSet<String>) -> fmt::Result {
    write!(f, "{name}=(")?;
    for (i, package) in set.iter().enumerate() {
        if i > 0 {
            f.write_str(",")?;
        }
        f.write_str(package)?;
    }
    f.write_str(")")
}

impl fmt::Display for BarFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BarFilter[")?;
        write_set(f, "include", &self.to_include)?;
        f.write_str(", ")?;
        write_set(f, "exclude", &self.to_exclude)?;
        f.write_str(", ")?;
        write_set(f, "allow_control", &self.allow_control)?;
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sorts_tokens_into_sets() {
        let filter = BarFilter::parse(" com.a , -com.b,+com.c,* ");

        assert!(filter.included().contains("com.a"));
        assert!(filter.included().contains(WILDCARD));
        assert!(filter.excluded().contains("com.b"));
        assert!(filter.control_allowed().contains("com.c"));
        assert_eq!(filter.included().len(), 2);
    }

    #[test]
    fn test_lone_modifier_is_a_literal_package() {
        let filter = BarFilter::parse("-,+");

        assert!(filter.included().contains("-"));
        assert!(filter.included().contains("+"));
        assert!(filter.excluded().is_empty());
        assert!(filter.control_allowed().is_empty());
        assert!(filter.matches("-"));
    }

    #[test]
    fn test_exclusion_wins_over_inclusion() {
        let filter = BarFilter::parse("com.a,-com.a");
        assert!(!filter.matches("com.a"));

        let filter = BarFilter::parse("*,-com.b");
        assert!(filter.matches("com.a"));
        assert!(!filter.matches("com.b"));
    }

    #[test]
    fn test_wildcard_exclusion_blocks_everything() {
        let filter = BarFilter::parse("com.a,-*");
        assert!(!filter.matches("com.a"));
        assert!(!filter.matches("com.z"));
    }

    #[test]
    fn test_matches_requires_inclusion() {
        let filter = BarFilter::parse("com.a");
        assert!(filter.matches("com.a"));
        assert!(!filter.matches("com.b"));
    }

    #[test]
    fn test_control_allowed() {
        let filter = BarFilter::parse("*,+com.a");
        assert!(filter.is_control_allowed("com.a"));
        assert!(!filter.is_control_allowed("com.b"));

        let filter = BarFilter::parse("+*");
        assert!(filter.is_control_allowed("anything"));
    }

    #[test]
    fn test_package_may_appear_in_every_set() {
        let filter = BarFilter::parse("com.a,-com.a,+com.a");
        assert!(!filter.matches("com.a"));
        assert!(filter.is_control_allowed("com.a"));
    }

    #[test]
    fn test_display_dump() {
        let filter = BarFilter::parse("b,a,-c,+d");
        assert_eq!(
            filter.to_string(),
            "BarFilter[include=(a,b), exclude=(c), allow_control=(d)]"
        );
    }
}
