//! Administrator bar policy.
//!
//! The override setting is parsed into [`BarFilter`]s held by a
//! [`FilterPolicyStore`], which answers which bars a package gets.

mod filter;
mod store;

pub use filter::{BarFilter, WILDCARD};
pub use store::{
    FilterPolicyStore, NAME_IMMERSIVE_FULL, NAME_IMMERSIVE_NAVIGATION, NAME_IMMERSIVE_STATUS,
    PolicySnapshot,
};
