//! Sysbars - per-display system bar visibility policy for windowing shells.
//!
//! A settings-driven policy (`immersive.full=com.video:immersive.status=*`)
//! decides, for the focused package on each display, which system bars are
//! shown and which are hidden. One coordinator per display pushes the result
//! to the shell's insets controller, and a single actor serializes every
//! window, settings and IME event.

// Policy core
pub mod insets;
pub mod policy;
pub mod settings;

// Runtime
pub mod actor;
pub mod broadcast;
pub mod display;
pub mod events;

// Ambient
pub mod cli;
pub mod config;
pub mod error;
pub mod schema;
