//! Per-display bar control.
//!
//! A [`DisplayRegistry`] owns one [`PerDisplayCoordinator`] per live display
//! and the [`FilterPolicyStore`](crate::policy::FilterPolicyStore) they all
//! consult. Coordinators push their decisions to the windowing shell through
//! an [`InsetsControllerProxy`].

mod coordinator;
mod registry;
pub mod shell;
mod state;

pub use coordinator::{DisplaySnapshot, PerDisplayCoordinator};
pub use registry::{DisplayRegistry, PersistencySource, RegistrySnapshot};
pub use shell::{InsetsControllerProxy, LoggingShell, ShellError, WindowShell};
pub use state::{DisplayBarState, ImmersiveState, PersistencyBehavior};
