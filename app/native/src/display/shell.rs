//! Interfaces to the windowing shell that renders the bars.

use thiserror::Error;

use crate::insets::{DisplayId, InsetTypes};

/// Failure reported by the windowing shell.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShellError {
    /// A call to the shell failed.
    #[error("Shell call failed on display {display_id}: {message}")]
    Rpc {
        /// Display the call targeted.
        display_id: DisplayId,
        /// Reason reported by the shell.
        message: String,
    },
}

/// Per-display proxy to the shell's insets controller.
pub trait InsetsControllerProxy: Send {
    /// Shows the given inset types.
    fn show(&self, types: InsetTypes);

    /// Hides the given inset types.
    fn hide(&self, types: InsetTypes);

    /// Forwards the aggregate requested visible types of the display.
    ///
    /// # Errors
    ///
    /// Returns [`ShellError`] if the shell rejects the call.
    fn set_requested_visible_types(
        &self,
        display_id: DisplayId,
        types: InsetTypes,
    ) -> Result<(), ShellError>;
}

/// The windowing shell, handing out one insets controller per display.
pub trait WindowShell: Send + Sync {
    /// Takes control of the insets of `display_id`.
    fn insets_controller(&self, display_id: DisplayId) -> Box<dyn InsetsControllerProxy>;

    /// Gives control of the insets of `display_id` back to the shell.
    ///
    /// # Errors
    ///
    /// Returns [`ShellError`] if the shell rejects the call.
    fn release(&self, display_id: DisplayId) -> Result<(), ShellError>;
}

/// Shell that only logs what it is asked to do.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingShell;

struct LoggingProxy {
    display_id: DisplayId,
}

impl InsetsControllerProxy for LoggingProxy {
    fn show(&self, types: InsetTypes) {
        tracing::info!(display = self.display_id, types = %types, "show insets");
    }

    fn hide(&self, types: InsetTypes) {
        tracing::info!(display = self.display_id, types = %types, "hide insets");
    }

    fn set_requested_visible_types(
        &self,
        display_id: DisplayId,
        types: InsetTypes,
    ) -> Result<(), ShellError> {
        tracing::info!(display = display_id, types = %types, "requested visible types");
        Ok(())
    }
}

impl WindowShell for LoggingShell {
    fn insets_controller(&self, display_id: DisplayId) -> Box<dyn InsetsControllerProxy> {
        tracing::debug!(display = display_id, "insets controller attached");
        Box::new(LoggingProxy { display_id })
    }

    fn release(&self, display_id: DisplayId) -> Result<(), ShellError> {
        tracing::debug!(display = display_id, "insets controller released");
        Ok(())
    }
}
