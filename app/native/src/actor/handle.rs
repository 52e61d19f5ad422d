//! Handle for communicating with the bar policy actor.
//!
//! The `BarPolicyHandle` is a cheap, cloneable interface for sending events
//! to the actor and querying its state.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use super::messages::{BarMessage, BarQuery, QueryResult};
use crate::display::RegistrySnapshot;
use crate::insets::{BarVisibility, DisplayId, InsetTypes, InsetsState};
use crate::policy::PolicySnapshot;

/// Error types for actor communication.
#[derive(Debug, thiserror::Error)]
pub enum ActorError {
    /// Failed to send message to actor.
    #[error("Failed to send message to actor: channel closed")]
    SendFailed,

    /// Failed to receive response from actor.
    #[error("Failed to receive response from actor: channel closed")]
    ReceiveFailed,

    /// Query timed out.
    #[error("Query timed out after {0:?}")]
    Timeout(Duration),

    /// The actor answered with a result of the wrong kind.
    #[error("Unexpected query result for {0}")]
    UnexpectedResult(&'static str),
}

/// Handle for communicating with the bar policy actor.
///
/// This handle is cheap to clone and can be shared across threads.
#[derive(Clone)]
pub struct BarPolicyHandle {
    sender: mpsc::Sender<BarMessage>,
}

impl BarPolicyHandle {
    /// Create a new handle with the given sender.
    pub(crate) const fn new(sender: mpsc::Sender<BarMessage>) -> Self { Self { sender } }

    // ========================================================================
    // Fire-and-forget sending
    // ========================================================================

    /// Send a message to the actor without waiting for delivery.
    ///
    /// # Errors
    ///
    /// Returns [`ActorError::SendFailed`] if the channel is closed or full.
    pub fn send(&self, msg: BarMessage) -> Result<(), ActorError> {
        self.sender.try_send(msg).map_err(|_| ActorError::SendFailed)
    }

    /// Send a message to the actor and wait for delivery.
    ///
    /// # Errors
    ///
    /// Returns [`ActorError::SendFailed`] if the channel is closed.
    pub async fn send_async(&self, msg: BarMessage) -> Result<(), ActorError> {
        self.sender.send(msg).await.map_err(|_| ActorError::SendFailed)
    }

    // ========================================================================
    // Query methods
    // ========================================================================

    /// Execute a query and wait for the result.
    ///
    /// # Errors
    ///
    /// Returns [`ActorError::SendFailed`] if the channel is closed, or
    /// [`ActorError::ReceiveFailed`] if the response channel is closed.
    pub async fn query(&self, query: BarQuery) -> Result<QueryResult, ActorError> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(BarMessage::Query { query, respond_to: tx })
            .await
            .map_err(|_| ActorError::SendFailed)?;

        rx.await.map_err(|_| ActorError::ReceiveFailed)
    }

    /// Execute a query with a timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ActorError::Timeout`] if the query doesn't complete in time,
    /// or any error from [`Self::query`].
    pub async fn query_timeout(
        &self,
        query: BarQuery,
        timeout: Duration,
    ) -> Result<QueryResult, ActorError> {
        tokio::time::timeout(timeout, self.query(query))
            .await
            .map_err(|_| ActorError::Timeout(timeout))?
    }

    // ========================================================================
    // Convenience query methods
    // ========================================================================

    /// Authoritative bar decision for `package`.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the actor fails.
    pub async fn compute_visibility(
        &self,
        package: &str,
        requested: InsetTypes,
    ) -> Result<BarVisibility, ActorError> {
        self.query(BarQuery::ComputeVisibility { package: package.to_string(), requested })
            .await?
            .into_visibility()
            .ok_or(ActorError::UnexpectedResult("ComputeVisibility"))
    }

    /// Bars that stay visible on `display_id`, `None` for an unknown display.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the actor fails.
    pub async fn persistent_bars(
        &self,
        display_id: DisplayId,
        host_package: &str,
    ) -> Result<Option<InsetTypes>, ActorError> {
        self.query(BarQuery::PersistentBars {
            display_id,
            host_package: host_package.to_string(),
        })
        .await?
        .into_bars()
        .ok_or(ActorError::UnexpectedResult("PersistentBars"))
    }

    /// Current bar policy.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the actor fails.
    pub async fn policy(&self) -> Result<PolicySnapshot, ActorError> {
        self.query(BarQuery::Policy)
            .await?
            .into_policy()
            .ok_or(ActorError::UnexpectedResult("Policy"))
    }

    /// Ids of the live displays.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the actor fails.
    pub async fn display_ids(&self) -> Result<Vec<DisplayId>, ActorError> {
        self.query(BarQuery::DisplayIds)
            .await?
            .into_display_ids()
            .ok_or(ActorError::UnexpectedResult("DisplayIds"))
    }

    /// Policy and every display.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the actor fails.
    pub async fn snapshot(&self) -> Result<RegistrySnapshot, ActorError> {
        self.query(BarQuery::Snapshot)
            .await?
            .into_snapshot()
            .ok_or(ActorError::UnexpectedResult("Snapshot"))
    }

    // ========================================================================
    // Convenience event methods
    // ========================================================================

    /// Report a connected display.
    ///
    /// # Errors
    ///
    /// Returns [`ActorError::SendFailed`] if the channel is closed.
    pub fn display_added(&self, display_id: DisplayId) -> Result<(), ActorError> {
        self.send(BarMessage::DisplayAdded { display_id })
    }

    /// Report a disconnected display.
    ///
    /// # Errors
    ///
    /// Returns [`ActorError::SendFailed`] if the channel is closed.
    pub fn display_removed(&self, display_id: DisplayId) -> Result<(), ActorError> {
        self.send(BarMessage::DisplayRemoved { display_id })
    }

    /// Report a focus change on a display.
    ///
    /// # Errors
    ///
    /// Returns [`ActorError::SendFailed`] if the channel is closed.
    pub fn focused_window_changed(
        &self,
        display_id: DisplayId,
        package: Option<&str>,
        requested: InsetTypes,
    ) -> Result<(), ActorError> {
        self.send(BarMessage::FocusedWindowChanged {
            display_id,
            package: package.map(str::to_string),
            requested,
        })
    }

    /// Report a new inset state for a display.
    ///
    /// # Errors
    ///
    /// Returns [`ActorError::SendFailed`] if the channel is closed.
    pub fn insets_state_changed(
        &self,
        display_id: DisplayId,
        state: InsetsState,
    ) -> Result<(), ActorError> {
        self.send(BarMessage::InsetsStateChanged { display_id, state })
    }

    /// Report a resource or overlay change on a display.
    ///
    /// # Errors
    ///
    /// Returns [`ActorError::SendFailed`] if the channel is closed.
    pub fn overlay_changed(&self, display_id: DisplayId) -> Result<(), ActorError> {
        self.send(BarMessage::OverlayChanged { display_id })
    }

    /// Report the keyboard of a display being shown or hidden.
    ///
    /// # Errors
    ///
    /// Returns [`ActorError::SendFailed`] if the channel is closed.
    pub fn ime_visibility_changed(
        &self,
        display_id: DisplayId,
        showing: bool,
    ) -> Result<(), ActorError> {
        self.send(BarMessage::ImeVisibilityChanged { display_id, showing })
    }

    /// Request shutdown of the actor.
    ///
    /// # Errors
    ///
    /// Returns [`ActorError::SendFailed`] if the channel is closed.
    pub fn shutdown(&self) -> Result<(), ActorError> { self.send(BarMessage::Shutdown) }

    // ========================================================================
    // Channel state
    // ========================================================================

    /// Check if the actor is still running (channel is open).
    #[must_use]
    pub fn is_alive(&self) -> bool { !self.sender.is_closed() }

    /// Get the number of messages waiting in the queue.
    #[must_use]
    pub fn pending_messages(&self) -> usize { self.sender.max_capacity() - self.sender.capacity() }
}

impl std::fmt::Debug for BarPolicyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BarPolicyHandle")
            .field("alive", &self.is_alive())
            .field("pending", &self.pending_messages())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
