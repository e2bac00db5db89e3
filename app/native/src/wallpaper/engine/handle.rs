//! Handle for communicating with a mounted engine.
//!
//! The `EngineHandle` is cheap to clone and can be shared across tasks.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use super::messages::{EngineMessage, EngineState};

/// Error types for engine communication.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// Failed to send message to the engine.
    #[error("Failed to send message to engine: channel closed")]
    SendFailed,

    /// Failed to receive response from the engine.
    #[error("Failed to receive response from engine: channel closed")]
    ReceiveFailed,

    /// Query timed out.
    #[error("Query timed out after {0:?}")]
    Timeout(Duration),
}

/// Handle for communicating with a mounted engine.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    sender: mpsc::Sender<EngineMessage>,
}

impl EngineHandle {
    /// Create a new handle with the given sender.
    pub(crate) const fn new(sender: mpsc::Sender<EngineMessage>) -> Self { Self { sender } }

    // ========================================================================
    // Fire-and-forget sending
    // ========================================================================

    /// Send a message without waiting for delivery.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SendFailed`] if the engine has stopped or its
    /// queue is full.
    pub fn send(&self, msg: EngineMessage) -> Result<(), EngineError> {
        self.sender.try_send(msg).map_err(|_| EngineError::SendFailed)
    }

    /// Send a message and wait for delivery.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SendFailed`] if the engine has stopped.
    pub async fn send_async(&self, msg: EngineMessage) -> Result<(), EngineError> {
        self.sender.send(msg).await.map_err(|_| EngineError::SendFailed)
    }

    /// Re-resolve the session selector and load it.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SendFailed`] if the engine has stopped.
    pub fn reload(&self) -> Result<(), EngineError> { self.send(EngineMessage::Reload) }

    /// Re-render the active procedural mode, keeping its surface.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SendFailed`] if the engine has stopped.
    pub fn refresh_config(&self) -> Result<(), EngineError> { self.send(EngineMessage::RefreshConfig) }

    /// Tell the engine the viewport changed.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SendFailed`] if the engine has stopped.
    pub fn viewport_resized(&self) -> Result<(), EngineError> { self.send(EngineMessage::ViewportResized) }

    /// Stop the engine after tearing everything down.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SendFailed`] if the engine has already stopped.
    pub async fn shutdown(&self) -> Result<(), EngineError> { self.send_async(EngineMessage::Shutdown).await }

    /// Whether the engine has stopped.
    #[must_use]
    pub fn is_closed(&self) -> bool { self.sender.is_closed() }

    // ========================================================================
    // Query methods
    // ========================================================================

    /// Current state.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the engine fails.
    pub async fn state(&self) -> Result<EngineState, EngineError> {
        self.request(|respond_to| EngineMessage::State { respond_to }).await
    }

    /// State once no load is pending and every session change was handled.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the engine fails.
    pub async fn settled(&self) -> Result<EngineState, EngineError> {
        self.request(|respond_to| EngineMessage::Settle { respond_to }).await
    }

    /// [`Self::settled`] with a timeout.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Timeout`] if the engine does not settle in time,
    /// or any error from [`Self::settled`].
    pub async fn settled_timeout(&self, timeout: Duration) -> Result<EngineState, EngineError> {
        tokio::time::timeout(timeout, self.settled())
            .await
            .map_err(|_| EngineError::Timeout(timeout))?
    }

    async fn request(
        &self,
        build: impl FnOnce(oneshot::Sender<EngineState>) -> EngineMessage,
    ) -> Result<EngineState, EngineError> {
        let (tx, rx) = oneshot::channel();

        self.sender.send(build(tx)).await.map_err(|_| EngineError::SendFailed)?;

        rx.await.map_err(|_| EngineError::ReceiveFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_closed_engine_reports_send_failure() {
        let (sender, receiver) = mpsc::channel(1);
        drop(receiver);
        let handle = EngineHandle::new(sender);

        assert!(handle.is_closed());
        assert_eq!(handle.reload(), Err(EngineError::SendFailed));
        assert_eq!(handle.state().await, Err(EngineError::SendFailed));
    }

    #[tokio::test]
    async fn test_dropped_reply_reports_receive_failure() {
        let (sender, mut receiver) = mpsc::channel(1);
        let handle = EngineHandle::new(sender);

        tokio::spawn(async move {
            // Drop the responder without answering.
            let _ = receiver.recv().await;
        });

        assert_eq!(handle.state().await, Err(EngineError::ReceiveFailed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_settle_times_out() {
        let (sender, _receiver) = mpsc::channel(1);
        let handle = EngineHandle::new(sender);
        let timeout = Duration::from_millis(50);

        assert_eq!(handle.settled_timeout(timeout).await, Err(EngineError::Timeout(timeout)));
    }
}
