//! The frame transport abstraction.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::TransportError;
use crate::frame::{Control, Frame};

/// A message-framed duplex connection.
///
/// Implementations allow one reader and one writer to make progress
/// concurrently. `close` must also unblock a pending `read_message`, which
/// then fails with [`TransportError::Closed`].
#[async_trait]
pub trait FrameTransport: Send + Sync {
    /// Wait for the next data frame. Ping and pong traffic is consumed
    /// internally. A close frame or end of stream yields
    /// [`TransportError::Closed`].
    async fn read_message(&self) -> Result<Frame, TransportError>;

    /// Send one data frame.
    async fn write_message(&self, frame: Frame) -> Result<(), TransportError>;

    /// Send a control frame, giving up after `deadline`.
    async fn write_control(&self, control: Control, deadline: Duration)
    -> Result<(), TransportError>;

    /// Close the connection. Best-effort; in-flight operations fail.
    async fn close(&self) -> Result<(), TransportError>;
}

#[async_trait]
impl<T: FrameTransport + ?Sized> FrameTransport for Arc<T> {
    async fn read_message(&self) -> Result<Frame, TransportError> {
        (**self).read_message().await
    }

    async fn write_message(&self, frame: Frame) -> Result<(), TransportError> {
        (**self).write_message(frame).await
    }

    async fn write_control(
        &self,
        control: Control,
        deadline: Duration,
    ) -> Result<(), TransportError> {
        (**self).write_control(control, deadline).await
    }

    async fn close(&self) -> Result<(), TransportError> {
        (**self).close().await
    }
}
