//! Frame transport over an upgraded axum WebSocket.

use std::time::Duration;

use async_trait::async_trait;
use axum::extract::ws::{self, Message, WebSocket};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use wsrpc_transport::{CloseFrame, Control, Frame, FrameTransport, TransportError};

/// Server-side transport for an accepted connection.
pub struct AxumTransport {
    sink: Mutex<SplitSink<WebSocket, Message>>,
    stream: Mutex<SplitStream<WebSocket>>,
    closed: CancellationToken,
}

impl AxumTransport {
    /// Wrap an upgraded socket.
    pub fn new(socket: WebSocket) -> Self {
        let (sink, stream) = socket.split();
        Self {
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
            closed: CancellationToken::new(),
        }
    }

    async fn send(&self, message: Message) -> Result<(), TransportError> {
        if self.closed.is_cancelled() {
            return Err(TransportError::Closed);
        }
        let mut sink = self.sink.lock().await;
        sink.send(message).await.map_err(TransportError::backend)
    }
}

#[async_trait]
impl FrameTransport for AxumTransport {
    async fn read_message(&self) -> Result<Frame, TransportError> {
        let mut stream = tokio::select! {
            () = self.closed.cancelled() => return Err(TransportError::Closed),
            stream = self.stream.lock() => stream,
        };
        loop {
            let next = tokio::select! {
                () = self.closed.cancelled() => return Err(TransportError::Closed),
                next = stream.next() => next,
            };
            match next {
                Some(Ok(Message::Text(text))) => return Ok(Frame::Text(text.as_str().to_owned())),
                Some(Ok(Message::Binary(data))) => return Ok(Frame::Binary(data)),
                Some(Ok(Message::Close(frame))) => {
                    debug!(?frame, "client sent close");
                    return Err(TransportError::Closed);
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                Some(Err(err)) => return Err(TransportError::backend(err)),
                None => return Err(TransportError::Closed),
            }
        }
    }

    async fn write_message(&self, frame: Frame) -> Result<(), TransportError> {
        let message = match frame {
            Frame::Text(text) => Message::Text(text.into()),
            Frame::Binary(data) => Message::Binary(data),
        };
        self.send(message).await
    }

    async fn write_control(
        &self,
        control: Control,
        deadline: Duration,
    ) -> Result<(), TransportError> {
        let message = match control {
            Control::Close(frame) => Message::Close(frame.map(into_axum_close)),
            Control::Ping(data) => Message::Ping(data),
            Control::Pong(data) => Message::Pong(data),
        };
        tokio::time::timeout(deadline, self.send(message))
            .await
            .map_err(|_| TransportError::Timeout(deadline))?
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.closed.cancel();
        let mut sink = self.sink.lock().await;
        if let Err(err) = sink.close().await {
            // Closing a socket the peer already tore down is not a failure.
            debug!(error = %err, "websocket close");
        }
        Ok(())
    }
}

fn into_axum_close(frame: CloseFrame) -> ws::CloseFrame {
    ws::CloseFrame {
        code: frame.code,
        reason: frame.reason.into(),
    }
}
