//! tokio-tungstenite transport, used on the client side.

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::protocol::CloseFrame as WsCloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::TransportError;
use crate::frame::{CloseFrame, Control, Frame};
use crate::transport::FrameTransport;

/// Transport over a [`WebSocketStream`].
///
/// The stream is split so one reader and one writer can run concurrently.
pub struct TungsteniteTransport<S> {
    sink: Mutex<SplitSink<WebSocketStream<S>, Message>>,
    stream: Mutex<SplitStream<WebSocketStream<S>>>,
    closed: CancellationToken,
}

impl<S> TungsteniteTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Wrap an established WebSocket stream.
    pub fn new(ws: WebSocketStream<S>) -> Self {
        let (sink, stream) = ws.split();
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
        sink.send(message).await.map_err(map_ws_error)
    }
}

/// Transport of a client socket opened by [`connect`].
pub type WsClientTransport = TungsteniteTransport<MaybeTlsStream<TcpStream>>;

/// Open a client connection to `url` (`ws://` or `wss://`).
pub async fn connect(url: &str) -> Result<WsClientTransport, TransportError> {
    let (ws, response) = tokio_tungstenite::connect_async(url).await?;
    debug!(url, status = %response.status(), "websocket connected");
    Ok(TungsteniteTransport::new(ws))
}

#[async_trait]
impl<S> FrameTransport for TungsteniteTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
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
                    debug!(?frame, "peer sent close");
                    return Err(TransportError::Closed);
                }
                // Pongs for pings are queued by tungstenite itself.
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {}
                Some(Err(err)) => return Err(map_ws_error(err)),
                None => return Err(TransportError::Closed),
            }
        }
    }

    async fn write_message(&self, frame: Frame) -> Result<(), TransportError> {
        let message = match frame {
            Frame::Text(text) => Message::text(text),
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
            Control::Close(frame) => Message::Close(frame.map(into_ws_close)),
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
        match sink.close().await {
            Ok(()) => Ok(()),
            Err(err) => match map_ws_error(err) {
                TransportError::Closed => Ok(()),
                other => Err(other),
            },
        }
    }
}

fn into_ws_close(frame: CloseFrame) -> WsCloseFrame {
    WsCloseFrame {
        code: CloseCode::from(frame.code),
        reason: frame.reason.into(),
    }
}

fn map_ws_error(err: tungstenite::Error) -> TransportError {
    match err {
        tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
            TransportError::Closed
        }
        other => TransportError::WebSocket(other),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use tokio::io::DuplexStream;
    use tokio_tungstenite::tungstenite::protocol::Role;

    use super::*;

    async fn ws_pair() -> (
        TungsteniteTransport<DuplexStream>,
        WebSocketStream<DuplexStream>,
    ) {
        let (a, b) = tokio::io::duplex(16 * 1024);
        let client = WebSocketStream::from_raw_socket(a, Role::Client, None).await;
        let server = WebSocketStream::from_raw_socket(b, Role::Server, None).await;
        (TungsteniteTransport::new(client), server)
    }

    #[tokio::test]
    async fn text_frame_roundtrip() {
        let (transport, mut server) = ws_pair().await;

        transport.write_message(Frame::text(r#"{"id":1}"#)).await.unwrap();
        let received = server.next().await.unwrap().unwrap();
        assert_eq!(received, Message::text(r#"{"id":1}"#));

        server.send(Message::text("[1,2]")).await.unwrap();
        assert_eq!(transport.read_message().await.unwrap(), Frame::text("[1,2]"));
    }

    #[tokio::test]
    async fn binary_frames_are_data() {
        let (transport, mut server) = ws_pair().await;
        server
            .send(Message::Binary(bytes::Bytes::from_static(b"{}")))
            .await
            .unwrap();
        assert_eq!(transport.read_message().await.unwrap().as_bytes(), b"{}");
    }

    #[tokio::test]
    async fn pings_are_skipped() {
        let (transport, mut server) = ws_pair().await;
        server
            .send(Message::Ping(bytes::Bytes::from_static(b"hb")))
            .await
            .unwrap();
        server.send(Message::text("{}")).await.unwrap();
        assert_eq!(transport.read_message().await.unwrap(), Frame::text("{}"));
    }

    #[tokio::test]
    async fn peer_close_is_closed() {
        let (transport, mut server) = ws_pair().await;
        server.close(None).await.unwrap();
        assert_matches!(transport.read_message().await, Err(TransportError::Closed));
    }

    #[tokio::test]
    async fn close_control_reaches_peer() {
        let (transport, mut server) = ws_pair().await;
        transport
            .write_control(Control::Close(Some(CloseFrame::normal())), Duration::from_secs(1))
            .await
            .unwrap();
        let received = server.next().await.unwrap().unwrap();
        assert_matches!(received, Message::Close(Some(frame)) if u16::from(frame.code) == 1000);
    }

    #[tokio::test]
    async fn local_close_unblocks_reader_and_fails_writes() {
        let (transport, _server) = ws_pair().await;
        let transport = std::sync::Arc::new(transport);
        let reader = {
            let transport = transport.clone();
            tokio::spawn(async move { transport.read_message().await })
        };
        tokio::task::yield_now().await;
        let _ = transport.close().await;
        assert_matches!(reader.await.unwrap(), Err(TransportError::Closed));
        assert_matches!(
            transport.write_message(Frame::text("{}")).await,
            Err(TransportError::Closed)
        );
    }
}
