//! Codec over a byte stream, such as a [`StreamBridge`](wsrpc_transport::StreamBridge).

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tracing::debug;
use wsrpc_core::{Params, RequestKind, ResponseEnvelope};
use wsrpc_transport::JsonDocumentReader;

use crate::codec::{ResponseHeader, RpcCodec, correlate, decode_body, encode_request, forget};
use crate::error::ClientError;
use crate::pending::PendingTable;

/// Codec writing newline-terminated envelopes to a byte stream and reading
/// whole JSON documents back.
pub struct StreamCodec<S> {
    reader: tokio::sync::Mutex<JsonDocumentReader<ReadHalf<S>>>,
    writer: tokio::sync::Mutex<WriteHalf<S>>,
    pending: PendingTable,
    last: Mutex<Option<ResponseEnvelope>>,
}

impl<S: AsyncRead + AsyncWrite + Send> StreamCodec<S> {
    /// Codec over `stream`.
    pub fn new(stream: S) -> Self {
        let (reader, writer) = tokio::io::split(stream);
        Self {
            reader: tokio::sync::Mutex::new(JsonDocumentReader::new(reader)),
            writer: tokio::sync::Mutex::new(writer),
            pending: PendingTable::new(),
            last: Mutex::new(None),
        }
    }

    /// Calls sent and not yet answered.
    pub fn pending(&self) -> &PendingTable {
        &self.pending
    }
}

#[async_trait]
impl<S: AsyncRead + AsyncWrite + Send> RpcCodec for StreamCodec<S> {
    async fn write_request(
        &self,
        method: &str,
        params: Params,
        kind: RequestKind,
    ) -> Result<(), ClientError> {
        let mut text = encode_request(&self.pending, method, params, kind)?;
        text.push('\n');
        let mut writer = self.writer.lock().await;
        debug!(method, ?kind, "writing request to stream");
        let written = match writer.write_all(text.as_bytes()).await {
            Ok(()) => writer.flush().await,
            Err(err) => Err(err),
        };
        if let Err(err) = written {
            forget(&self.pending, kind);
            return Err(err.into());
        }
        Ok(())
    }

    async fn read_response_header(&self) -> Result<ResponseHeader, ClientError> {
        let document = self.reader.lock().await.next_document().await?;
        let Some(document) = document else {
            return Err(ClientError::Closed);
        };
        let (header, envelope) = correlate(&self.pending, &document)?;
        *self.last.lock() = Some(envelope);
        Ok(header)
    }

    async fn read_response_body<D: DeserializeOwned + Send>(
        &self,
        dest: Option<&mut D>,
    ) -> Result<(), ClientError> {
        let envelope = self.last.lock().take();
        decode_body(envelope, dest)
    }

    async fn close(&self) -> Result<(), ClientError> {
        self.writer.lock().await.shutdown().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::{Value, json};
    use tokio::io::{AsyncBufReadExt, BufReader};
    use wsrpc_transport::{FrameTransport, MemoryTransport, StreamBridge};

    use super::*;

    #[tokio::test]
    async fn request_is_one_line() {
        let (local, remote) = tokio::io::duplex(1024);
        let codec = StreamCodec::new(local);
        codec
            .write_request("Echo", Params::Array(vec![json!("hi")]), RequestKind::Call(0))
            .await
            .unwrap();

        let mut lines = BufReader::new(remote).lines();
        let line = lines.next_line().await.unwrap().unwrap();
        let sent: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(sent["id"], 0);
        assert!(codec.pending().contains(0));
    }

    #[tokio::test]
    async fn reads_packed_responses() {
        let (local, mut remote) = tokio::io::duplex(1024);
        let codec = StreamCodec::new(local);
        remote
            .write_all(br#"{"jsonrpc":"2.0","id":0,"result":1}{"jsonrpc":"2.0","id":1,"result":2}"#)
            .await
            .unwrap();

        let first = codec.read_response_header().await.unwrap();
        let mut out: Option<i64> = None;
        codec.read_response_body(Some(&mut out)).await.unwrap();
        assert_eq!((first.seq, out), (0, Some(1)));

        let second = codec.read_response_header().await.unwrap();
        codec.read_response_body(Some(&mut out)).await.unwrap();
        assert_eq!((second.seq, out), (1, Some(2)));
    }

    #[tokio::test]
    async fn end_of_stream_is_closed() {
        let (local, remote) = tokio::io::duplex(64);
        let codec = StreamCodec::new(local);
        drop(remote);
        assert_matches!(codec.read_response_header().await, Err(ClientError::Closed));
    }

    #[tokio::test]
    async fn works_over_stream_bridge() {
        let (local, remote) = MemoryTransport::pair();
        let codec = StreamCodec::new(StreamBridge::new(local));

        codec
            .write_request("Ping", Params::None, RequestKind::Call(3))
            .await
            .unwrap();
        let frame = remote.read_message().await.unwrap();
        assert_eq!(frame.as_bytes(), br#"{"jsonrpc":"2.0","method":"Ping","id":3}"#);

        remote
            .write_message(wsrpc_transport::Frame::text(
                r#"{"jsonrpc":"2.0","id":3,"result":"pong"}"#,
            ))
            .await
            .unwrap();
        let header = codec.read_response_header().await.unwrap();
        assert_eq!(header.method, "Ping");
        let mut out: Option<String> = None;
        codec.read_response_body(Some(&mut out)).await.unwrap();
        assert_eq!(out.as_deref(), Some("pong"));
    }
}
