//! Per-connection serve loop: one frame in, one dispatch, one frame out.

use std::time::Duration;

use metrics::counter;
use tracing::{debug, info, warn};
use wsrpc_core::ResponseEnvelope;
use wsrpc_transport::{Control, Frame, FrameTransport, TransportError};

use crate::codec::ServerCodec;
use crate::error::ServeError;
use crate::registry::MethodRegistry;
use crate::serve::serve_request;

/// Default deadline for the close frame sent when a connection ends.
pub const CLOSE_DEADLINE: Duration = Duration::from_secs(1);

/// Serve requests on `transport` until it closes or fails.
///
/// Returns `Ok(())` when the peer closes cleanly. Protocol errors are
/// answered with an id-less error envelope and do not end the loop; any
/// other error ends it without a response.
pub async fn serve_connection<T>(transport: &T, registry: &MethodRegistry) -> Result<(), ServeError>
where
    T: FrameTransport + ?Sized,
{
    loop {
        let frame = match transport.read_message().await {
            Ok(frame) => frame,
            Err(TransportError::Closed) => return Ok(()),
            Err(err) => return Err(err.into()),
        };

        let mut codec = ServerCodec::new(frame.as_bytes(), Vec::new());
        let outcome = serve_request(registry, &mut codec).await;
        let output = codec.into_output();

        let reply = match outcome {
            Ok(()) if output.is_empty() => continue,
            Ok(()) => output,
            Err(ServeError::Protocol(err)) => {
                debug!(code = err.code, message = %err.message, "protocol error");
                serde_json::to_vec(&ResponseEnvelope::error_only(err)).map_err(std::io::Error::from)?
            }
            Err(err) => return Err(err),
        };

        let text = String::from_utf8(reply)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        transport.write_message(Frame::Text(text)).await?;
    }
}

/// Run [`serve_connection`], then send a close frame within `close_deadline`.
///
/// A failed close frame is logged and otherwise ignored.
pub async fn serve<T>(
    transport: &T,
    registry: &MethodRegistry,
    close_deadline: Duration,
) -> Result<(), ServeError>
where
    T: FrameTransport + ?Sized,
{
    counter!("wsrpc_connections_total").increment(1);
    let result = serve_connection(transport, registry).await;
    match &result {
        Ok(()) => info!("connection closed by peer"),
        Err(err) => info!(error = %err, "connection ended"),
    }

    match transport
        .write_control(Control::Close(None), close_deadline)
        .await
    {
        Ok(()) => {}
        Err(TransportError::Closed) => debug!("transport already closed, no close frame sent"),
        Err(err) => warn!(error = %err, "failed to send close frame"),
    }
    result
}
