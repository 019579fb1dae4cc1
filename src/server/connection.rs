//! WebSocket subscriber session
//!
//! One task per connected display page: complete the WebSocket handshake,
//! register with the hub, then forward queued payloads as text frames until
//! either side goes away. Inbound text is logged and ignored.

use std::io;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{Message, Utf8Bytes};

use crate::error::{Error, Result};
use crate::hub::{HubHandle, SubscriberId};

/// Serve one subscriber until it disconnects
///
/// The subscriber is unregistered from the hub on every exit path.
pub async fn serve_subscriber(
    socket: TcpStream,
    id: SubscriberId,
    hub: HubHandle,
    handshake_timeout: Duration,
) -> Result<()> {
    let ws = match tokio::time::timeout(handshake_timeout, tokio_tungstenite::accept_async(socket))
        .await
    {
        Ok(result) => result?,
        Err(_) => {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::TimedOut,
                "WebSocket handshake timed out",
            )))
        }
    };

    let (mut sink, mut stream) = ws.split();
    let mut queue = hub.subscribe(id)?;

    tracing::debug!(subscriber = %id, "WebSocket session started");

    let result = loop {
        tokio::select! {
            payload = queue.recv() => match payload {
                Some(payload) => {
                    let text = match Utf8Bytes::try_from(payload) {
                        Ok(text) => text,
                        Err(e) => {
                            tracing::warn!(subscriber = %id, error = %e, "Skipping non-UTF-8 payload");
                            continue;
                        }
                    };
                    if let Err(e) = sink.send(Message::Text(text)).await {
                        break Err(Error::from(e));
                    }
                }
                // Dropped by the hub (queue full) or the hub stopped
                None => break Ok(()),
            },
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    tracing::debug!(subscriber = %id, text = %text.as_str(), "Ignoring inbound message");
                }
                Some(Ok(Message::Close(_))) | None => break Ok(()),
                Some(Ok(_)) => {}
                Some(Err(e)) => break Err(Error::from(e)),
            },
        }
    };

    hub.unregister(id);
    let _ = sink.close().await;

    tracing::debug!(subscriber = %id, "WebSocket session ended");
    result
}
