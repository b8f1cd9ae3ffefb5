//! Connection Pumps
//!
//! Two tasks per session. The read pump owns the transport's receive half,
//! parses frames, hands them to the router, and initiates teardown when the
//! session ends for any reason. The write pump owns the send half, drains
//! the mailbox in FIFO order, and keeps the peer alive with periodic pings.
//!
//! The read-inactivity deadline is refreshed by any inbound frame (the
//! transport layer answers our pings with pongs, which count). The ping
//! interval is 90% of that deadline so a healthy peer always refreshes in
//! time.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::ws::{close_code, CloseFrame, Message, Utf8Bytes, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::time::timeout;

use crate::shared::WireMessage;

use super::{ChatHub, Connection, DisconnectReason, Outbound};

/// Drive the receive half until the session ends, then run teardown.
pub(crate) async fn read_pump(
    hub: Arc<ChatHub>,
    conn: Arc<Connection>,
    mut stream: SplitStream<WebSocket>,
) {
    let read_timeout = hub.settings().read_timeout;
    let reason = loop {
        tokio::select! {
            _ = conn.shutdown_requested() => {
                break DisconnectReason::Superseded;
            }
            next = timeout(read_timeout, stream.next()) => match next {
                Err(_) => {
                    tracing::warn!("[Hub] Read timeout for {}", conn.identity());
                    break DisconnectReason::ReadTimeout;
                }
                Ok(None) => break DisconnectReason::PeerClosed,
                Ok(Some(Err(e))) => {
                    tracing::warn!("[Hub] Read error for {}: {}", conn.identity(), e);
                    break DisconnectReason::ReadError;
                }
                Ok(Some(Ok(frame))) => match frame {
                    Message::Text(text) => match serde_json::from_str::<WireMessage>(text.as_str()) {
                        Ok(message) => hub.route(&conn, message).await,
                        Err(e) => {
                            // Malformed input: drop the frame, keep the session.
                            tracing::warn!(
                                "[Hub] Dropping malformed frame from {}: {}",
                                conn.identity(),
                                e
                            );
                        }
                    },
                    Message::Close(_) => break DisconnectReason::PeerClosed,
                    // Any frame refreshes the read deadline; pongs and binary
                    // payloads carry nothing to route.
                    Message::Ping(_) | Message::Pong(_) | Message::Binary(_) => {}
                },
            }
        }
    };
    hub.disconnect(&conn, reason).await;
}

/// Drain the mailbox to the transport until it closes or a write fails.
pub(crate) async fn write_pump(
    hub: Arc<ChatHub>,
    conn: Arc<Connection>,
    mut sink: SplitSink<WebSocket, Message>,
    mut mailbox_rx: tokio::sync::mpsc::Receiver<Outbound>,
) {
    let write_timeout = hub.settings().write_timeout;
    let ping_interval = hub.settings().ping_interval();
    let mut ping = tokio::time::interval_at(
        tokio::time::Instant::now() + ping_interval,
        ping_interval,
    );

    let failure = loop {
        tokio::select! {
            item = mailbox_rx.recv() => match item {
                Some(Outbound::Frame(text)) => {
                    match timeout(write_timeout, sink.send(Message::Text(text.into()))).await {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => {
                            tracing::warn!("[Hub] Write error for {}: {}", conn.identity(), e);
                            break Some(DisconnectReason::WriteError);
                        }
                        Err(_) => {
                            tracing::warn!("[Hub] Write timeout for {}", conn.identity());
                            break Some(DisconnectReason::WriteError);
                        }
                    }
                }
                Some(Outbound::Close(reason)) => {
                    send_close(&mut sink, write_timeout, reason).await;
                    break None;
                }
                // Mailbox closed by teardown: say goodbye and stop.
                None => {
                    send_close(&mut sink, write_timeout, "").await;
                    break None;
                }
            },
            _ = ping.tick() => {
                match timeout(write_timeout, sink.send(Message::Ping(Bytes::new()))).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        tracing::warn!("[Hub] Ping error for {}: {}", conn.identity(), e);
                        break Some(DisconnectReason::WriteError);
                    }
                    Err(_) => {
                        tracing::warn!("[Hub] Ping timeout for {}", conn.identity());
                        break Some(DisconnectReason::WriteError);
                    }
                }
            }
        }
    };

    if let Some(reason) = failure {
        hub.disconnect(&conn, reason).await;
    }
}

async fn send_close(
    sink: &mut SplitSink<WebSocket, Message>,
    write_timeout: std::time::Duration,
    reason: &'static str,
) {
    let frame = Message::Close(Some(CloseFrame {
        code: close_code::NORMAL,
        reason: Utf8Bytes::from_static(reason),
    }));
    match timeout(write_timeout, sink.send(frame)).await {
        Ok(Ok(())) => {}
        // Best effort; the peer may already be gone.
        Ok(Err(e)) => tracing::debug!("[Hub] Failed to send close frame: {}", e),
        Err(_) => tracing::debug!("[Hub] Timed out sending close frame"),
    }
}
