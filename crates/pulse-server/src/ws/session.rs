//! Connection session lifecycle.
//!
//! One session drives one WebSocket from handshake to eviction through an
//! explicit state machine: `Pending` (transport open, not validated),
//! `Active` (admitted into a room), `Closed` (terminal). The credential
//! gate runs while still `Pending`, so a rejected connection never touches
//! the registry; an `Active` session is evicted exactly once on its way to
//! `Closed`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use axum::http::HeaderMap;
use futures::{SinkExt, StreamExt};
use metrics::{counter, gauge, histogram};
use pulse_core::protocol::error_frame;
use pulse_core::{ChannelName, ConnectionId};
use pulse_directory::CredentialGate;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::connection::Connection;
use super::handler::handle_frame;
use super::heartbeat::Liveness;
use super::rooms::RoomRegistry;
use crate::config::ServerConfig;
use crate::metrics::{
    WS_CONNECTION_DURATION_SECONDS, WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL,
    WS_DISCONNECTIONS_TOTAL, WS_REJECTIONS_TOTAL,
};

/// Outbound channel depth per connection. Cursor traffic is small and
/// frequent; a full buffer means the client is not draining.
const OUTBOUND_BUFFER: usize = 256;

/// Session lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Transport open, credentials not yet validated.
    Pending,
    /// Validated and admitted into a room.
    Active,
    /// Terminal. Evicted (if it was ever admitted) and released.
    Closed,
}

/// The session state machine, separated from transport concerns so the
/// transitions are testable on their own.
#[derive(Debug)]
pub struct Session {
    state: SessionState,
}

impl Session {
    /// New sessions start `Pending`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: SessionState::Pending,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// `Pending -> Active`, on gate acceptance.
    ///
    /// Returns `false` (and changes nothing) from any other state.
    pub fn activate(&mut self) -> bool {
        if self.state == SessionState::Pending {
            self.state = SessionState::Active;
            true
        } else {
            false
        }
    }

    /// Any state `-> Closed`.
    ///
    /// Returns `true` only for the call that performed the transition;
    /// `Closed` is terminal.
    pub fn close(&mut self) -> bool {
        if self.state == SessionState::Closed {
            false
        } else {
            self.state = SessionState::Closed;
            true
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Parameters extracted from the WebSocket handshake.
#[derive(Debug, Clone)]
pub struct Handshake {
    /// Project key from the `Sec-WebSocket-Protocol` header.
    pub key: Option<String>,
    /// Channel from the `channel` query parameter (default sentinel when
    /// absent).
    pub channel: ChannelName,
    /// Declared origin from the `Origin` header.
    pub origin: Option<String>,
}

impl Handshake {
    /// Extract handshake parameters from the upgrade request.
    ///
    /// Browsers may offer several comma-separated subprotocols; the first
    /// entry is taken as the key.
    #[must_use]
    pub fn from_parts(headers: &HeaderMap, query: &HashMap<String, String>) -> Self {
        let key = headers
            .get("sec-websocket-protocol")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_owned);
        let origin = headers
            .get("origin")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let channel = ChannelName::or_default(query.get("channel").map(String::as_str));
        Self {
            key,
            channel,
            origin,
        }
    }
}

/// Run one WebSocket session from upgrade to eviction.
///
/// 1. Validate the handshake key/origin through the gate (still `Pending`)
/// 2. On rejection: best-effort error frame, close, no registry mutation
/// 3. On acceptance: admit into the room registry (`Active`)
/// 4. Relay inbound frames until the transport closes, errors, or the
///    server shuts down
/// 5. Evict exactly once (`Closed`)
#[instrument(skip_all, fields(channel = %handshake.channel))]
pub async fn run_ws_session(
    ws: WebSocket,
    handshake: Handshake,
    rooms: Arc<RoomRegistry>,
    gate: Arc<CredentialGate>,
    config: ServerConfig,
    cancel: CancellationToken,
) {
    let mut session = Session::new();
    let (mut ws_tx, mut ws_rx) = ws.split();

    // Gate check runs to completion before any registry mutation; the
    // connection is not a broadcast source or target until admitted.
    let project = match gate
        .validate(handshake.key.as_deref(), handshake.origin.as_deref())
        .await
    {
        Ok(project) => project,
        Err(reason) => {
            counter!(WS_REJECTIONS_TOTAL, "reason" => reason.kind()).increment(1);
            match &reason {
                pulse_directory::RejectReason::Directory(source) => {
                    warn!(error = %source, "credential directory lookup failed");
                }
                other => info!(reason = other.kind(), "connection rejected"),
            }
            // Best-effort notification; a failed send must not fail the
            // shutdown path.
            if let Ok(json) = serde_json::to_string(&error_frame(reason.client_message())) {
                let _ = ws_tx.send(Message::Text(json.into())).await;
            }
            let _ = ws_tx.close().await;
            let _ = session.close();
            return;
        }
    };

    let channel = handshake.channel.clone();
    let (send_tx, mut send_rx) = mpsc::channel::<String>(OUTBOUND_BUFFER);
    let connection = Arc::new(Connection::new(
        ConnectionId::new(),
        project.clone(),
        channel.clone(),
        send_tx,
    ));
    let connection_id = connection.id().clone();

    rooms.admit(connection.clone()).await;
    let _ = session.activate();

    info!(%project, %channel, connection_id = %connection_id, "client connected");
    counter!(WS_CONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);

    // Outbound forwarder with heartbeat pings. Owns the write half; the
    // inbound loop below owns the read half.
    let heartbeat_interval = Duration::from_secs(config.heartbeat_interval_secs.max(1));
    let heartbeat_timeout = Duration::from_secs(config.heartbeat_timeout_secs.max(1));
    let outbound_conn = connection.clone();
    let outbound_cancel = cancel.clone();
    let outbound = tokio::spawn(async move {
        let mut liveness = Liveness::new(heartbeat_interval, heartbeat_timeout);
        let mut ping_interval = tokio::time::interval(heartbeat_interval);
        // Skip the immediate first tick.
        let _ = ping_interval.tick().await;

        loop {
            tokio::select! {
                frame = send_rx.recv() => {
                    match frame {
                        Some(text) => {
                            if ws_tx.send(Message::Text(text.into())).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                _ = ping_interval.tick() => {
                    if !liveness.tick(outbound_conn.check_alive()) {
                        warn!(
                            connection_id = %outbound_conn.id(),
                            idle = ?outbound_conn.last_pong_elapsed(),
                            "client unresponsive, disconnecting"
                        );
                        let _ = ws_tx.close().await;
                        break;
                    }
                    if ws_tx.send(Message::Ping(Vec::new().into())).await.is_err() {
                        break;
                    }
                }
                () = outbound_cancel.cancelled() => {
                    let _ = ws_tx.close().await;
                    break;
                }
            }
        }
    });

    // Inbound loop. Malformed frames are per-message failures; only
    // transport close/error or server shutdown ends the session.
    loop {
        tokio::select! {
            inbound = ws_rx.next() => {
                match inbound {
                    Some(Ok(msg)) => {
                        let text = match msg {
                            Message::Text(ref t) => Some(t.to_string()),
                            Message::Binary(ref data) => match std::str::from_utf8(data) {
                                Ok(s) => Some(s.to_owned()),
                                Err(_) => {
                                    debug!(connection_id = %connection_id, len = data.len(),
                                        "ignoring non-UTF8 binary frame");
                                    None
                                }
                            },
                            Message::Close(_) => {
                                debug!(connection_id = %connection_id, "client sent close frame");
                                break;
                            }
                            Message::Ping(_) | Message::Pong(_) => {
                                connection.mark_alive();
                                None
                            }
                        };
                        if let Some(text) = text {
                            connection.mark_alive();
                            let _ = handle_frame(&rooms, &connection, &text).await;
                        }
                    }
                    Some(Err(e)) => {
                        debug!(connection_id = %connection_id, error = %e, "transport error");
                        break;
                    }
                    None => break,
                }
            }
            () = cancel.cancelled() => {
                debug!(connection_id = %connection_id, "server shutting down, closing session");
                break;
            }
        }
    }

    // Active -> Closed: close the connection first so in-flight broadcasts
    // skip it, then evict. Both are idempotent; this path runs once.
    let _ = session.close();
    let _ = connection.close();
    let _ = rooms.evict(&project, &channel, &connection_id).await;
    outbound.abort();

    info!(%project, %channel, connection_id = %connection_id, "client disconnected");
    counter!(WS_DISCONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
    histogram!(WS_CONNECTION_DURATION_SECONDS).record(connection.age().as_secs_f64());
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
