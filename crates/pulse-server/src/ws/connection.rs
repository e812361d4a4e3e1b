//! Per-connection state.
//!
//! A `Connection` owns the outbound half of one WebSocket (via the send
//! channel feeding its write task) and records which (project, channel)
//! partition it belongs to. The open flag is the authoritative "may still
//! receive broadcasts" signal; it flips exactly once.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use pulse_core::{ChannelName, ConnectionId, ProjectKey};
use tokio::sync::mpsc;

/// One live client connection.
pub struct Connection {
    id: ConnectionId,
    project: ProjectKey,
    channel: ChannelName,
    /// Send channel to the connection's WebSocket write task.
    tx: mpsc::Sender<String>,
    /// Cleared exactly once when the session ends.
    open: AtomicBool,
    /// Whether the client has responded since the last heartbeat check.
    alive: AtomicBool,
    /// When the last pong (or any liveness signal) was received.
    last_pong: Mutex<Instant>,
    /// When this connection was admitted.
    connected_at: Instant,
    /// Sends dropped because the channel was full or closed.
    dropped_sends: AtomicU64,
}

impl Connection {
    /// Create a connection bound to its partition.
    #[must_use]
    pub fn new(
        id: ConnectionId,
        project: ProjectKey,
        channel: ChannelName,
        tx: mpsc::Sender<String>,
    ) -> Self {
        let now = Instant::now();
        Self {
            id,
            project,
            channel,
            tx,
            open: AtomicBool::new(true),
            alive: AtomicBool::new(true),
            last_pong: Mutex::new(now),
            connected_at: now,
            dropped_sends: AtomicU64::new(0),
        }
    }

    /// This connection's identity.
    #[must_use]
    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    /// Owning project.
    #[must_use]
    pub fn project(&self) -> &ProjectKey {
        &self.project
    }

    /// Owning channel.
    #[must_use]
    pub fn channel(&self) -> &ChannelName {
        &self.channel
    }

    /// Whether the connection may still receive deliveries.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Mark the connection closed.
    ///
    /// Returns `true` only for the call that actually performed the
    /// transition, so disconnect accounting runs exactly once.
    pub fn close(&self) -> bool {
        self.open.swap(false, Ordering::AcqRel)
    }

    /// Enqueue a pre-serialized frame for delivery.
    ///
    /// Non-blocking: returns `false` (and counts the drop) when the
    /// connection is closed or its outbound buffer is full.
    pub fn send(&self, frame: String) -> bool {
        if !self.is_open() {
            let _ = self.dropped_sends.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        if self.tx.try_send(frame).is_ok() {
            true
        } else {
            let _ = self.dropped_sends.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    /// Serialize a JSON value and enqueue it.
    pub fn send_json(&self, value: &serde_json::Value) -> bool {
        match serde_json::to_string(value) {
            Ok(json) => self.send(json),
            Err(_) => false,
        }
    }

    /// Total deliveries dropped for this connection.
    #[must_use]
    pub fn drop_count(&self) -> u64 {
        self.dropped_sends.load(Ordering::Relaxed)
    }

    /// Record a liveness signal (pong or any inbound activity).
    pub fn mark_alive(&self) {
        self.alive.store(true, Ordering::Relaxed);
        *self.last_pong.lock() = Instant::now();
    }

    /// Check and reset the liveness flag.
    ///
    /// Returns `true` if the client showed life since the last check.
    pub fn check_alive(&self) -> bool {
        self.alive.swap(false, Ordering::Relaxed)
    }

    /// Time since the last liveness signal.
    #[must_use]
    pub fn last_pong_elapsed(&self) -> Duration {
        self.last_pong.lock().elapsed()
    }

    /// How long this connection has been up.
    #[must_use]
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
