//! # pulse-server
//!
//! The relay core and its axum shell:
//!
//! - Room registry: project -> channel -> live connections, with lazy
//!   creation and cascading cleanup of empty partitions
//! - Broadcast engine: cursor fan-out to every other open channel member
//! - Connection session: the Pending -> Active -> Closed state machine
//!   driving one WebSocket from handshake to eviction
//! - Shell: HTTP routes (`/ws`, `/health`, `/metrics`), handshake
//!   extraction, heartbeat, graceful shutdown

#![deny(unsafe_code)]

pub mod config;
pub mod health;
pub mod metrics;
pub mod server;
pub mod shutdown;
pub mod ws;
