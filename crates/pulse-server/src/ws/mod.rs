//! WebSocket core: connection state, room registry, broadcast fan-out,
//! frame handling, heartbeat, and the per-connection session loop.

pub mod broadcast;
pub mod connection;
pub mod handler;
pub mod heartbeat;
pub mod rooms;
pub mod session;
