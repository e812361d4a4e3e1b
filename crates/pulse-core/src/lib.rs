//! # pulse-core
//!
//! Foundation types shared across the pulse relay:
//!
//! - Branded ID newtypes (`ProjectKey`, `ChannelName`, `ConnectionId`)
//! - The WebSocket wire protocol: error frames, cursor envelopes, and
//!   inbound payload decoding

#![deny(unsafe_code)]

pub mod ids;
pub mod protocol;

pub use ids::{ChannelName, ConnectionId, ProjectKey};
