//! WebSocket wire protocol.
//!
//! Two outbound frame shapes exist:
//!
//! - `{"type":"error","message":<string>}` sent before a rejection close or
//!   in response to a malformed inbound frame
//! - `{"type":"cursor", ...payload}` relayed to other channel members
//!
//! Inbound frames are opaque JSON objects; nothing beyond structural
//! parseability is validated.

use serde_json::{Map, Value, json};
use thiserror::Error;

/// Discriminator value carried by relayed cursor frames.
pub const FRAME_KIND_CURSOR: &str = "cursor";

/// Discriminator value carried by error frames.
pub const FRAME_KIND_ERROR: &str = "error";

/// Why an inbound frame could not be relayed.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The frame was not valid JSON.
    #[error("invalid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    /// The frame parsed but was not a JSON object.
    #[error("payload is not a JSON object")]
    NotAnObject,
}

/// Build an error frame.
#[must_use]
pub fn error_frame(message: &str) -> Value {
    json!({ "type": FRAME_KIND_ERROR, "message": message })
}

/// Wrap a decoded payload in a cursor envelope.
///
/// The discriminator is authoritative: a payload-supplied `type` field is
/// overwritten, never relayed.
#[must_use]
pub fn cursor_frame(mut payload: Map<String, Value>) -> Value {
    let _ = payload.insert("type".to_owned(), Value::String(FRAME_KIND_CURSOR.to_owned()));
    Value::Object(payload)
}

/// Decode an inbound text frame into a relay payload.
///
/// Content fields are relayed verbatim and untyped; the only requirement is
/// that the frame parses as a JSON object.
pub fn decode_payload(text: &str) -> Result<Map<String, Value>, FrameError> {
    match serde_json::from_str::<Value>(text)? {
        Value::Object(map) => Ok(map),
        _ => Err(FrameError::NotAnObject),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
