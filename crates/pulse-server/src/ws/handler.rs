//! Inbound frame dispatch.
//!
//! Each inbound text frame produces an explicit [`FrameOutcome`] the
//! session loop inspects: malformed frames notify the sender and leave the
//! session active, valid frames are relayed. Parsing never closes a
//! healthy connection.

use metrics::counter;
use pulse_core::protocol::{decode_payload, error_frame};
use tracing::debug;

use super::broadcast::relay_cursor;
use super::connection::Connection;
use super::rooms::RoomRegistry;
use crate::metrics::{RELAY_MALFORMED_TOTAL, RELAY_MESSAGES_TOTAL};

/// What happened to one inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The payload was relayed to this many recipients.
    Relayed {
        /// Successful deliveries (other open members of the partition).
        recipients: usize,
    },
    /// The frame was malformed; the sender was notified and nothing was
    /// broadcast.
    Rejected,
}

/// Handle one inbound text frame from an active session.
pub async fn handle_frame(
    rooms: &RoomRegistry,
    sender: &Connection,
    text: &str,
) -> FrameOutcome {
    match decode_payload(text) {
        Ok(payload) => {
            counter!(RELAY_MESSAGES_TOTAL).increment(1);
            let recipients = relay_cursor(rooms, sender, payload).await;
            FrameOutcome::Relayed { recipients }
        }
        Err(e) => {
            counter!(RELAY_MALFORMED_TOTAL).increment(1);
            debug!(connection_id = %sender.id(), error = %e, "malformed inbound frame");
            let _ = sender.send_json(&error_frame("Invalid message format"));
            FrameOutcome::Rejected
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
