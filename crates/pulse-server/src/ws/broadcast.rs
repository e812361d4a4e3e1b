//! Cursor fan-out to channel members.
//!
//! Delivery is best-effort and independent per recipient: one closed or
//! slow recipient never blocks the others and never surfaces an error to
//! the sender. The sender itself is always excluded.

use metrics::counter;
use pulse_core::protocol::cursor_frame;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::connection::Connection;
use super::rooms::RoomRegistry;
use crate::metrics::RELAY_DELIVERY_DROPS_TOTAL;

/// Relay a decoded cursor payload from `sender` to every other open member
/// of its (project, channel) partition.
///
/// The member set is snapshotted once at the start of the call; a
/// connection receives the frame if and only if it was a member at that
/// point. Returns the number of successful deliveries.
pub async fn relay_cursor(
    rooms: &RoomRegistry,
    sender: &Connection,
    payload: Map<String, Value>,
) -> usize {
    let envelope = cursor_frame(payload);
    let frame = match serde_json::to_string(&envelope) {
        Ok(json) => json,
        Err(e) => {
            warn!(error = %e, "failed to serialize cursor envelope");
            return 0;
        }
    };

    let members = rooms.members_of(sender.project(), sender.channel()).await;
    let mut delivered = 0;
    for member in &members {
        if member.id() == sender.id() || !member.is_open() {
            continue;
        }
        if member.send(frame.clone()) {
            delivered += 1;
        } else {
            counter!(RELAY_DELIVERY_DROPS_TOTAL).increment(1);
            debug!(
                connection_id = %member.id(),
                "dropped cursor delivery (recipient closed or backlogged)"
            );
        }
    }

    debug!(
        project = %sender.project(),
        channel = %sender.channel(),
        recipients = delivered,
        "cursor relayed"
    );
    delivered
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
