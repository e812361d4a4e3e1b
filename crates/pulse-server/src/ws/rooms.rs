//! The room registry: project -> channel -> live connections.
//!
//! Structure is mutated only by [`RoomRegistry::admit`] and
//! [`RoomRegistry::evict`]; broadcast reads snapshots via
//! [`RoomRegistry::members_of`]. Both partition levels are created lazily
//! and removed the moment they empty, inside the same write-lock critical
//! section, so "empty implies absent" is never observable broken.

use std::collections::HashMap;
use std::sync::Arc;

use metrics::gauge;
use pulse_core::{ChannelName, ConnectionId, ProjectKey};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::connection::Connection;
use crate::metrics::ROOMS_CHANNELS_ACTIVE;

type Members = HashMap<ConnectionId, Arc<Connection>>;
type Channels = HashMap<ChannelName, Members>;

/// Two-level partition of live connections.
pub struct RoomRegistry {
    rooms: RwLock<HashMap<ProjectKey, Channels>>,
}

impl RoomRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
        }
    }

    /// Insert a connection into its (project, channel) partition, creating
    /// either level if absent.
    ///
    /// Admitting the same connection ID twice is a caller bug; the entry is
    /// replaced and a warning logged.
    pub async fn admit(&self, connection: Arc<Connection>) {
        let project = connection.project().clone();
        let channel = connection.channel().clone();
        let id = connection.id().clone();

        let mut rooms = self.rooms.write().await;
        let members = rooms.entry(project.clone()).or_default().entry(channel.clone()).or_default();
        if members.insert(id.clone(), connection).is_some() {
            warn!(%project, %channel, connection_id = %id, "duplicate admit replaced existing member");
        }
        gauge!(ROOMS_CHANNELS_ACTIVE).set(channel_total(&rooms) as f64);
        debug!(%project, %channel, connection_id = %id, "connection admitted");
    }

    /// Remove a connection from its partition, deleting the channel when it
    /// empties and the project when its last channel goes.
    ///
    /// Safe to call when the connection is already absent (no-op). Returns
    /// whether a member was actually removed.
    pub async fn evict(
        &self,
        project: &ProjectKey,
        channel: &ChannelName,
        id: &ConnectionId,
    ) -> bool {
        let mut rooms = self.rooms.write().await;
        let Some(channels) = rooms.get_mut(project) else {
            return false;
        };
        let Some(members) = channels.get_mut(channel) else {
            return false;
        };

        let removed = members.remove(id).is_some();
        if members.is_empty() {
            let _ = channels.remove(channel);
        }
        if channels.is_empty() {
            let _ = rooms.remove(project);
        }
        if removed {
            gauge!(ROOMS_CHANNELS_ACTIVE).set(channel_total(&rooms) as f64);
            debug!(%project, %channel, connection_id = %id, "connection evicted");
        }
        removed
    }

    /// Snapshot the current members of a partition (empty for partitions
    /// that do not exist).
    ///
    /// Broadcast delivery is defined against this snapshot: a connection
    /// receives the message if and only if it was a member at the moment
    /// the snapshot was taken.
    pub async fn members_of(
        &self,
        project: &ProjectKey,
        channel: &ChannelName,
    ) -> Vec<Arc<Connection>> {
        let rooms = self.rooms.read().await;
        rooms
            .get(project)
            .and_then(|channels| channels.get(channel))
            .map(|members| members.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Whether a project partition currently exists.
    pub async fn contains_project(&self, project: &ProjectKey) -> bool {
        self.rooms.read().await.contains_key(project)
    }

    /// Channel names currently live under a project.
    pub async fn channels_of(&self, project: &ProjectKey) -> Vec<ChannelName> {
        let rooms = self.rooms.read().await;
        rooms
            .get(project)
            .map(|channels| channels.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Total live connections.
    pub async fn connection_count(&self) -> usize {
        let rooms = self.rooms.read().await;
        rooms
            .values()
            .flat_map(Channels::values)
            .map(Members::len)
            .sum()
    }

    /// Projects with at least one live channel.
    pub async fn project_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Live channels across all projects.
    pub async fn channel_count(&self) -> usize {
        channel_total(&*self.rooms.read().await)
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn channel_total(rooms: &HashMap<ProjectKey, Channels>) -> usize {
    rooms.values().map(Channels::len).sum()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
