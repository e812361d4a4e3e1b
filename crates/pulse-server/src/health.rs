//! `/health` endpoint.

use serde::Serialize;
use std::time::Instant;

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the server is running.
    pub status: String,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Current WebSocket connection count.
    pub connections: usize,
    /// Projects with at least one live channel.
    pub projects: usize,
    /// Live channels across all projects.
    pub channels: usize,
}

/// Build a health response from live registry counters.
#[must_use]
pub fn health_check(
    start_time: Instant,
    connections: usize,
    projects: usize,
    channels: usize,
) -> HealthResponse {
    HealthResponse {
        status: "ok".into(),
        uptime_secs: start_time.elapsed().as_secs(),
        connections,
        projects,
        channels,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_is_ok() {
        let resp = health_check(Instant::now(), 0, 0, 0);
        assert_eq!(resp.status, "ok");
    }

    #[test]
    fn uptime_increases() {
        let start = Instant::now()
            .checked_sub(std::time::Duration::from_secs(120))
            .unwrap();
        let resp = health_check(start, 0, 0, 0);
        assert!(resp.uptime_secs >= 119);
    }

    #[test]
    fn counters_are_carried() {
        let resp = health_check(Instant::now(), 7, 2, 3);
        assert_eq!(resp.connections, 7);
        assert_eq!(resp.projects, 2);
        assert_eq!(resp.channels, 3);
    }

    #[test]
    fn serialization_shape() {
        let resp = health_check(Instant::now(), 1, 1, 1);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["status"], "ok");
        assert!(json["uptime_secs"].is_number());
        assert_eq!(json["connections"], 1);
        assert_eq!(json["projects"], 1);
        assert_eq!(json["channels"], 1);
    }
}
