//! `PulseServer`: the axum HTTP + WebSocket shell.
//!
//! Routes:
//! - `GET /ws` upgrades and hands the socket to the connection session
//! - `GET /health` live registry counters
//! - `GET /metrics` Prometheus text
//!
//! Handshake extraction (key from the `Sec-WebSocket-Protocol` header,
//! channel from the `channel` query parameter, origin from the `Origin`
//! header) happens here; everything after the upgrade belongs to the
//! session.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use metrics_exporter_prometheus::PrometheusHandle;
use pulse_directory::CredentialGate;
use thiserror::Error;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::health::{self, HealthResponse};
use crate::shutdown::ShutdownCoordinator;
use crate::ws::rooms::RoomRegistry;
use crate::ws::session::{Handshake, run_ws_session};

/// Errors from running the server shell.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind the listen address.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// The address that could not be bound.
        addr: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Shared state accessible from axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// The room registry.
    pub rooms: Arc<RoomRegistry>,
    /// The admission gate.
    pub gate: Arc<CredentialGate>,
    /// Shutdown coordinator.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// Server configuration.
    pub config: ServerConfig,
    /// When the server started.
    pub start_time: Instant,
    /// Prometheus render handle.
    pub metrics: PrometheusHandle,
}

/// The relay server.
pub struct PulseServer {
    config: ServerConfig,
    rooms: Arc<RoomRegistry>,
    gate: Arc<CredentialGate>,
    shutdown: Arc<ShutdownCoordinator>,
    start_time: Instant,
    metrics: PrometheusHandle,
}

impl PulseServer {
    /// Create a server with an empty registry.
    #[must_use]
    pub fn new(config: ServerConfig, gate: CredentialGate, metrics: PrometheusHandle) -> Self {
        Self {
            config,
            rooms: Arc::new(RoomRegistry::new()),
            gate: Arc::new(gate),
            shutdown: Arc::new(ShutdownCoordinator::new()),
            start_time: Instant::now(),
            metrics,
        }
    }

    /// Build the axum router with all routes.
    #[must_use]
    pub fn router(&self) -> Router {
        let state = AppState {
            rooms: self.rooms.clone(),
            gate: self.gate.clone(),
            shutdown: self.shutdown.clone(),
            config: self.config.clone(),
            start_time: self.start_time,
            metrics: self.metrics.clone(),
        };

        Router::new()
            .route("/ws", get(ws_handler))
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
    }

    /// Bind the configured address and start serving.
    ///
    /// Returns the bound address (useful with port 0) and the serve task,
    /// which exits after the shutdown coordinator is signalled.
    pub async fn listen(&self) -> Result<(SocketAddr, JoinHandle<()>), ServerError> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local_addr = listener.local_addr().map_err(|source| ServerError::Bind {
            addr,
            source,
        })?;

        let router = self.router();
        let token = self.shutdown.token();
        let handle = tokio::spawn(async move {
            let shutdown = async move { token.cancelled().await };
            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(shutdown)
                .await
            {
                warn!(error = %e, "server exited with error");
            }
        });

        info!(%local_addr, "relay listening");
        Ok((local_addr, handle))
    }

    /// The room registry.
    #[must_use]
    pub fn rooms(&self) -> &Arc<RoomRegistry> {
        &self.rooms
    }

    /// The shutdown coordinator.
    #[must_use]
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// The server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// GET /ws
async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Response {
    if state.rooms.connection_count().await >= state.config.max_connections {
        warn!(
            max = state.config.max_connections,
            "connection limit reached, refusing upgrade"
        );
        return (StatusCode::SERVICE_UNAVAILABLE, "connection limit reached").into_response();
    }

    let handshake = Handshake::from_parts(&headers, &query);
    let mut upgrade = ws.max_message_size(state.config.max_message_size);
    if let Some(key) = handshake.key.clone() {
        // Echo the offered subprotocol so browser clients complete the
        // handshake.
        upgrade = upgrade.protocols([key]);
    }

    let rooms = state.rooms.clone();
    let gate = state.gate.clone();
    let config = state.config.clone();
    let cancel = state.shutdown.token();
    upgrade.on_upgrade(move |socket| run_ws_session(socket, handshake, rooms, gate, config, cancel))
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let connections = state.rooms.connection_count().await;
    let projects = state.rooms.project_count().await;
    let channels = state.rooms.channel_count().await;
    Json(health::health_check(
        state.start_time,
        connections,
        projects,
        channels,
    ))
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> String {
    crate::metrics::render(&state.metrics)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use pulse_directory::StaticDirectory;
    use tower::ServiceExt;

    fn make_server() -> PulseServer {
        let gate = CredentialGate::new(Arc::new(StaticDirectory::new()));
        let metrics = PrometheusBuilder::new().build_recorder().handle();
        PulseServer::new(ServerConfig::default(), gate, metrics)
    }

    #[tokio::test]
    async fn default_config_accessible() {
        let server = make_server();
        assert_eq!(server.config().host, "127.0.0.1");
        assert_eq!(server.config().port, 0);
    }

    #[tokio::test]
    async fn registry_starts_empty() {
        let server = make_server();
        assert_eq!(server.rooms().connection_count().await, 0);
    }

    #[test]
    fn shutdown_coordinator_accessible() {
        let server = make_server();
        assert!(!server.shutdown().is_signalled());
        server.shutdown().signal();
        assert!(server.shutdown().is_signalled());
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let server = make_server();
        let app = server.router();

        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = axum::body::to_bytes(resp.into_body(), 10_000).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["status"], "ok");
        assert_eq!(parsed["connections"], 0);
        assert_eq!(parsed["projects"], 0);
        assert_eq!(parsed["channels"], 0);
        assert!(parsed["uptime_secs"].is_number());
    }

    #[tokio::test]
    async fn metrics_endpoint_renders() {
        let server = make_server();
        let app = server.router();

        let req = Request::builder()
            .uri("/metrics")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let server = make_server();
        let app = server.router();

        let req = Request::builder()
            .uri("/nope")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn ws_route_rejects_plain_http() {
        let server = make_server();
        let app = server.router();

        // No upgrade headers: the extractor refuses the request.
        let req = Request::builder().uri("/ws").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_ne!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn listen_binds_auto_port() {
        let server = make_server();
        let (addr, handle) = server.listen().await.unwrap();
        assert_ne!(addr.port(), 0);

        server.shutdown().signal();
        handle.await.unwrap();
    }
}
