//! Settings schema.
//!
//! Field names in `settings.json` are camelCase; every section and field
//! has a compiled default so a missing or partial file always yields a
//! usable configuration.

use serde::{Deserialize, Serialize};

/// Top-level settings for the relay process.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PulseSettings {
    /// WebSocket server settings.
    pub server: ServerSettings,
    /// Credential directory connection settings.
    pub directory: DirectorySettings,
    /// Logging settings.
    pub logging: LoggingSettings,
}

/// WebSocket server settings.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Host to bind.
    pub host: String,
    /// Port to bind (0 auto-assigns, used by tests).
    pub port: u16,
    /// Maximum concurrent WebSocket connections.
    pub max_connections: usize,
    /// Seconds between server-initiated pings.
    pub heartbeat_interval_secs: u64,
    /// Seconds without a pong before a client is considered dead.
    pub heartbeat_timeout_secs: u64,
    /// Maximum inbound WebSocket message size in bytes.
    pub max_message_size: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            max_connections: 1024,
            heartbeat_interval_secs: 30,
            heartbeat_timeout_secs: 90,
            max_message_size: 64 * 1024,
        }
    }
}

/// Credential directory connection settings.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct DirectorySettings {
    /// Base URL of the credential directory service.
    pub base_url: String,
    /// Per-lookup request timeout in milliseconds.
    pub request_timeout_ms: u64,
    /// Optional bearer token for the directory API.
    pub api_token: Option<String>,
}

impl Default for DirectorySettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8089".into(),
            request_timeout_ms: 2000,
            api_token: None,
        }
    }
}

/// Logging settings.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Minimum level emitted to stderr (overridable via `RUST_LOG`).
    pub level: LogLevel,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
        }
    }
}

/// Log verbosity levels.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Errors only.
    Error,
    /// Warnings and errors.
    Warn,
    /// Informational messages (default).
    #[default]
    Info,
    /// Debug detail.
    Debug,
    /// Everything.
    Trace,
}

impl LogLevel {
    /// The level as a `tracing_subscriber` filter directive.
    #[must_use]
    pub fn as_filter_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
