//! # pulse-relay
//!
//! Relay server binary: loads settings, initializes logging and metrics,
//! wires the credential gate to the HTTP directory, and runs the
//! WebSocket server until SIGINT/SIGTERM.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use pulse_directory::{CredentialGate, HttpDirectory};
use pulse_server::config::ServerConfig;
use pulse_server::server::PulseServer;
use pulse_server::shutdown::wait_for_signal;
use pulse_settings::PulseSettings;
use tracing_subscriber::EnvFilter;

/// Pulse cursor relay server.
#[derive(Parser, Debug)]
#[command(name = "pulse-relay", about = "Real-time cursor relay server")]
struct Cli {
    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (overrides settings; 0 for auto-assign).
    #[arg(long)]
    port: Option<u16>,

    /// Base URL of the credential directory (overrides settings).
    #[arg(long)]
    directory_url: Option<String>,

    /// Path to the settings file (default `~/.pulse/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,
}

fn apply_cli_overrides(settings: &mut PulseSettings, args: &Cli) {
    if let Some(host) = &args.host {
        settings.server.host.clone_from(host);
    }
    if let Some(port) = args.port {
        settings.server.port = port;
    }
    if let Some(url) = &args.directory_url {
        settings.directory.base_url.clone_from(url);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    // Settings first: the log level is needed before logging init.
    let settings_path = args
        .settings
        .clone()
        .unwrap_or_else(pulse_settings::loader::settings_path);
    let mut settings =
        pulse_settings::loader::load_settings_from_path(&settings_path).unwrap_or_default();
    apply_cli_overrides(&mut settings, &args);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.logging.level.as_filter_str()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!(
        host = settings.server.host.as_str(),
        port = settings.server.port,
        directory = settings.directory.base_url.as_str(),
        "starting pulse relay"
    );

    let metrics = pulse_server::metrics::install_recorder();

    let directory = HttpDirectory::new(
        &settings.directory.base_url,
        Duration::from_millis(settings.directory.request_timeout_ms),
        settings.directory.api_token.clone(),
    )
    .context("failed to build credential directory client")?;
    let gate = CredentialGate::new(Arc::new(directory));

    let config = ServerConfig {
        host: settings.server.host.clone(),
        port: settings.server.port,
        max_connections: settings.server.max_connections,
        heartbeat_interval_secs: settings.server.heartbeat_interval_secs,
        heartbeat_timeout_secs: settings.server.heartbeat_timeout_secs,
        max_message_size: settings.server.max_message_size,
    };

    let server = PulseServer::new(config, gate, metrics);
    let (addr, serve_handle) = server
        .listen()
        .await
        .context("failed to start relay server")?;
    tracing::info!(%addr, "pulse relay ready");

    wait_for_signal().await;
    tracing::info!("shutting down");
    server.shutdown().drain(vec![serve_handle], None).await;
    tracing::info!("pulse relay stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_overrides_settings() {
        let mut settings = PulseSettings::default();
        let args = Cli {
            host: Some("10.0.0.1".into()),
            port: Some(9999),
            directory_url: Some("http://directory.internal:8089".into()),
            settings: None,
        };
        apply_cli_overrides(&mut settings, &args);
        assert_eq!(settings.server.host, "10.0.0.1");
        assert_eq!(settings.server.port, 9999);
        assert_eq!(settings.directory.base_url, "http://directory.internal:8089");
    }

    #[test]
    fn cli_absent_flags_keep_settings() {
        let mut settings = PulseSettings::default();
        settings.server.port = 4321;
        let args = Cli {
            host: None,
            port: None,
            directory_url: None,
            settings: None,
        };
        apply_cli_overrides(&mut settings, &args);
        assert_eq!(settings.server.port, 4321);
        assert_eq!(settings.server.host, "0.0.0.0");
    }

    #[test]
    fn cli_parses_flags() {
        let args = Cli::parse_from([
            "pulse-relay",
            "--host",
            "127.0.0.1",
            "--port",
            "8080",
            "--directory-url",
            "http://localhost:9000",
        ]);
        assert_eq!(args.host.as_deref(), Some("127.0.0.1"));
        assert_eq!(args.port, Some(8080));
        assert_eq!(args.directory_url.as_deref(), Some("http://localhost:9000"));
    }
}
