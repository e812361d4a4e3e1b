//! Directory and admission error types.

use thiserror::Error;

/// Errors from the external credential directory.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// HTTP request to the directory failed (connect, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The directory answered with an unexpected status code.
    #[error("directory returned status {status}")]
    Status {
        /// HTTP status code of the response.
        status: u16,
    },

    /// The directory response body could not be decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The directory is unreachable or deliberately failing (tests).
    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

/// Why a connection was refused admission.
///
/// All four variants are terminal for the connection: the client gets a
/// best-effort error frame and the transport is closed. None of them ever
/// mutates the registry, because admission has not happened yet.
#[derive(Debug, Error)]
pub enum RejectReason {
    /// The handshake carried no project key.
    #[error("missing key")]
    MissingKey,

    /// The key is unknown to the directory, or known but inactive.
    #[error("invalid key")]
    InvalidKey,

    /// A production-mode key was used from an unregistered origin.
    #[error("origin mismatch")]
    OriginMismatch,

    /// The directory lookup itself failed. The source error is kept for
    /// internal logging; the client only ever sees a generic message.
    #[error("directory lookup failed: {0}")]
    Directory(#[from] DirectoryError),
}

impl RejectReason {
    /// Message sent to the client before closing.
    #[must_use]
    pub fn client_message(&self) -> &'static str {
        match self {
            Self::MissingKey => "API Key is required",
            Self::InvalidKey => "Invalid API Key",
            Self::OriginMismatch => {
                "Origin not allowed for this API key. Use a development-mode key for non-production origins."
            }
            Self::Directory(_) => "Server error during API Key validation",
        }
    }

    /// Stable label for metrics and structured logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingKey => "missing_key",
            Self::InvalidKey => "invalid_key",
            Self::OriginMismatch => "origin_mismatch",
            Self::Directory(_) => "directory_error",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
