//! Origin normalization for the production-mode check.
//!
//! A registered origin and a requester's declared origin are considered the
//! same place when they agree on host and effective port. Scheme, path, and
//! trailing slashes are ignored, and default ports (80 for http/ws, 443 for
//! https/wss) are stripped, so `https://app.example.com` matches
//! `http://app.example.com:80/`.

use url::Url;

/// Reduce an origin string to its comparable form: lowercased host, plus
/// `:port` only when the port is explicit and not the scheme default.
///
/// Strings that do not parse as absolute URLs (e.g. a bare hostname) fall
/// back to a trimmed, lowercased comparison with any trailing slash removed.
#[must_use]
pub fn normalize_origin(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Ok(parsed) = Url::parse(trimmed) {
        if let Some(host) = parsed.host_str() {
            return match parsed.port() {
                Some(port) if !is_default_port(parsed.scheme(), port) => {
                    format!("{}:{port}", host.to_ascii_lowercase())
                }
                _ => host.to_ascii_lowercase(),
            };
        }
    }
    trimmed.trim_end_matches('/').to_ascii_lowercase()
}

/// Whether two origin strings normalize to the same place.
#[must_use]
pub fn origins_match(registered: &str, declared: &str) -> bool {
    normalize_origin(registered) == normalize_origin(declared)
}

fn is_default_port(scheme: &str, port: u16) -> bool {
    matches!(
        (scheme, port),
        ("http" | "ws", 80) | ("https" | "wss", 443)
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
