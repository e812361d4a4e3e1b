//! The admission gate.
//!
//! Validation runs once per connection, before the connection is admitted
//! to any room, so a rejected connection never appears in the registry.

use std::sync::Arc;

use pulse_core::ProjectKey;
use tracing::debug;

use crate::client::CredentialDirectory;
use crate::errors::RejectReason;
use crate::origin::origins_match;

/// Validates a handshake's project key and declared origin against the
/// credential directory.
pub struct CredentialGate {
    directory: Arc<dyn CredentialDirectory>,
}

impl CredentialGate {
    /// Create a gate backed by `directory`.
    #[must_use]
    pub fn new(directory: Arc<dyn CredentialDirectory>) -> Self {
        Self { directory }
    }

    /// Run the full admission check.
    ///
    /// - missing or empty key: [`RejectReason::MissingKey`]
    /// - unknown or inactive key: [`RejectReason::InvalidKey`]
    /// - lookup I/O failure: [`RejectReason::Directory`]
    /// - production-mode key with a registered origin that does not match
    ///   the declared one: [`RejectReason::OriginMismatch`]. A missing
    ///   declared origin on such a key is a mismatch.
    pub async fn validate(
        &self,
        key: Option<&str>,
        declared_origin: Option<&str>,
    ) -> Result<ProjectKey, RejectReason> {
        let key = key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(RejectReason::MissingKey)?;

        let record = self
            .directory
            .lookup(key)
            .await?
            .filter(|r| r.active)
            .ok_or(RejectReason::InvalidKey)?;

        if record.production {
            if let Some(registered) = record.origin.as_deref() {
                let matches = declared_origin
                    .is_some_and(|declared| origins_match(registered, declared));
                if !matches {
                    debug!(key, ?declared_origin, "production key origin mismatch");
                    return Err(RejectReason::OriginMismatch);
                }
            }
        }

        Ok(ProjectKey::from(key))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
