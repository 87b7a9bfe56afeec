//! Shared-password verification and rotation.
//!
//! One password string under [`keys::PASSWORD_KEY`]; while unset, the
//! effective password is [`keys::DEFAULT_PASSWORD`]. Comparison is plain
//! string equality, not constant-time, and the stored value is not hashed:
//! both are part of the service's observable contract and are kept as-is
//! rather than silently upgraded.

use std::sync::Arc;

use crate::error::Result;
use crate::keys;
use crate::kv::KvStore;

/// Verifies and rotates the single shared password.
#[derive(Clone)]
pub struct CredentialManager {
    store: Arc<dyn KvStore>,
}

impl CredentialManager {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Compare a candidate against the stored (or default) password.
    pub async fn verify_password(&self, candidate: &str) -> Result<bool> {
        let stored = self.store.get(keys::PASSWORD_KEY).await?;
        let effective = stored.as_deref().unwrap_or(keys::DEFAULT_PASSWORD);
        Ok(candidate == effective)
    }

    /// Overwrite the stored password unconditionally.
    ///
    /// Verifying the current password first is the caller's responsibility.
    /// No history is retained.
    pub async fn update_password(&self, new_password: &str) -> Result<()> {
        self.store.put(keys::PASSWORD_KEY, new_password).await?;
        Ok(())
    }
}
