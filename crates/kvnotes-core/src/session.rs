//! Session lifecycle and validation.
//!
//! All sessions are serialized as one JSON object under
//! [`keys::SESSION_KEY`], mapping session id to its creation time. A session
//! is valid for 24 hours from creation, with no sliding renewal. Expired
//! entries are swept lazily, only when a new session is created; there is no
//! logout and validation never mutates the map.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;
use crate::keys;
use crate::kv::KvStore;

/// Length of a session id, in characters.
pub const SESSION_ID_LEN: usize = 32;

/// Absolute session lifetime.
pub const SESSION_TTL_HOURS: i64 = 24;

const SESSION_ID_CHARS: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// A single session record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub created_at: DateTime<Utc>,
}

impl Session {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.created_at) >= TimeDelta::hours(SESSION_TTL_HOURS)
    }
}

/// Creates, validates, and lazily expires session tokens.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn KvStore>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Generate a 32-character alphanumeric session id.
    ///
    /// Per-character uniform draw; the token is an unsigned bearer token and
    /// its unguessability is the only protection. Ids are not checked for
    /// collision against existing sessions.
    pub fn generate_session_id() -> String {
        let mut rng = rand::rng();
        (0..SESSION_ID_LEN)
            .map(|_| char::from(SESSION_ID_CHARS[rng.random_range(0..SESSION_ID_CHARS.len())]))
            .collect()
    }

    /// Create a new session and persist the full session map.
    ///
    /// Sweeps every expired entry before inserting the new one. A store or
    /// parse failure propagates; the caller must report it as a server
    /// error, distinct from a failed password check.
    pub async fn create_session(&self) -> Result<String> {
        let now = Utc::now();
        let mut sessions = self.load_sessions().await?;
        sessions.retain(|_, session| !session.is_expired(now));

        let session_id = Self::generate_session_id();
        sessions.insert(session_id.clone(), Session { created_at: now });

        let serialized = serde_json::to_string(&sessions)?;
        self.store.put(keys::SESSION_KEY, &serialized).await?;

        Ok(session_id)
    }

    /// Check whether a session id is present and younger than 24 hours.
    ///
    /// Fails closed: any store or parse error is logged and treated as an
    /// invalid session. Expired entries are left in place; cleanup happens
    /// only in [`Self::create_session`].
    pub async fn is_valid_session(&self, session_id: &str) -> bool {
        let sessions = match self.load_sessions().await {
            Ok(sessions) => sessions,
            Err(error) => {
                warn!(%error, "session validation failed");
                return false;
            }
        };

        sessions
            .get(session_id)
            .is_some_and(|session| !session.is_expired(Utc::now()))
    }

    async fn load_sessions(&self) -> Result<HashMap<String, Session>> {
        match self.store.get(keys::SESSION_KEY).await? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(HashMap::new()),
        }
    }
}
