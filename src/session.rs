//! Server-side sessions binding token pairs to principals.
//!
//! A session is created exactly once per successful login, step-up, or
//! refresh, and is never mutated in place; claim changes always go
//! through create + delete. While a session exists it maps to exactly
//! one immutable (user_id, email, role) tuple, and its absence makes
//! every token referencing it invalid regardless of token expiry.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::authz::Role;
use crate::error::StoreError;
use crate::store::SharedStore;

const KEY_PREFIX: &str = "session:";
const SESSION_ID_BYTES: usize = 32;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub id: String,
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Session store over the shared TTL key-value store.
#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn SharedStore>,
}

impl SessionStore {
    #[must_use]
    pub fn new(store: Arc<dyn SharedStore>) -> Self {
        Self { store }
    }

    /// Create a session with a fresh unguessable identifier. TTL equals
    /// the refresh-token lifetime so the session outlives every token
    /// bound to it by at most clock skew.
    pub async fn create(
        &self,
        user_id: Uuid,
        email: &str,
        role: Role,
        ttl: Duration,
    ) -> Result<Session, StoreError> {
        let session = Session {
            id: generate_session_id(),
            user_id,
            email: email.to_string(),
            role,
            created_at: Utc::now(),
        };
        let payload = serde_json::to_string(&session)
            .map_err(|err| StoreError::Backend(format!("session encode: {err}")))?;
        self.store
            .put(&key(&session.id), &payload, ttl)
            .await?;
        Ok(session)
    }

    pub async fn get(&self, session_id: &str) -> Result<Option<Session>, StoreError> {
        let Some(payload) = self.store.get(&key(session_id)).await? else {
            return Ok(None);
        };
        let session = serde_json::from_str(&payload)
            .map_err(|err| StoreError::Backend(format!("session decode: {err}")))?;
        Ok(Some(session))
    }

    pub async fn delete(&self, session_id: &str) -> Result<(), StoreError> {
        self.store.delete(&key(session_id)).await
    }
}

fn key(session_id: &str) -> String {
    format!("{KEY_PREFIX}{session_id}")
}

/// 256 bits of OS randomness, URL-safe encoded. The raw id only ever
/// travels inside signed tokens.
fn generate_session_id() -> String {
    let mut bytes = [0u8; SESSION_ID_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
