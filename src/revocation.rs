//! Token revocation blacklist.
//!
//! Entries carry a TTL equal to the token's remaining lifetime at the
//! moment of revocation, so the blacklist self-expires and never grows
//! unboundedly. Tokens are SHA-256 digested before use as keys; the raw
//! token value never touches the store.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;

use crate::error::StoreError;
use crate::store::SharedStore;

const KEY_PREFIX: &str = "revoked:";
const MARKER: &str = "1";

#[derive(Clone)]
pub struct RevocationStore {
    store: Arc<dyn SharedStore>,
    /// Upper bound applied when a token's remaining lifetime cannot be
    /// determined. TTL must never be infinite.
    max_ttl: Duration,
}

impl RevocationStore {
    #[must_use]
    pub fn new(store: Arc<dyn SharedStore>, max_ttl: Duration) -> Self {
        Self { store, max_ttl }
    }

    /// Blacklist a token for its remaining lifetime.
    pub async fn revoke(
        &self,
        token: &str,
        remaining_ttl: Option<Duration>,
    ) -> Result<(), StoreError> {
        self.store
            .put(&key(token), MARKER, self.clamp(remaining_ttl))
            .await
    }

    /// Blacklist a token only if it is not already blacklisted. Returns
    /// `true` for the first writer; concurrent refresh rotations of the
    /// same token race here and exactly one wins.
    pub async fn revoke_once(
        &self,
        token: &str,
        remaining_ttl: Option<Duration>,
    ) -> Result<bool, StoreError> {
        self.store
            .put_if_absent(&key(token), MARKER, self.clamp(remaining_ttl))
            .await
    }

    pub async fn is_revoked(&self, token: &str) -> Result<bool, StoreError> {
        Ok(self.store.get(&key(token)).await?.is_some())
    }

    fn clamp(&self, remaining_ttl: Option<Duration>) -> Duration {
        remaining_ttl.map_or(self.max_ttl, |ttl| ttl.min(self.max_ttl))
    }
}

fn key(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    format!("{KEY_PREFIX}{}", URL_SAFE_NO_PAD.encode(digest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn revocations() -> RevocationStore {
        RevocationStore::new(Arc::new(MemoryStore::new()), Duration::from_secs(3600))
    }

    #[tokio::test]
    async fn revoke_then_check() -> Result<(), StoreError> {
        let revocations = revocations();
        assert!(!revocations.is_revoked("token-a").await?);
        revocations
            .revoke("token-a", Some(Duration::from_secs(60)))
            .await?;
        assert!(revocations.is_revoked("token-a").await?);
        assert!(!revocations.is_revoked("token-b").await?);
        Ok(())
    }

    #[tokio::test]
    async fn revoke_once_has_exactly_one_winner() -> Result<(), StoreError> {
        let revocations = revocations();
        assert!(revocations
            .revoke_once("token", Some(Duration::from_secs(60)))
            .await?);
        assert!(!revocations
            .revoke_once("token", Some(Duration::from_secs(60)))
            .await?);
        Ok(())
    }

    #[tokio::test]
    async fn unknown_ttl_falls_back_to_max() -> Result<(), StoreError> {
        let store = Arc::new(MemoryStore::new());
        let revocations = RevocationStore::new(store.clone(), Duration::from_secs(10));
        revocations.revoke("token", None).await?;
        let ttl = store
            .remaining_ttl(&super::key("token"))
            .await?
            .expect("entry present");
        assert!(ttl <= Duration::from_secs(10));
        Ok(())
    }

    #[tokio::test]
    async fn entries_self_expire() -> Result<(), StoreError> {
        let revocations = revocations();
        revocations
            .revoke("token", Some(Duration::from_millis(0)))
            .await?;
        assert!(!revocations.is_revoked("token").await?);
        Ok(())
    }
}
