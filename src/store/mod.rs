//! Shared key-value store capability.
//!
//! The only shared mutable resource in the core. Sessions, revocation
//! entries, and attempt counters all live here under distinct key
//! namespaces, and every cross-request race is resolved by the store's
//! atomic primitives rather than in-process locks, because the service
//! runs as multiple concurrent instances.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use std::time::Duration;

use crate::error::StoreError;

/// TTL key-value store with the atomic primitives the core relies on.
///
/// Entries self-expire; no sweep process is required for correctness.
#[async_trait]
pub trait SharedStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a value with a TTL, overwriting any existing entry.
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Write only if the key is absent. Returns `true` when this call
    /// created the entry (first-writer-wins).
    async fn put_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError>;

    /// Delete is idempotent; deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Atomically increment a counter, creating it with `ttl` when
    /// absent. The TTL is not extended on subsequent increments, which
    /// gives counters a fixed window from the first event.
    async fn increment(&self, key: &str, ttl: Duration) -> Result<i64, StoreError>;

    /// Remaining lifetime of a key, `None` when absent or expired.
    async fn remaining_ttl(&self, key: &str) -> Result<Option<Duration>, StoreError>;
}
