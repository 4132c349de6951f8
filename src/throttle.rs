//! Failed-attempt throttling and account lockout.
//!
//! Counters live in the shared store under their own namespace and are
//! incremented atomically there, so concurrent failures from the same
//! principal across instances never lose counts. Lockout release is
//! lazy: the lock entry's TTL expiring is the reset, no sweeper runs.

use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::config::AuthConfig;
use crate::error::StoreError;
use crate::store::SharedStore;

const ATTEMPTS_PREFIX: &str = "throttle:attempts:";
const LOCK_PREFIX: &str = "throttle:lock:";

/// Suffix for step-up verification attempts so 2FA brute force is
/// throttled independently of first-factor failures.
pub const TWO_FACTOR_SUFFIX: &str = ":2fa";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThrottleDecision {
    Allowed,
    Locked { retry_after: u64 },
}

#[derive(Clone)]
pub struct AttemptThrottle {
    store: Arc<dyn SharedStore>,
    threshold: i64,
    window: Duration,
    lockout: Duration,
}

impl AttemptThrottle {
    #[must_use]
    pub fn new(store: Arc<dyn SharedStore>, config: &AuthConfig) -> Self {
        Self {
            store,
            threshold: config.lockout_threshold(),
            window: config.failure_window(),
            lockout: config.lockout_duration(),
        }
    }

    /// Read-only lockout check; repeated calls never change state.
    pub async fn check(&self, principal_key: &str) -> Result<ThrottleDecision, StoreError> {
        let lock_key = lock_key(principal_key);
        if self.store.get(&lock_key).await?.is_none() {
            return Ok(ThrottleDecision::Allowed);
        }
        // Remaining TTL doubles as the retry-after hint. A lock that
        // expired between the two reads is simply no longer a lock.
        match self.store.remaining_ttl(&lock_key).await? {
            Some(remaining) => Ok(ThrottleDecision::Locked {
                retry_after: remaining.as_secs().max(1),
            }),
            None => Ok(ThrottleDecision::Allowed),
        }
    }

    /// A single success fully clears a prior failure streak.
    pub async fn record_success(&self, principal_key: &str) -> Result<(), StoreError> {
        self.store.delete(&attempts_key(principal_key)).await
    }

    /// Count a failure; at the threshold, set the lock. The increment is
    /// atomic in the store, and the lock is put-if-absent so two racing
    /// failures cannot extend an existing lockout.
    pub async fn record_failure(&self, principal_key: &str) -> Result<(), StoreError> {
        let count = self
            .store
            .increment(&attempts_key(principal_key), self.window)
            .await?;
        if count >= self.threshold {
            let created = self
                .store
                .put_if_absent(&lock_key(principal_key), "1", self.lockout)
                .await?;
            if created {
                warn!(
                    principal = principal_key,
                    failures = count,
                    lockout_seconds = self.lockout.as_secs(),
                    "account locked after repeated failures"
                );
            }
        }
        Ok(())
    }
}

fn attempts_key(principal_key: &str) -> String {
    format!("{ATTEMPTS_PREFIX}{principal_key}")
}

fn lock_key(principal_key: &str) -> String {
    format!("{LOCK_PREFIX}{principal_key}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use secrecy::SecretString;

    fn throttle() -> AttemptThrottle {
        let config = AuthConfig::new(SecretString::from("secret"));
        AttemptThrottle::new(Arc::new(MemoryStore::new()), &config)
    }

    #[tokio::test]
    async fn allowed_until_threshold() -> Result<(), StoreError> {
        let throttle = throttle();
        for _ in 0..4 {
            throttle.record_failure("user@example.com").await?;
            assert_eq!(
                throttle.check("user@example.com").await?,
                ThrottleDecision::Allowed
            );
        }
        throttle.record_failure("user@example.com").await?;
        assert!(matches!(
            throttle.check("user@example.com").await?,
            ThrottleDecision::Locked { .. }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn lock_reports_retry_after() -> Result<(), StoreError> {
        let throttle = throttle();
        for _ in 0..5 {
            throttle.record_failure("user@example.com").await?;
        }
        match throttle.check("user@example.com").await? {
            ThrottleDecision::Locked { retry_after } => {
                assert!(retry_after > 0 && retry_after <= 15 * 60);
            }
            ThrottleDecision::Allowed => panic!("expected lockout"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn check_is_idempotent() -> Result<(), StoreError> {
        let throttle = throttle();
        for _ in 0..3 {
            throttle.record_failure("user@example.com").await?;
        }
        for _ in 0..10 {
            assert_eq!(
                throttle.check("user@example.com").await?,
                ThrottleDecision::Allowed
            );
        }
        // Two more failures reach the threshold; earlier checks must not
        // have contributed.
        throttle.record_failure("user@example.com").await?;
        throttle.record_failure("user@example.com").await?;
        assert!(matches!(
            throttle.check("user@example.com").await?,
            ThrottleDecision::Locked { .. }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn success_resets_the_streak() -> Result<(), StoreError> {
        let throttle = throttle();
        for _ in 0..4 {
            throttle.record_failure("user@example.com").await?;
        }
        throttle.record_success("user@example.com").await?;
        for _ in 0..4 {
            throttle.record_failure("user@example.com").await?;
        }
        assert_eq!(
            throttle.check("user@example.com").await?,
            ThrottleDecision::Allowed
        );
        Ok(())
    }

    #[tokio::test]
    async fn principals_are_isolated() -> Result<(), StoreError> {
        let throttle = throttle();
        for _ in 0..5 {
            throttle.record_failure("a@example.com").await?;
        }
        assert_eq!(
            throttle.check("b@example.com").await?,
            ThrottleDecision::Allowed
        );
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_failures_lock_exactly_once() -> Result<(), StoreError> {
        let store = Arc::new(MemoryStore::new());
        let config = AuthConfig::new(SecretString::from("secret"));
        let throttle = AttemptThrottle::new(store, &config);
        let mut handles = Vec::new();
        for _ in 0..10 {
            let throttle = throttle.clone();
            handles.push(tokio::spawn(async move {
                throttle.record_failure("user@example.com").await
            }));
        }
        for handle in handles {
            handle.await.expect("task panicked")?;
        }
        assert!(matches!(
            throttle.check("user@example.com").await?,
            ThrottleDecision::Locked { .. }
        ));
        Ok(())
    }
}
