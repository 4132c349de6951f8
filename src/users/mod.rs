//! External user store interface.
//!
//! The persistent user/profile store is owned elsewhere; this core only
//! reads the identity fields it needs for tokens plus the two-factor
//! settings, and records last-activity timestamps.

mod memory;
mod postgres;

pub use memory::MemoryUserStore;
pub use postgres::PgUserStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::authz::Role;

/// Identity fields consumed by the security core.
#[derive(Clone, Debug)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub role: Role,
    /// PHC-format credential hash. Hashing itself is delegated to a
    /// [`crate::password::CredentialHasher`].
    pub password_hash: String,
    pub two_factor: TwoFactorSettings,
}

/// Two-factor settings owned by the external store; the core verifies
/// codes against the secret but never persists it itself.
#[derive(Clone, Debug, Default)]
pub struct TwoFactorSettings {
    pub enabled: bool,
    pub secret: Option<String>,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Look up by email or username.
    async fn find_by_identifier(&self, identifier: &str) -> anyhow::Result<Option<User>>;

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;

    /// Best effort; callers log and continue on failure.
    async fn update_last_active(&self, id: Uuid) -> anyhow::Result<()>;
}

/// Normalize an identifier for lookups.
pub(crate) fn normalize_identifier(identifier: &str) -> String {
    identifier.trim().to_lowercase()
}
