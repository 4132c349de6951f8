//! In-memory user store for tests and demos.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{normalize_identifier, User, UserStore};

#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<HashMap<Uuid, User>>,
    last_active: Mutex<HashMap<Uuid, DateTime<Utc>>>,
}

impl MemoryUserStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, user: User) {
        let mut users = self.users.lock().await;
        users.insert(user.id, user);
    }

    pub async fn last_active(&self, id: Uuid) -> Option<DateTime<Utc>> {
        self.last_active.lock().await.get(&id).copied()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_identifier(&self, identifier: &str) -> anyhow::Result<Option<User>> {
        let identifier = normalize_identifier(identifier);
        let users = self.users.lock().await;
        Ok(users
            .values()
            .find(|user| {
                normalize_identifier(&user.email) == identifier
                    || normalize_identifier(&user.username) == identifier
            })
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let users = self.users.lock().await;
        Ok(users.get(&id).cloned())
    }

    async fn update_last_active(&self, id: Uuid) -> anyhow::Result<()> {
        let mut last_active = self.last_active.lock().await;
        last_active.insert(id, Utc::now());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::Role;
    use crate::users::TwoFactorSettings;

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "alice@example.com".to_string(),
            username: "alice".to_string(),
            role: Role::Client,
            password_hash: "$argon2id$stub".to_string(),
            two_factor: TwoFactorSettings::default(),
        }
    }

    #[tokio::test]
    async fn finds_by_email_or_username_case_insensitive() -> anyhow::Result<()> {
        let store = MemoryUserStore::new();
        let user = user();
        let id = user.id;
        store.insert(user).await;

        assert_eq!(
            store
                .find_by_identifier(" Alice@Example.COM ")
                .await?
                .map(|u| u.id),
            Some(id)
        );
        assert_eq!(
            store.find_by_identifier("ALICE").await?.map(|u| u.id),
            Some(id)
        );
        assert!(store.find_by_identifier("bob").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn update_last_active_records_timestamp() -> anyhow::Result<()> {
        let store = MemoryUserStore::new();
        let user = user();
        let id = user.id;
        store.insert(user).await;
        assert!(store.last_active(id).await.is_none());
        store.update_last_active(id).await?;
        assert!(store.last_active(id).await.is_some());
        Ok(())
    }
}
