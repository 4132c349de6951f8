//! Postgres-backed user store.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::{normalize_identifier, TwoFactorSettings, User, UserStore};
use crate::authz::Role;

pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn user_from_row(row: &sqlx::postgres::PgRow) -> Result<User> {
        let role: String = row.get("role");
        let role = Role::from_str(&role)
            .with_context(|| format!("unknown role in user record: {role}"))?;
        Ok(User {
            id: row.get("id"),
            email: row.get("email"),
            username: row.get("username"),
            role,
            password_hash: row.get("password_hash"),
            two_factor: TwoFactorSettings {
                enabled: row.get("two_factor_enabled"),
                secret: row.get("two_factor_secret"),
            },
        })
    }
}

const USER_COLUMNS: &str =
    "id, email, username, role::text AS role, password_hash, two_factor_enabled, two_factor_secret";

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>> {
        let identifier = normalize_identifier(identifier);
        let query = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1 OR username = $1 LIMIT 1"
        );
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query.as_str()
        );
        let row = sqlx::query(&query)
            .bind(&identifier)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup user by identifier")?;
        row.as_ref().map(Self::user_from_row).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1 LIMIT 1");
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query.as_str()
        );
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup user by id")?;
        row.as_ref().map(Self::user_from_row).transpose()
    }

    async fn update_last_active(&self, id: Uuid) -> Result<()> {
        let query = "UPDATE users SET last_active_at = NOW() WHERE id = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(id)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to update last_active_at")?;
        Ok(())
    }
}
