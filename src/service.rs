//! Login, step-up, refresh, and logout orchestration.
//!
//! Login flow: attempt-throttle gate, credential verification, then
//! either a full token pair or a pre-auth token when the principal has
//! two-factor enabled. Unknown principals and wrong passwords are
//! reported identically, and the verifier burns a hash comparison
//! against a fixed dummy hash for unknown principals so timing does not
//! reveal account existence.

use std::sync::Arc;
use tracing::{info, warn};

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::password::CredentialHasher;
use crate::revocation::RevocationStore;
use crate::session::SessionStore;
use crate::store::SharedStore;
use crate::throttle::{AttemptThrottle, ThrottleDecision};
use crate::token::{Claims, TokenPair, TokenService};
use crate::two_factor::{self, CodeVerifier};
use crate::users::{normalize_identifier, UserStore};

/// Outcome of a successful first-factor login.
#[derive(Debug)]
pub enum LoginOutcome {
    /// Credentials verified, no step-up required.
    Complete(TokenPair),
    /// Credentials verified but the principal has two-factor enabled;
    /// only the step-up endpoint accepts this token.
    TwoFactorRequired {
        pre_auth_token: String,
        expires_in: u64,
    },
}

pub struct AuthService {
    users: Arc<dyn UserStore>,
    hasher: Arc<dyn CredentialHasher>,
    code_verifier: Arc<dyn CodeVerifier>,
    throttle: AttemptThrottle,
    tokens: TokenService,
    /// Verified against when the principal is unknown so both paths pay
    /// the same hashing cost.
    dummy_hash: String,
}

impl AuthService {
    pub fn new(
        config: AuthConfig,
        store: Arc<dyn SharedStore>,
        users: Arc<dyn UserStore>,
        hasher: Arc<dyn CredentialHasher>,
        code_verifier: Arc<dyn CodeVerifier>,
    ) -> anyhow::Result<Self> {
        let sessions = SessionStore::new(store.clone());
        let revocations = RevocationStore::new(store.clone(), config.refresh_ttl());
        let throttle = AttemptThrottle::new(store, &config);
        let dummy_hash = hasher
            .hash("portcullis-dummy-credential")
            .map_err(|err| anyhow::anyhow!("failed to prepare dummy hash: {err}"))?;
        let tokens = TokenService::new(config, sessions, revocations);
        Ok(Self {
            users,
            hasher,
            code_verifier,
            throttle,
            tokens,
            dummy_hash,
        })
    }

    /// First-factor login. Throttled per principal key; a lockout
    /// rejects the attempt before credentials are even checked.
    pub async fn login(&self, identifier: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        let principal_key = normalize_identifier(identifier);

        if let ThrottleDecision::Locked { retry_after } =
            self.throttle.check(&principal_key).await?
        {
            warn!(principal = principal_key, "login rejected: account locked");
            return Err(AuthError::AccountLocked { retry_after });
        }

        let user = self
            .users
            .find_by_identifier(&principal_key)
            .await
            .map_err(AuthError::Internal)?;

        let Some(user) = user else {
            // Same cost and same error as a wrong password.
            let _ = self.hasher.verify(password, &self.dummy_hash);
            self.throttle.record_failure(&principal_key).await?;
            warn!(principal = principal_key, "login failed: unknown principal");
            return Err(AuthError::InvalidCredentials);
        };

        if !self.hasher.verify(password, &user.password_hash) {
            self.throttle.record_failure(&principal_key).await?;
            warn!(user_id = %user.id, "login failed: credential mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        self.throttle.record_success(&principal_key).await?;

        if let Err(err) = self.users.update_last_active(user.id).await {
            // Best effort; activity tracking must not block login.
            warn!(user_id = %user.id, "failed to update last_active: {err}");
        }

        if user.two_factor.enabled {
            let (pre_auth_token, expires_in) = self.tokens.issue_pre_auth(&user).await?;
            info!(user_id = %user.id, "first factor verified, step-up required");
            return Ok(LoginOutcome::TwoFactorRequired {
                pre_auth_token,
                expires_in,
            });
        }

        let pair = self.tokens.issue(&user).await?;
        info!(user_id = %user.id, "login complete");
        Ok(LoginOutcome::Complete(pair))
    }

    /// Step-up exchange: verify the one-time code and swap the pre-auth
    /// token for a full pair. The pre-auth token is consumed either way
    /// on success; failed codes are throttled under the `:2fa` key.
    pub async fn verify_two_factor(
        &self,
        pre_auth_token: &str,
        code: &str,
    ) -> Result<TokenPair, AuthError> {
        let claims = self.tokens.verify_pre_auth(pre_auth_token).await?;
        let throttle_key = two_factor::throttle_key(&normalize_identifier(&claims.email));

        if let ThrottleDecision::Locked { retry_after } =
            self.throttle.check(&throttle_key).await?
        {
            warn!(user_id = %claims.sub, "step-up rejected: locked");
            return Err(AuthError::AccountLocked { retry_after });
        }

        let user = self
            .users
            .find_by_id(claims.sub)
            .await
            .map_err(AuthError::Internal)?
            .ok_or(AuthError::InvalidCredentials)?;

        let secret = user
            .two_factor
            .enabled
            .then_some(user.two_factor.secret.as_deref())
            .flatten()
            .ok_or_else(|| {
                warn!(user_id = %user.id, "step-up attempted without two-factor enabled");
                AuthError::TwoFactorInvalidCode
            })?;

        if !self.code_verifier.verify(secret, code) {
            self.throttle.record_failure(&throttle_key).await?;
            warn!(user_id = %user.id, "step-up failed: invalid code");
            return Err(AuthError::TwoFactorInvalidCode);
        }

        self.throttle.record_success(&throttle_key).await?;

        // One-time use: the consumed pre-auth token must not work twice.
        self.tokens.invalidate(pre_auth_token, &claims).await?;

        let pair = self.tokens.issue(&user).await?;
        info!(user_id = %user.id, "step-up complete");
        Ok(pair)
    }

    /// Full verification chain for a bearer access token.
    pub async fn verify_access(&self, token: &str) -> Result<Claims, AuthError> {
        self.tokens.verify_access(token).await
    }

    /// Rotate a refresh token. One-time use; replays fail revoked.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        self.tokens.refresh(refresh_token).await
    }

    /// Revoke both tokens and delete the session.
    pub async fn logout(&self, access_token: &str, refresh_token: &str) -> Result<(), AuthError> {
        self.tokens.logout(access_token, refresh_token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::Role;
    use crate::password::Argon2Hasher;
    use crate::store::MemoryStore;
    use crate::two_factor::EqualityVerifier;
    use crate::users::{MemoryUserStore, TwoFactorSettings, User};
    use secrecy::SecretString;
    use uuid::Uuid;

    const PASSWORD: &str = "correct horse battery staple";

    async fn service_with_users(
        users: &[(&str, Role, Option<&str>)],
    ) -> anyhow::Result<(AuthService, Vec<Uuid>)> {
        let hasher = Arc::new(Argon2Hasher::with_cost(8192, 1, 1)?);
        let user_store = Arc::new(MemoryUserStore::new());
        let mut ids = Vec::new();
        for (email, role, totp_secret) in users {
            let user = User {
                id: Uuid::new_v4(),
                email: (*email).to_string(),
                username: email.split('@').next().unwrap_or(email).to_string(),
                role: *role,
                password_hash: hasher.hash(PASSWORD).map_err(anyhow::Error::msg)?,
                two_factor: TwoFactorSettings {
                    enabled: totp_secret.is_some(),
                    secret: totp_secret.map(ToString::to_string),
                },
            };
            ids.push(user.id);
            user_store.insert(user).await;
        }
        let service = AuthService::new(
            AuthConfig::new(SecretString::from("test-secret")),
            Arc::new(MemoryStore::new()),
            user_store,
            hasher,
            Arc::new(EqualityVerifier),
        )?;
        Ok((service, ids))
    }

    #[tokio::test]
    async fn login_issues_pair_and_claims_match() -> anyhow::Result<()> {
        let (service, ids) =
            service_with_users(&[("alice@example.com", Role::Client, None)]).await?;

        let outcome = service.login("alice@example.com", PASSWORD).await?;
        let LoginOutcome::Complete(pair) = outcome else {
            panic!("expected a complete login");
        };

        let claims = service.verify_access(&pair.access_token).await?;
        assert_eq!(claims.sub, ids[0]);
        assert_eq!(claims.email, "alice@example.com");
        assert_eq!(claims.role, Role::Client);
        Ok(())
    }

    #[tokio::test]
    async fn unknown_principal_and_wrong_password_report_identically() -> anyhow::Result<()> {
        let (service, _) =
            service_with_users(&[("alice@example.com", Role::Client, None)]).await?;

        let unknown = service.login("ghost@example.com", PASSWORD).await;
        let wrong = service.login("alice@example.com", "wrong").await;
        assert!(matches!(unknown, Err(AuthError::InvalidCredentials)));
        assert!(matches!(wrong, Err(AuthError::InvalidCredentials)));
        Ok(())
    }

    #[tokio::test]
    async fn five_failures_lock_the_sixth_attempt() -> anyhow::Result<()> {
        let (service, _) =
            service_with_users(&[("user@example.com", Role::Freelancer, None)]).await?;

        for _ in 0..5 {
            let result = service.login("user@example.com", "wrong").await;
            assert!(matches!(result, Err(AuthError::InvalidCredentials)));
        }

        // Correct credentials no longer matter while locked.
        let locked = service.login("user@example.com", PASSWORD).await;
        match locked {
            Err(AuthError::AccountLocked { retry_after }) => {
                assert!(retry_after > 0 && retry_after <= 900);
            }
            other => panic!("expected lockout, got {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn success_clears_the_failure_streak() -> anyhow::Result<()> {
        let (service, _) =
            service_with_users(&[("user@example.com", Role::Client, None)]).await?;

        for _ in 0..4 {
            let _ = service.login("user@example.com", "wrong").await;
        }
        assert!(service.login("user@example.com", PASSWORD).await.is_ok());

        // The next failure starts counting from zero.
        for _ in 0..4 {
            let result = service.login("user@example.com", "wrong").await;
            assert!(matches!(result, Err(AuthError::InvalidCredentials)));
        }
        Ok(())
    }

    #[tokio::test]
    async fn two_factor_login_requires_step_up() -> anyhow::Result<()> {
        let (service, ids) =
            service_with_users(&[("bob@example.com", Role::Freelancer, Some("424242"))]).await?;

        let outcome = service.login("bob@example.com", PASSWORD).await?;
        let LoginOutcome::TwoFactorRequired {
            pre_auth_token, ..
        } = outcome
        else {
            panic!("expected a step-up challenge");
        };

        // The pre-auth token cannot reach protected resources.
        assert!(matches!(
            service.verify_access(&pre_auth_token).await,
            Err(AuthError::TwoFactorRequired)
        ));

        let pair = service.verify_two_factor(&pre_auth_token, "424242").await?;
        let claims = service.verify_access(&pair.access_token).await?;
        assert_eq!(claims.sub, ids[0]);

        // The pre-auth token was consumed by the exchange.
        assert!(service
            .verify_two_factor(&pre_auth_token, "424242")
            .await
            .is_err());
        Ok(())
    }

    #[tokio::test]
    async fn wrong_codes_throttle_step_up() -> anyhow::Result<()> {
        let (service, _) =
            service_with_users(&[("bob@example.com", Role::Freelancer, Some("424242"))]).await?;

        let LoginOutcome::TwoFactorRequired { pre_auth_token, .. } =
            service.login("bob@example.com", PASSWORD).await?
        else {
            panic!("expected a step-up challenge");
        };

        for _ in 0..5 {
            let result = service.verify_two_factor(&pre_auth_token, "000000").await;
            assert!(matches!(result, Err(AuthError::TwoFactorInvalidCode)));
        }
        assert!(matches!(
            service.verify_two_factor(&pre_auth_token, "424242").await,
            Err(AuthError::AccountLocked { .. })
        ));

        // First-factor logins for the same principal stay unaffected.
        assert!(service.login("bob@example.com", PASSWORD).await.is_ok());
        Ok(())
    }

    #[tokio::test]
    async fn logout_then_verify_fails() -> anyhow::Result<()> {
        let (service, _) =
            service_with_users(&[("alice@example.com", Role::Client, None)]).await?;

        let LoginOutcome::Complete(pair) = service.login("alice@example.com", PASSWORD).await?
        else {
            panic!("expected a complete login");
        };

        service.logout(&pair.access_token, &pair.refresh_token).await?;
        assert!(matches!(
            service.verify_access(&pair.access_token).await,
            Err(AuthError::TokenRevoked | AuthError::SessionNotFound)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn last_active_recorded_on_login() -> anyhow::Result<()> {
        let hasher = Arc::new(Argon2Hasher::with_cost(8192, 1, 1)?);
        let user_store = Arc::new(MemoryUserStore::new());
        let id = Uuid::new_v4();
        user_store
            .insert(User {
                id,
                email: "alice@example.com".to_string(),
                username: "alice".to_string(),
                role: Role::Client,
                password_hash: hasher.hash(PASSWORD).map_err(anyhow::Error::msg)?,
                two_factor: TwoFactorSettings::default(),
            })
            .await;
        let service = AuthService::new(
            AuthConfig::new(SecretString::from("test-secret")),
            Arc::new(MemoryStore::new()),
            user_store.clone(),
            hasher,
            Arc::new(EqualityVerifier),
        )?;

        service.login("alice@example.com", PASSWORD).await?;
        assert!(user_store.last_active(id).await.is_some());
        Ok(())
    }
}
