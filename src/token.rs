//! Token pair issuance, verification, rotation, and logout.
//!
//! Tokens are signed JWTs carrying the principal claims plus the id of
//! a server-side session. Verification is a triple check: signature and
//! standard claims, then the revocation blacklist, then a live session.
//! The session check is what defeats stolen-but-still-time-valid
//! tokens: killing the session kills every token bound to it.
//!
//! Each rejection has a distinct internal reason for auditing, but the
//! HTTP layer reports all of them with one uniform message so a caller
//! cannot learn which check failed.

use chrono::Utc;
use jsonwebtoken::{
    decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::authz::Role;
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::revocation::RevocationStore;
use crate::session::SessionStore;
use crate::users::User;

/// Distinguishes access tokens from refresh tokens so one can never be
/// presented in place of the other.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Pre-auth tokens carry `two_factor_pending` and are only good for the
/// step-up endpoint; everything else requires `full`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TokenScope {
    Full,
    TwoFactorPending,
}

/// Fixed, strongly typed token payload. Anything that does not match
/// exactly is rejected on decode.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Claims {
    /// Principal id.
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    /// Server-side session id.
    pub sid: String,
    pub scope: TokenScope,
    pub kind: TokenKind,
    pub iss: String,
    pub aud: String,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access-token lifetime in seconds.
    pub expires_in: u64,
}

pub struct TokenService {
    config: AuthConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    header: Header,
    sessions: SessionStore,
    revocations: RevocationStore,
}

impl TokenService {
    #[must_use]
    pub fn new(config: AuthConfig, sessions: SessionStore, revocations: RevocationStore) -> Self {
        let secret = config.signing_secret().expose_secret().as_bytes().to_vec();
        Self {
            encoding_key: EncodingKey::from_secret(&secret),
            decoding_key: DecodingKey::from_secret(&secret),
            header: Header::new(Algorithm::HS256),
            config,
            sessions,
            revocations,
        }
    }

    /// Create a session and a full access/refresh pair bound to it.
    pub async fn issue(&self, user: &User) -> Result<TokenPair, AuthError> {
        self.issue_for(user.id, &user.email, user.role).await
    }

    async fn issue_for(
        &self,
        user_id: Uuid,
        email: &str,
        role: Role,
    ) -> Result<TokenPair, AuthError> {
        let session = self
            .sessions
            .create(user_id, email, role, self.config.refresh_ttl())
            .await?;

        let access = self.sign(
            user_id,
            email,
            role,
            &session.id,
            TokenScope::Full,
            TokenKind::Access,
            self.config.access_ttl(),
        )?;
        let refresh = self.sign(
            user_id,
            email,
            role,
            &session.id,
            TokenScope::Full,
            TokenKind::Refresh,
            self.config.refresh_ttl(),
        )?;

        Ok(TokenPair {
            access_token: access,
            refresh_token: refresh,
            expires_in: self.config.access_ttl().as_secs(),
        })
    }

    /// Mint a limited-scope pre-authentication token: short-lived, no
    /// refresh token, only accepted by the step-up endpoint.
    pub async fn issue_pre_auth(&self, user: &User) -> Result<(String, u64), AuthError> {
        let session = self
            .sessions
            .create(user.id, &user.email, user.role, self.config.pre_auth_ttl())
            .await?;
        let token = self.sign(
            user.id,
            &user.email,
            user.role,
            &session.id,
            TokenScope::TwoFactorPending,
            TokenKind::Access,
            self.config.pre_auth_ttl(),
        )?;
        Ok((token, self.config.pre_auth_ttl().as_secs()))
    }

    /// Full verification chain for a bearer access token.
    pub async fn verify_access(&self, token: &str) -> Result<Claims, AuthError> {
        let claims = self
            .verify_live(token, TokenKind::Access, TokenScope::Full)
            .await?;
        Ok(claims)
    }

    /// Verification for the step-up endpoint only.
    pub async fn verify_pre_auth(&self, token: &str) -> Result<Claims, AuthError> {
        self.verify_live(token, TokenKind::Access, TokenScope::TwoFactorPending)
            .await
    }

    /// Rotate a refresh token: verify it exactly like an access token,
    /// revoke it (one-time use, first writer wins), and issue a brand
    /// new session and pair. A reused token fails the revocation check.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let claims = self
            .verify_live(refresh_token, TokenKind::Refresh, TokenScope::Full)
            .await?;

        let rotated = self
            .revocations
            .revoke_once(refresh_token, remaining_lifetime(claims.exp))
            .await?;
        if !rotated {
            warn!(user_id = %claims.sub, "refresh token reuse detected");
            return Err(AuthError::TokenRevoked);
        }

        // Rotation supersedes the old session; tokens still pointing at
        // it die with it.
        self.sessions.delete(&claims.sid).await?;

        self.issue_for(claims.sub, &claims.email, claims.role).await
    }

    /// Revoke both tokens for their remaining lifetimes and delete the
    /// session. Session deletion alone is already safe (verification
    /// checks the session), revocation closes the remaining window.
    ///
    /// The tokens are decoded independently: one undecodable token must
    /// not leave the other usable, so each is revoked on its own and an
    /// error is only returned when neither decodes.
    pub async fn logout(&self, access_token: &str, refresh_token: &str) -> Result<(), AuthError> {
        let access = self.decode(access_token, false);
        let refresh = self.decode(refresh_token, false);

        if let Ok(claims) = &access {
            self.sessions.delete(&claims.sid).await?;
            self.revocations
                .revoke(access_token, remaining_lifetime(claims.exp))
                .await?;
        }

        if let Ok(claims) = &refresh {
            // The refresh token normally shares the session; only
            // mismatched pairs need a second deletion.
            if access.as_ref().map_or(true, |a| a.sid != claims.sid) {
                self.sessions.delete(&claims.sid).await?;
            }
            self.revocations
                .revoke(refresh_token, remaining_lifetime(claims.exp))
                .await?;
        }

        match (access, refresh) {
            (Err(err), Err(_)) => Err(err),
            _ => Ok(()),
        }
    }

    /// Revoke a single token and delete its session, for forced
    /// invalidation paths such as a consumed pre-auth token.
    pub(crate) async fn invalidate(&self, token: &str, claims: &Claims) -> Result<(), AuthError> {
        self.sessions.delete(&claims.sid).await?;
        self.revocations
            .revoke(token, remaining_lifetime(claims.exp))
            .await?;
        Ok(())
    }

    async fn verify_live(
        &self,
        token: &str,
        kind: TokenKind,
        scope: TokenScope,
    ) -> Result<Claims, AuthError> {
        let claims = self.decode(token, true)?;

        if claims.kind != kind {
            debug!("token rejected: wrong kind");
            return Err(AuthError::TokenMalformed);
        }
        if claims.scope != scope {
            debug!(user_id = %claims.sub, "token rejected: scope not satisfied");
            return Err(AuthError::TwoFactorRequired);
        }
        if self.revocations.is_revoked(token).await? {
            warn!(user_id = %claims.sub, "token rejected: revoked");
            return Err(AuthError::TokenRevoked);
        }
        match self.sessions.get(&claims.sid).await? {
            Some(session) if session.user_id == claims.sub => Ok(claims),
            Some(_) => {
                warn!(user_id = %claims.sub, "token rejected: session principal mismatch");
                Err(AuthError::SessionNotFound)
            }
            None => {
                debug!(user_id = %claims.sub, "token rejected: session missing");
                Err(AuthError::SessionNotFound)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn sign(
        &self,
        user_id: Uuid,
        email: &str,
        role: Role,
        session_id: &str,
        scope: TokenScope,
        kind: TokenKind,
        ttl: Duration,
    ) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            role,
            sid: session_id.to_string(),
            scope,
            kind,
            iss: self.config.issuer().to_string(),
            aud: self.config.audience().to_string(),
            exp: (now + chrono::Duration::from_std(ttl).unwrap_or_default()).timestamp(),
            iat: now.timestamp(),
        };
        encode(&self.header, &claims, &self.encoding_key).map_err(|err| {
            AuthError::Internal(anyhow::anyhow!("token signing failed: {err}"))
        })
    }

    fn decode(&self, token: &str, validate_exp: bool) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = self.config.clock_skew_leeway().as_secs();
        validation.set_issuer(&[self.config.issuer()]);
        validation.set_audience(&[self.config.audience()]);
        validation.validate_exp = validate_exp;

        match decode::<Claims>(token, &self.decoding_key, &validation) {
            Ok(data) => Ok(data.claims),
            Err(err) => {
                use jsonwebtoken::errors::ErrorKind;
                match err.kind() {
                    ErrorKind::ExpiredSignature => {
                        debug!("token rejected: expired");
                        Err(AuthError::TokenExpired)
                    }
                    ErrorKind::InvalidSignature => {
                        warn!("token rejected: bad signature");
                        Err(AuthError::TokenMalformed)
                    }
                    _ => {
                        debug!("token rejected: malformed ({err})");
                        Err(AuthError::TokenMalformed)
                    }
                }
            }
        }
    }
}

/// Remaining lifetime of a token given its `exp` claim, `None` when the
/// token is already past expiry (the revocation store then applies its
/// own upper bound).
fn remaining_lifetime(exp: i64) -> Option<Duration> {
    let remaining = exp - Utc::now().timestamp();
    u64::try_from(remaining).ok().map(Duration::from_secs)
}
