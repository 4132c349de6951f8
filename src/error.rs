//! Error taxonomy for the security core.
//!
//! Every expected failure is a typed variant surfaced to the caller as a
//! structured result, never an exception-style panic. Store failures on
//! verification paths become [`AuthError::StoreUnavailable`] and are
//! treated as unauthenticated by the HTTP layer (fail closed).

use thiserror::Error;

/// Failure talking to the shared key-value store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Expected, recoverable failures surfaced by the core.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Wrong password or unknown principal. Always reported identically
    /// to avoid user enumeration.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("account locked, retry in {retry_after} seconds")]
    AccountLocked { retry_after: u64 },

    #[error("token malformed")]
    TokenMalformed,

    #[error("token expired")]
    TokenExpired,

    #[error("token revoked")]
    TokenRevoked,

    #[error("session not found")]
    SessionNotFound,

    #[error("two-factor verification required")]
    TwoFactorRequired,

    #[error("invalid two-factor code")]
    TwoFactorInvalidCode,

    #[error("insufficient role")]
    InsufficientRole,

    #[error("insufficient permission")]
    InsufficientPermission,

    #[error("ownership violation")]
    OwnershipViolation,

    #[error("rate limit exceeded")]
    RateLimitExceeded,

    #[error("shared store unavailable")]
    StoreUnavailable(#[from] StoreError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    /// Internal audit label for security logging. More precise than the
    /// uniform caller-facing message.
    #[must_use]
    pub fn audit_reason(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "invalid_credentials",
            Self::AccountLocked { .. } => "account_locked",
            Self::TokenMalformed => "token_malformed",
            Self::TokenExpired => "token_expired",
            Self::TokenRevoked => "token_revoked",
            Self::SessionNotFound => "session_not_found",
            Self::TwoFactorRequired => "two_factor_required",
            Self::TwoFactorInvalidCode => "two_factor_invalid_code",
            Self::InsufficientRole => "insufficient_role",
            Self::InsufficientPermission => "insufficient_permission",
            Self::OwnershipViolation => "ownership_violation",
            Self::RateLimitExceeded => "rate_limit_exceeded",
            Self::StoreUnavailable(_) => "store_unavailable",
            Self::Internal(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audit_reasons_are_stable() {
        assert_eq!(
            AuthError::InvalidCredentials.audit_reason(),
            "invalid_credentials"
        );
        assert_eq!(
            AuthError::AccountLocked { retry_after: 900 }.audit_reason(),
            "account_locked"
        );
        assert_eq!(AuthError::TokenRevoked.audit_reason(), "token_revoked");
    }

    #[test]
    fn store_error_converts_to_unavailable() {
        let err: AuthError = StoreError::Backend("down".to_string()).into();
        assert!(matches!(err, AuthError::StoreUnavailable(_)));
    }

    #[test]
    fn locked_message_includes_seconds() {
        let err = AuthError::AccountLocked { retry_after: 42 };
        assert_eq!(err.to_string(), "account locked, retry in 42 seconds");
    }
}
