//! Two-factor step-up verification.
//!
//! First-factor success for a two-factor principal yields only a
//! limited-scope pre-auth token (see [`crate::token::TokenScope`]); the
//! step-up exchange verifies a one-time code and swaps that token for a
//! full pair. The code-generation algorithm itself is out of scope: the
//! verifier is a pluggable predicate over the principal's stored secret.
//!
//! Failed codes consume attempt-throttle slots under a dedicated
//! `:2fa` key so step-up brute force is locked out independently of
//! first-factor failures.

use crate::throttle::TWO_FACTOR_SUFFIX;

/// Pluggable one-time-code predicate (TOTP, HOTP, backup codes…).
pub trait CodeVerifier: Send + Sync {
    /// Compare a presented code against the principal's stored secret.
    /// Pure check, no side effects.
    fn verify(&self, secret: &str, code: &str) -> bool;
}

/// Throttle key for step-up attempts, distinct from the login key.
pub(crate) fn throttle_key(principal_key: &str) -> String {
    format!("{principal_key}{TWO_FACTOR_SUFFIX}")
}

#[cfg(test)]
pub(crate) struct EqualityVerifier;

#[cfg(test)]
impl CodeVerifier for EqualityVerifier {
    fn verify(&self, secret: &str, code: &str) -> bool {
        !secret.is_empty() && secret == code
    }
}
