//! Core configuration.
//!
//! Builder-style knobs with production defaults. The signing secret is
//! held in [`secrecy::SecretString`] so it never appears in debug
//! output or logs.

use secrecy::SecretString;
use std::time::Duration;

const DEFAULT_ISSUER: &str = "portcullis";
const DEFAULT_AUDIENCE: &str = "portcullis-api";
const DEFAULT_ACCESS_TTL: Duration = Duration::from_secs(15 * 60);
const DEFAULT_REFRESH_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);
const DEFAULT_PRE_AUTH_TTL: Duration = Duration::from_secs(5 * 60);
const DEFAULT_CLOCK_SKEW_LEEWAY: Duration = Duration::from_secs(30);
const DEFAULT_LOCKOUT_THRESHOLD: i64 = 5;
const DEFAULT_FAILURE_WINDOW: Duration = Duration::from_secs(15 * 60);
const DEFAULT_LOCKOUT_DURATION: Duration = Duration::from_secs(15 * 60);

#[derive(Clone)]
pub struct AuthConfig {
    signing_secret: SecretString,
    issuer: String,
    audience: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
    pre_auth_ttl: Duration,
    clock_skew_leeway: Duration,
    lockout_threshold: i64,
    failure_window: Duration,
    lockout_duration: Duration,
}

impl AuthConfig {
    #[must_use]
    pub fn new(signing_secret: SecretString) -> Self {
        Self {
            signing_secret,
            issuer: DEFAULT_ISSUER.to_string(),
            audience: DEFAULT_AUDIENCE.to_string(),
            access_ttl: DEFAULT_ACCESS_TTL,
            refresh_ttl: DEFAULT_REFRESH_TTL,
            pre_auth_ttl: DEFAULT_PRE_AUTH_TTL,
            clock_skew_leeway: DEFAULT_CLOCK_SKEW_LEEWAY,
            lockout_threshold: DEFAULT_LOCKOUT_THRESHOLD,
            failure_window: DEFAULT_FAILURE_WINDOW,
            lockout_duration: DEFAULT_LOCKOUT_DURATION,
        }
    }

    #[must_use]
    pub fn with_issuer(mut self, issuer: String) -> Self {
        self.issuer = issuer;
        self
    }

    #[must_use]
    pub fn with_audience(mut self, audience: String) -> Self {
        self.audience = audience;
        self
    }

    #[must_use]
    pub fn with_access_ttl(mut self, ttl: Duration) -> Self {
        self.access_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_refresh_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_pre_auth_ttl(mut self, ttl: Duration) -> Self {
        self.pre_auth_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_clock_skew_leeway(mut self, leeway: Duration) -> Self {
        self.clock_skew_leeway = leeway;
        self
    }

    #[must_use]
    pub fn with_lockout_threshold(mut self, threshold: i64) -> Self {
        self.lockout_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_failure_window(mut self, window: Duration) -> Self {
        self.failure_window = window;
        self
    }

    #[must_use]
    pub fn with_lockout_duration(mut self, duration: Duration) -> Self {
        self.lockout_duration = duration;
        self
    }

    pub(crate) fn signing_secret(&self) -> &SecretString {
        &self.signing_secret
    }

    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    #[must_use]
    pub fn audience(&self) -> &str {
        &self.audience
    }

    #[must_use]
    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    #[must_use]
    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    #[must_use]
    pub fn pre_auth_ttl(&self) -> Duration {
        self.pre_auth_ttl
    }

    #[must_use]
    pub fn clock_skew_leeway(&self) -> Duration {
        self.clock_skew_leeway
    }

    #[must_use]
    pub fn lockout_threshold(&self) -> i64 {
        self.lockout_threshold
    }

    #[must_use]
    pub fn failure_window(&self) -> Duration {
        self.failure_window
    }

    #[must_use]
    pub fn lockout_duration(&self) -> Duration {
        self.lockout_duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_overrides() {
        let config = AuthConfig::new(SecretString::from("secret"));
        assert_eq!(config.issuer(), DEFAULT_ISSUER);
        assert_eq!(config.audience(), DEFAULT_AUDIENCE);
        assert_eq!(config.access_ttl(), DEFAULT_ACCESS_TTL);
        assert_eq!(config.refresh_ttl(), DEFAULT_REFRESH_TTL);
        assert_eq!(config.lockout_threshold(), 5);

        let config = config
            .with_issuer("auth.test".to_string())
            .with_audience("api.test".to_string())
            .with_access_ttl(Duration::from_secs(60))
            .with_refresh_ttl(Duration::from_secs(120))
            .with_pre_auth_ttl(Duration::from_secs(30))
            .with_clock_skew_leeway(Duration::from_secs(5))
            .with_lockout_threshold(3)
            .with_failure_window(Duration::from_secs(10))
            .with_lockout_duration(Duration::from_secs(20));

        assert_eq!(config.issuer(), "auth.test");
        assert_eq!(config.audience(), "api.test");
        assert_eq!(config.access_ttl(), Duration::from_secs(60));
        assert_eq!(config.refresh_ttl(), Duration::from_secs(120));
        assert_eq!(config.pre_auth_ttl(), Duration::from_secs(30));
        assert_eq!(config.clock_skew_leeway(), Duration::from_secs(5));
        assert_eq!(config.lockout_threshold(), 3);
        assert_eq!(config.failure_window(), Duration::from_secs(10));
        assert_eq!(config.lockout_duration(), Duration::from_secs(20));
    }
}
