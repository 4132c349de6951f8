//! Request-level rate limiting for auth flows.
//!
//! Distinct from account lockout: this guards the endpoints themselves
//! (per client IP or per identifier) and fails open, while lockout is a
//! per-principal security control that fails closed.

#[derive(Clone, Copy, Debug)]
pub enum RateLimitAction {
    Login,
    TwoFactor,
    Refresh,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Limited,
}

pub trait RateLimiter: Send + Sync {
    fn check_ip(&self, ip: Option<&str>, action: RateLimitAction) -> RateLimitDecision;
    fn check_identifier(&self, identifier: &str, action: RateLimitAction) -> RateLimitDecision;
}

#[derive(Clone, Debug)]
pub struct NoopRateLimiter;

impl RateLimiter for NoopRateLimiter {
    fn check_ip(&self, _ip: Option<&str>, _action: RateLimitAction) -> RateLimitDecision {
        RateLimitDecision::Allowed
    }

    fn check_identifier(&self, _identifier: &str, _action: RateLimitAction) -> RateLimitDecision {
        RateLimitDecision::Allowed
    }
}
