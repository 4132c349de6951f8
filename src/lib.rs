//! Credential and session security core.
//!
//! Issues, verifies, rotates, and revokes token pairs; enforces account
//! lockout and two-factor step-up; and gates authorization decisions.
//! All shared mutable state lives behind the [`store::SharedStore`]
//! capability so the core can run as multiple concurrent instances.

pub mod api;
pub mod authz;
pub mod cli;
pub mod config;
pub mod error;
pub mod password;
pub mod revocation;
pub mod service;
pub mod session;
pub mod store;
pub mod throttle;
pub mod token;
pub mod two_factor;
pub mod users;

pub use config::AuthConfig;
pub use error::AuthError;
pub use service::{AuthService, LoginOutcome};
