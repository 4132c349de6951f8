//! Request/response types for auth endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    /// Email or username.
    pub identifier: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct TwoFactorVerifyRequest {
    pub pre_auth_token: String,
    pub code: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LogoutRequest {
    pub refresh_token: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct TokenPairResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
}

impl From<crate::token::TokenPair> for TokenPairResponse {
    fn from(pair: crate::token::TokenPair) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            expires_in: pair.expires_in,
        }
    }
}

/// Returned by login when the principal still has to present a one-time
/// code; the pre-auth token is only good for the step-up exchange.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct TwoFactorChallengeResponse {
    pub two_factor_required: bool,
    pub pre_auth_token: String,
    /// Pre-auth token lifetime in seconds.
    pub expires_in: u64,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(untagged)]
pub enum LoginResponse {
    Challenge(TwoFactorChallengeResponse),
    Tokens(TokenPairResponse),
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SessionResponse {
    pub user_id: String,
    pub email: String,
    pub role: String,
    pub session_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result};

    #[test]
    fn login_request_round_trips() -> Result<()> {
        let request = LoginRequest {
            identifier: "alice@example.com".to_string(),
            password: "hunter2".to_string(),
        };
        let value = serde_json::to_value(&request)?;
        let identifier = value
            .get("identifier")
            .and_then(serde_json::Value::as_str)
            .context("missing identifier")?;
        assert_eq!(identifier, "alice@example.com");
        let decoded: LoginRequest = serde_json::from_value(value)?;
        assert_eq!(decoded.password, "hunter2");
        Ok(())
    }

    #[test]
    fn login_response_serializes_untagged() -> Result<()> {
        let response = LoginResponse::Challenge(TwoFactorChallengeResponse {
            two_factor_required: true,
            pre_auth_token: "token".to_string(),
            expires_in: 300,
        });
        let value = serde_json::to_value(&response)?;
        assert_eq!(
            value.get("two_factor_required"),
            Some(&serde_json::Value::Bool(true))
        );
        assert!(value.get("access_token").is_none());
        Ok(())
    }
}
