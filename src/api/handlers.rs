//! Auth endpoints.
//!
//! Credential and token failures all map to the same 401 body so
//! responses never reveal whether an account exists or why a token was
//! rejected; the precise reason only reaches the audit log.

use axum::{
    extract::Extension,
    http::{header::RETRY_AFTER, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, warn};

use super::rate_limit::{RateLimitAction, RateLimitDecision};
use super::types::{
    LoginRequest, LoginResponse, LogoutRequest, RefreshRequest, SessionResponse,
    TokenPairResponse, TwoFactorChallengeResponse, TwoFactorVerifyRequest,
};
use super::utils::{extract_bearer_token, extract_client_ip};
use super::AppState;
use crate::error::AuthError;
use crate::service::LoginOutcome;
use crate::token::Claims;

const AUTH_FAILED: &str = "Authentication failed";

/// Map a core error onto the uniform HTTP surface.
fn error_response(err: &AuthError) -> Response {
    match err {
        AuthError::InvalidCredentials
        | AuthError::TokenMalformed
        | AuthError::TokenExpired
        | AuthError::TokenRevoked
        | AuthError::SessionNotFound
        | AuthError::TwoFactorInvalidCode => {
            warn!(reason = err.audit_reason(), "authentication rejected");
            (StatusCode::UNAUTHORIZED, AUTH_FAILED.to_string()).into_response()
        }
        AuthError::TwoFactorRequired => {
            warn!(reason = err.audit_reason(), "authentication rejected");
            (
                StatusCode::UNAUTHORIZED,
                "Two-factor verification required".to_string(),
            )
                .into_response()
        }
        AuthError::AccountLocked { retry_after } => {
            let mut headers = HeaderMap::new();
            if let Ok(value) = retry_after.to_string().parse() {
                headers.insert(RETRY_AFTER, value);
            }
            (
                StatusCode::TOO_MANY_REQUESTS,
                headers,
                "Account temporarily locked".to_string(),
            )
                .into_response()
        }
        AuthError::RateLimitExceeded => {
            (StatusCode::TOO_MANY_REQUESTS, "Rate limited".to_string()).into_response()
        }
        AuthError::InsufficientRole
        | AuthError::InsufficientPermission
        | AuthError::OwnershipViolation => {
            (StatusCode::FORBIDDEN, "Forbidden".to_string()).into_response()
        }
        AuthError::StoreUnavailable(inner) => {
            // Fail closed: no token is accepted while the store is down.
            error!("shared store unavailable: {inner}");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "Service unavailable".to_string(),
            )
                .into_response()
        }
        AuthError::Internal(inner) => {
            error!("internal error: {inner}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal error".to_string(),
            )
                .into_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token pair issued, or a step-up challenge", body = LoginResponse),
        (status = 400, description = "Validation error", body = String),
        (status = 401, description = "Authentication failed", body = String),
        (status = 429, description = "Account locked or rate limited", body = String)
    ),
    tag = "auth"
)]
pub async fn login(
    headers: HeaderMap,
    state: Extension<Arc<AppState>>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let request: LoginRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let identifier = request.identifier.trim().to_string();
    if identifier.is_empty() || request.password.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            "Missing identifier or password".to_string(),
        )
            .into_response();
    }

    let client_ip = extract_client_ip(&headers);
    if state
        .rate_limiter()
        .check_ip(client_ip.as_deref(), RateLimitAction::Login)
        == RateLimitDecision::Limited
        || state
            .rate_limiter()
            .check_identifier(&identifier, RateLimitAction::Login)
            == RateLimitDecision::Limited
    {
        return (StatusCode::TOO_MANY_REQUESTS, "Rate limited".to_string()).into_response();
    }

    match state.service().login(&identifier, &request.password).await {
        Ok(LoginOutcome::Complete(pair)) => (
            StatusCode::OK,
            Json(LoginResponse::Tokens(pair.into())),
        )
            .into_response(),
        Ok(LoginOutcome::TwoFactorRequired {
            pre_auth_token,
            expires_in,
        }) => (
            StatusCode::OK,
            Json(LoginResponse::Challenge(TwoFactorChallengeResponse {
                two_factor_required: true,
                pre_auth_token,
                expires_in,
            })),
        )
            .into_response(),
        Err(err) => error_response(&err),
    }
}

#[utoipa::path(
    post,
    path = "/v1/auth/2fa/verify",
    request_body = TwoFactorVerifyRequest,
    responses(
        (status = 200, description = "Step-up complete, token pair issued", body = TokenPairResponse),
        (status = 400, description = "Validation error", body = String),
        (status = 401, description = "Authentication failed", body = String),
        (status = 429, description = "Too many invalid codes", body = String)
    ),
    tag = "auth"
)]
pub async fn two_factor_verify(
    headers: HeaderMap,
    state: Extension<Arc<AppState>>,
    payload: Option<Json<TwoFactorVerifyRequest>>,
) -> impl IntoResponse {
    let request: TwoFactorVerifyRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    if request.pre_auth_token.is_empty() || request.code.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            "Missing token or code".to_string(),
        )
            .into_response();
    }

    let client_ip = extract_client_ip(&headers);
    if state
        .rate_limiter()
        .check_ip(client_ip.as_deref(), RateLimitAction::TwoFactor)
        == RateLimitDecision::Limited
    {
        return (StatusCode::TOO_MANY_REQUESTS, "Rate limited".to_string()).into_response();
    }

    match state
        .service()
        .verify_two_factor(&request.pre_auth_token, request.code.trim())
        .await
    {
        Ok(pair) => (StatusCode::OK, Json(TokenPairResponse::from(pair))).into_response(),
        Err(err) => error_response(&err),
    }
}

#[utoipa::path(
    post,
    path = "/v1/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New token pair issued", body = TokenPairResponse),
        (status = 400, description = "Validation error", body = String),
        (status = 401, description = "Refresh token rejected", body = String)
    ),
    tag = "auth"
)]
pub async fn refresh(
    headers: HeaderMap,
    state: Extension<Arc<AppState>>,
    payload: Option<Json<RefreshRequest>>,
) -> impl IntoResponse {
    let request: RefreshRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    if request.refresh_token.is_empty() {
        return (StatusCode::BAD_REQUEST, "Missing refresh token".to_string()).into_response();
    }

    let client_ip = extract_client_ip(&headers);
    if state
        .rate_limiter()
        .check_ip(client_ip.as_deref(), RateLimitAction::Refresh)
        == RateLimitDecision::Limited
    {
        return (StatusCode::TOO_MANY_REQUESTS, "Rate limited".to_string()).into_response();
    }

    match state.service().refresh(&request.refresh_token).await {
        Ok(pair) => (StatusCode::OK, Json(TokenPairResponse::from(pair))).into_response(),
        Err(err) => error_response(&err),
    }
}

#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    request_body = LogoutRequest,
    responses(
        (status = 204, description = "Session cleared")
    ),
    tag = "auth"
)]
pub async fn logout(
    headers: HeaderMap,
    state: Extension<Arc<AppState>>,
    payload: Option<Json<LogoutRequest>>,
) -> impl IntoResponse {
    // Logout is idempotent: a missing or already-dead token still ends
    // with the same observable state, so errors are logged, not returned.
    // One presented token is enough; each is revoked independently.
    let access_token = extract_bearer_token(&headers).unwrap_or_default();
    let refresh_token = payload
        .map(|Json(request)| request.refresh_token)
        .unwrap_or_default();

    if !access_token.is_empty() || !refresh_token.is_empty() {
        if let Err(err) = state.service().logout(&access_token, &refresh_token).await {
            warn!(reason = err.audit_reason(), "logout cleanup failed");
        }
    }

    StatusCode::NO_CONTENT
}

/// Resolve the bearer token into verified claims, or reject with the
/// uniform 401. For handlers that require an authenticated principal.
pub async fn authenticate(
    headers: &HeaderMap,
    service: &crate::service::AuthService,
) -> Result<Claims, Response> {
    match optional_authenticate(headers, service).await? {
        Some(claims) => Ok(claims),
        None => Err((StatusCode::UNAUTHORIZED, AUTH_FAILED.to_string()).into_response()),
    }
}

/// Like [`authenticate`] but a missing or rejected token is `None`
/// rather than an error. Store outages still fail closed.
pub async fn optional_authenticate(
    headers: &HeaderMap,
    service: &crate::service::AuthService,
) -> Result<Option<Claims>, Response> {
    let Some(token) = extract_bearer_token(headers) else {
        return Ok(None);
    };
    match service.verify_access(&token).await {
        Ok(claims) => Ok(Some(claims)),
        Err(err @ (AuthError::StoreUnavailable(_) | AuthError::Internal(_))) => {
            Err(error_response(&err))
        }
        Err(err) => {
            warn!(reason = err.audit_reason(), "bearer token rejected");
            Ok(None)
        }
    }
}

#[utoipa::path(
    get,
    path = "/v1/auth/session",
    responses(
        (status = 200, description = "Session is active", body = SessionResponse),
        (status = 204, description = "No active session")
    ),
    tag = "auth"
)]
pub async fn session(headers: HeaderMap, state: Extension<Arc<AppState>>) -> impl IntoResponse {
    // A missing or rejected token is "no session", not an error, so the
    // endpoint does not leak why a token failed.
    match optional_authenticate(&headers, state.service()).await {
        Ok(Some(claims)) => {
            let response = SessionResponse {
                user_id: claims.sub.to_string(),
                email: claims.email,
                role: claims.role.as_str().to_string(),
                session_id: claims.sid,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Ok(None) => StatusCode::NO_CONTENT.into_response(),
        Err(response) => response,
    }
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up")
    ),
    tag = "health"
)]
pub async fn health() -> impl IntoResponse {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
