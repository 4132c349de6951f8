//! HTTP surface for the security core.
//!
//! Thin layer over [`AuthService`]: handlers validate payloads, run the
//! request-level rate limiter, and translate core errors into the
//! uniform response surface. Every request carries an `x-request-id`
//! that is propagated to the response and attached to the trace span.

use anyhow::Result;
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method, Request,
    },
    routing::{get, post},
    Extension, Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer, request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use crate::service::AuthService;

pub(crate) mod handlers;
mod rate_limit;
pub(crate) mod types;
mod utils;

pub use handlers::{authenticate, optional_authenticate};
pub use rate_limit::{NoopRateLimiter, RateLimitAction, RateLimitDecision, RateLimiter};

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::login,
        handlers::two_factor_verify,
        handlers::refresh,
        handlers::logout,
        handlers::session,
        handlers::health,
    ),
    components(schemas(
        types::LoginRequest,
        types::TwoFactorVerifyRequest,
        types::RefreshRequest,
        types::LogoutRequest,
        types::LoginResponse,
        types::TokenPairResponse,
        types::TwoFactorChallengeResponse,
        types::SessionResponse,
    )),
    tags(
        (name = "auth", description = "Token issuance, rotation, and revocation"),
        (name = "health", description = "Liveness")
    )
)]
pub struct ApiDoc;

pub struct AppState {
    service: AuthService,
    rate_limiter: Arc<dyn rate_limit::RateLimiter>,
}

impl AppState {
    #[must_use]
    pub fn new(service: AuthService, rate_limiter: Arc<dyn rate_limit::RateLimiter>) -> Self {
        Self {
            service,
            rate_limiter,
        }
    }

    pub(crate) fn service(&self) -> &AuthService {
        &self.service
    }

    pub(crate) fn rate_limiter(&self) -> &dyn rate_limit::RateLimiter {
        self.rate_limiter.as_ref()
    }
}

/// Build the application router with all routes and layers wired.
#[must_use]
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST]);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/v1/auth/login", post(handlers::login))
        .route("/v1/auth/2fa/verify", post(handlers::two_factor_verify))
        .route("/v1/auth/refresh", post(handlers::refresh))
        .route("/v1/auth/logout", post(handlers::logout))
        .route("/v1/auth/session", get(handlers::session))
        .route("/health", get(handlers::health))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Uuid::new_v4().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(state)),
        )
}

/// Bind and serve until the process is stopped.
/// # Errors
/// Returns an error if the listener cannot bind or the server fails.
pub async fn serve(port: u16, state: Arc<AppState>) -> Result<()> {
    let app = router(state);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_documents_all_auth_routes() {
        let spec = ApiDoc::openapi();
        for path in [
            "/v1/auth/login",
            "/v1/auth/2fa/verify",
            "/v1/auth/refresh",
            "/v1/auth/logout",
            "/v1/auth/session",
            "/health",
        ] {
            assert!(
                spec.paths.paths.contains_key(path),
                "missing path {path} in OpenAPI document"
            );
        }
    }

    #[test]
    fn openapi_tags_present() {
        let spec = ApiDoc::openapi();
        let tags = spec.tags.clone().unwrap_or_default();
        assert!(tags.iter().any(|tag| tag.name == "auth"));
        assert!(tags.iter().any(|tag| tag.name == "health"));
    }
}
