//! HTTP routes for the WebApi service.
//!
//! Defines the Axum router and application state.

use crate::auth::{DefaultBearerEvents, JwtBearerEvents, JwtValidator};
use crate::config::Config;
use crate::errors::ApiError;
use crate::handlers;
use crate::middleware::{require_auth, AuthState};
use axum::{middleware, routing::get, Router};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Config,

    /// Bearer authentication state.
    pub auth: Arc<AuthState>,
}

impl AppState {
    /// Build state with the default lifecycle hooks.
    pub fn new(config: Config) -> Self {
        Self::with_events(config, Arc::new(DefaultBearerEvents))
    }

    /// Build state with custom lifecycle hooks.
    pub fn with_events(config: Config, events: Arc<dyn JwtBearerEvents>) -> Self {
        let validator = JwtValidator::new(
            &config.auth0,
            config.signing_certificate.clone(),
            config.jwt_clock_skew_seconds,
        );

        Self {
            auth: Arc::new(AuthState {
                validator: Arc::new(validator),
                events,
            }),
            config,
        }
    }
}

/// Permissive CORS: any origin, header and method, with credentials.
///
/// Wildcards cannot be combined with credentials, so the request's own
/// origin, headers and method are echoed back instead.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_methods(AllowMethods::mirror_request())
        .allow_credentials(true)
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/health` and `/api/ping` - public
/// - `/api/secured/ping`, `/api/me`, `/api/admin/ping` - bearer token required
/// - Static files from `StaticFiles:Root` for anything else (404 if unset)
/// - CORS, TraceLayer and the configured request timeout
pub fn build_routes(state: Arc<AppState>) -> Router {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/ping", get(handlers::ping));

    // Protected routes (bearer token required)
    let protected_routes = Router::new()
        .route("/api/secured/ping", get(handlers::secured_ping))
        .route("/api/me", get(handlers::get_me))
        .route("/api/admin/ping", get(handlers::admin_ping))
        .route_layer(middleware::from_fn_with_state(
            state.auth.clone(),
            require_auth,
        ));

    let app = public_routes.merge(protected_routes);

    let app = match &state.config.static_files_dir {
        Some(dir) => app.fallback_service(ServeDir::new(dir)),
        None => app.fallback(not_found),
    };

    // Apply global middleware layers
    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer - Timeout the request (innermost)
    // 2. TraceLayer - Log request details
    // 3. CorsLayer - Answer preflights before authentication runs (outermost)
    app.layer(TimeoutLayer::new(Duration::from_secs(
        state.config.request_timeout_seconds,
    )))
    .layer(TraceLayer::new_for_http())
    .layer(cors_layer())
}

async fn not_found() -> ApiError {
    ApiError::NotFound("Route not found".to_string())
}
