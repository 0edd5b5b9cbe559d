//! Bearer authentication middleware for protected routes.
//!
//! Extracts the bearer token from the Authorization header, validates it
//! against the signing certificate, runs the lifecycle hooks and injects the
//! resulting [`ClaimsIdentity`] into request extensions.

use crate::auth::identity::BEARER_SCHEME;
use crate::auth::{
    AuthError, ClaimsIdentity, JwtBearerEvents, JwtValidator, RequestContext,
    TokenValidatedContext,
};
use crate::errors::ApiError;
use axum::{
    extract::Request,
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::instrument;

/// State for the authentication middleware.
#[derive(Clone)]
pub struct AuthState {
    /// JWT validator pinned to the signing certificate.
    pub validator: Arc<JwtValidator>,

    /// Lifecycle hooks.
    pub events: Arc<dyn JwtBearerEvents>,
}

/// Authentication middleware that validates bearer tokens.
///
/// # Authorization Header Format
///
/// ```text
/// Authorization: Bearer <token>
/// ```
///
/// The scheme is matched case-insensitively.
///
/// # Response
///
/// - Returns 401 Unauthorized with a `WWW-Authenticate` challenge if the
///   token is missing or invalid
/// - Continues to the next handler with the identity in extensions otherwise
///
/// A request that carries no bearer token is only challenged;
/// `on_authentication_failed` fires once a token was presented and rejected.
#[instrument(skip_all, name = "webapi.middleware.auth")]
pub async fn require_auth(
    State(state): State<Arc<AuthState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let context = RequestContext {
        method: req.method().clone(),
        uri: req.uri().clone(),
    };

    state.events.on_message_received(&context);

    match authenticate(&state, &context, req.headers()) {
        Ok(identity) => {
            req.extensions_mut().insert(identity);
            Ok(next.run(req).await)
        }
        Err(err) => {
            tracing::debug!(target: "webapi.middleware.auth", error = %err, "Rejecting request");
            if !matches!(err, AuthError::MissingToken | AuthError::InvalidScheme) {
                state.events.on_authentication_failed(&context, &err);
            }
            state.events.on_challenge(&context);
            Err(ApiError::from(err))
        }
    }
}

fn authenticate(
    state: &AuthState,
    context: &RequestContext,
    headers: &HeaderMap,
) -> Result<ClaimsIdentity, AuthError> {
    let token = extract_bearer_token(headers)?;
    state.events.on_token_received(context);

    let claims = state.validator.validate(token)?;
    let mut identity = ClaimsIdentity::from_token_claims(&claims);

    let mut validated = TokenValidatedContext {
        request: context,
        scheme: BEARER_SCHEME,
        token,
        claims: &claims,
        identity: &mut identity,
    };
    state.events.on_token_validated(&mut validated);

    Ok(identity)
}

/// Extract the token from `Authorization: Bearer <token>`.
///
/// The token is everything after the scheme and a single space.
///
/// # Errors
///
/// - `MissingToken` if the header is absent or the token is empty
/// - `InvalidScheme` if the header is not a Bearer credential
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::InvalidScheme)?;

    let (scheme, token) = value.split_once(' ').ok_or(AuthError::InvalidScheme)?;
    if !scheme.eq_ignore_ascii_case(BEARER_SCHEME) {
        return Err(AuthError::InvalidScheme);
    }
    if token.is_empty() {
        return Err(AuthError::MissingToken);
    }

    Ok(token)
}

/// Role-based authorization for handlers.
pub trait RequireRole {
    /// `Ok` if the identity holds `role`, `ApiError::Forbidden` otherwise.
    fn require_role(&self, role: &str) -> Result<(), ApiError>;
}

impl RequireRole for ClaimsIdentity {
    fn require_role(&self, role: &str) -> Result<(), ApiError> {
        if self.is_in_role(role) {
            Ok(())
        } else {
            tracing::debug!(target: "webapi.middleware.auth", role = %role, "Required role missing");
            Err(ApiError::Forbidden(format!("Requires role {role}")))
        }
    }
}
