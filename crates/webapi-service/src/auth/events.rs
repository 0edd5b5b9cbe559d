//! Bearer authentication lifecycle hooks.
//!
//! The middleware calls these hooks at fixed points of each request. Every
//! hook completes immediately and none of them can change the outcome of
//! authentication; they exist for logging and for enriching the identity of
//! an already-validated token.
//!
//! Order for a successful request:
//! `on_message_received` -> `on_token_received` -> `on_token_validated`.
//!
//! Order for a rejected token:
//! `on_message_received` -> `on_token_received` -> `on_authentication_failed`
//! -> `on_challenge`.
//!
//! A request without a bearer token only gets
//! `on_message_received` -> `on_challenge`.

use crate::auth::claims::TokenClaims;
use crate::auth::identity::{
    Claim, ClaimsIdentity, ID_TOKEN_CLAIM_TYPE, PERMISSIONS_CLAIM_TYPE, ROLE_CLAIM_TYPE,
};
use crate::auth::jwt::AuthError;
use axum::http::{Method, Uri};

/// Request details visible to hooks.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    pub uri: Uri,
}

/// Context for [`JwtBearerEvents::on_token_validated`].
pub struct TokenValidatedContext<'a> {
    pub request: &'a RequestContext,
    /// Authentication scheme the token was presented with.
    pub scheme: &'a str,
    /// The raw bearer token (Authorization header value after the scheme).
    pub token: &'a str,
    pub claims: &'a TokenClaims,
    /// Identity handed to handlers; hooks may add claims.
    pub identity: &'a mut ClaimsIdentity,
}

/// Hooks invoked by [`crate::middleware::require_auth`].
pub trait JwtBearerEvents: Send + Sync {
    /// A request reached the bearer middleware, before any header parsing.
    fn on_message_received(&self, request: &RequestContext) {
        log_message_received(request);
    }

    /// A bearer token was extracted from the Authorization header.
    fn on_token_received(&self, request: &RequestContext) {
        log_token_received(request);
    }

    /// The token passed validation.
    fn on_token_validated(&self, context: &mut TokenValidatedContext<'_>) {
        add_id_token_claim(context);
        add_permission_roles(context.identity);
    }

    /// A presented bearer token was rejected.
    fn on_authentication_failed(&self, request: &RequestContext, error: &AuthError) {
        log_authentication_failed(request, error);
    }

    /// A 401 challenge is about to be returned.
    fn on_challenge(&self, request: &RequestContext) {
        log_challenge(request);
    }
}

/// The stock hooks: log every stage, add `id_token` and role claims.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultBearerEvents;

impl JwtBearerEvents for DefaultBearerEvents {}

pub fn log_message_received(request: &RequestContext) {
    tracing::info!(
        target: "webapi.auth.events",
        method = %request.method,
        path = %request.uri.path(),
        "Receiving token"
    );
}

pub fn log_token_received(request: &RequestContext) {
    tracing::info!(
        target: "webapi.auth.events",
        method = %request.method,
        path = %request.uri.path(),
        "Token received"
    );
}

pub fn log_authentication_failed(request: &RequestContext, error: &AuthError) {
    tracing::error!(
        target: "webapi.auth.events",
        method = %request.method,
        path = %request.uri.path(),
        error = %error,
        "Authentication failed"
    );
}

pub fn log_challenge(request: &RequestContext) {
    tracing::info!(
        target: "webapi.auth.events",
        method = %request.method,
        path = %request.uri.path(),
        "Issuing bearer challenge"
    );
}

/// Add the raw bearer token as an `id_token` claim.
pub fn add_id_token_claim(context: &mut TokenValidatedContext<'_>) {
    context
        .identity
        .add_claim(Claim::new(ID_TOKEN_CLAIM_TYPE, context.token));
}

/// Add one role claim per `permissions` claim.
pub fn add_permission_roles(identity: &mut ClaimsIdentity) {
    let roles: Vec<String> = identity
        .find_all(PERMISSIONS_CLAIM_TYPE)
        .map(|c| c.value.clone())
        .collect();

    for role in roles {
        identity.add_claim(Claim::new(ROLE_CLAIM_TYPE, role));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::auth::identity::BEARER_SCHEME;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn request() -> RequestContext {
        RequestContext {
            method: Method::GET,
            uri: Uri::from_static("/api/secured/ping"),
        }
    }

    fn token_claims() -> TokenClaims {
        serde_json::from_value(serde_json::json!({
            "iss": "https://tenant.example.com",
            "sub": "auth0|42",
            "aud": "client-1",
            "exp": 1_900_000_000,
            "iat": 1_800_000_000,
            "permissions": ["read:messages", "read:admin"]
        }))
        .unwrap()
    }

    #[test]
    fn test_default_on_token_validated_adds_id_token_and_roles() {
        let claims = token_claims();
        let mut identity = ClaimsIdentity::from_token_claims(&claims);
        let request = request();

        let mut context = TokenValidatedContext {
            request: &request,
            scheme: BEARER_SCHEME,
            token: "header.payload.signature",
            claims: &claims,
            identity: &mut identity,
        };
        DefaultBearerEvents.on_token_validated(&mut context);

        assert_eq!(
            identity.find_first(ID_TOKEN_CLAIM_TYPE).unwrap().value,
            "header.payload.signature"
        );
        assert_eq!(identity.roles(), vec!["read:messages", "read:admin"]);
    }

    #[test]
    fn test_no_permissions_means_no_roles() {
        let mut identity = ClaimsIdentity::new(BEARER_SCHEME);
        add_permission_roles(&mut identity);
        assert!(identity.roles().is_empty());
    }

    #[test]
    fn test_custom_events_override_single_hook() {
        #[derive(Default)]
        struct CountingEvents {
            challenges: AtomicUsize,
        }

        impl JwtBearerEvents for CountingEvents {
            fn on_challenge(&self, _request: &RequestContext) {
                self.challenges.fetch_add(1, Ordering::SeqCst);
            }
        }

        let events = CountingEvents::default();
        events.on_challenge(&request());
        events.on_challenge(&request());
        events.on_message_received(&request());

        assert_eq!(events.challenges.load(Ordering::SeqCst), 2);
    }
}
