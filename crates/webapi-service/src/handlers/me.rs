//! Current user handler.
//!
//! Returns the authenticated identity built by the bearer middleware.

use crate::auth::identity::ID_TOKEN_CLAIM_TYPE;
use crate::auth::{Claim, ClaimsIdentity};
use axum::{Extension, Json};
use serde::Serialize;
use tracing::instrument;

const MASKED: &str = "[REDACTED]";

/// Response for the `/api/me` endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct MeResponse {
    /// Subject (user id).
    pub sub: Option<String>,

    /// Display name, falling back to the subject.
    pub name: Option<String>,

    /// Roles derived from the token's permissions.
    pub roles: Vec<String>,

    /// Whether the raw token was attached to the identity.
    pub has_id_token: bool,

    /// All identity claims, with the `id_token` value masked.
    pub claims: Vec<Claim>,
}

/// Handler for GET /api/me
///
/// ## Response
///
/// ```json
/// {
///   "sub": "auth0|42",
///   "name": "Ada",
///   "roles": ["read:messages"],
///   "has_id_token": true,
///   "claims": [{"type": "sub", "value": "auth0|42"}, ...]
/// }
/// ```
#[instrument(skip_all, name = "webapi.handlers.me")]
pub async fn get_me(Extension(identity): Extension<ClaimsIdentity>) -> Json<MeResponse> {
    tracing::debug!(target: "webapi.handlers.me", "Returning identity claims");

    let claims = identity
        .claims()
        .iter()
        .map(|c| {
            if c.claim_type == ID_TOKEN_CLAIM_TYPE {
                Claim::new(ID_TOKEN_CLAIM_TYPE, MASKED)
            } else {
                c.clone()
            }
        })
        .collect();

    Json(MeResponse {
        sub: identity.subject().map(ToString::to_string),
        name: identity.name().map(ToString::to_string),
        roles: identity.roles().into_iter().map(ToString::to_string).collect(),
        has_id_token: identity.find_first(ID_TOKEN_CLAIM_TYPE).is_some(),
        claims,
    })
}
