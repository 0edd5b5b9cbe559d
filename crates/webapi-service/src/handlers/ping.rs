//! Ping endpoints at each protection level.
//!
//! `/api/ping` is public, `/api/secured/ping` requires a valid bearer token
//! and `/api/admin/ping` additionally requires the admin role.

use crate::auth::ClaimsIdentity;
use crate::errors::ApiError;
use crate::middleware::RequireRole;
use axum::{Extension, Json};
use serde::Serialize;
use tracing::instrument;

/// Role required by [`admin_ping`].
pub const ADMIN_ROLE: &str = "read:admin";

/// Response body for the ping endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct PingResponse {
    pub message: String,

    /// Subject of the caller, for authenticated pings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}

/// Handler for GET /api/ping
#[instrument(skip_all, name = "webapi.handlers.ping")]
pub async fn ping() -> Json<PingResponse> {
    Json(PingResponse {
        message: "All good. You don't need to be authenticated to call this.".to_string(),
        subject: None,
    })
}

/// Handler for GET /api/secured/ping
#[instrument(skip_all, name = "webapi.handlers.secured_ping")]
pub async fn secured_ping(Extension(identity): Extension<ClaimsIdentity>) -> Json<PingResponse> {
    Json(PingResponse {
        message: "All good. You only get this message if you are authenticated.".to_string(),
        subject: identity.subject().map(ToString::to_string),
    })
}

/// Handler for GET /api/admin/ping
///
/// Returns 403 unless the token carried the `read:admin` permission.
#[instrument(skip_all, name = "webapi.handlers.admin_ping")]
pub async fn admin_ping(
    Extension(identity): Extension<ClaimsIdentity>,
) -> Result<Json<PingResponse>, ApiError> {
    identity.require_role(ADMIN_ROLE)?;

    Ok(Json(PingResponse {
        message: "All good. You only get this message if you hold the admin role.".to_string(),
        subject: identity.subject().map(ToString::to_string),
    }))
}
