//! Liveness probe.

use tracing::instrument;

/// Handler for GET /health
///
/// The service has no external dependencies at request time (the signing
/// certificate is loaded at startup), so liveness is unconditional.
#[instrument(skip_all, name = "webapi.health.check")]
pub async fn health_check() -> &'static str {
    "OK"
}
