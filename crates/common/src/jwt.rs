//! JWT utilities shared across WebApi crates.
//!
//! This module provides the token checks that run before or after the
//! cryptographic verification done by `jsonwebtoken`:
//! - Size limits for DoS prevention
//! - Clock skew constants for `exp`/`iat` leeway
//! - Algorithm extraction from the JWT header
//! - `iat` validation logic
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Header inspection never verifies anything; the token MUST still be
//!   verified against the trusted signing certificate
//! - Generic error messages prevent information leakage
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::{extract_alg, validate_iat, DEFAULT_CLOCK_SKEW};
//!
//! // Size check + header decode, before any signature work
//! let alg = extract_alg(token)?;
//!
//! // After signature verification, validate iat
//! validate_iat(claims.iat, DEFAULT_CLOCK_SKEW)?;
//! ```

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// Identity provider access tokens carrying a long `permissions` array are
/// typically 1-2KB. Tokens above this size are rejected before base64 decode
/// and signature verification.
pub const MAX_JWT_SIZE_BYTES: usize = 8192; // 8KB

/// Default JWT clock skew tolerance (5 minutes).
///
/// Applied as leeway to `exp`/`nbf` and as the future tolerance for `iat`.
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(300);

/// Maximum allowed JWT clock skew tolerance (10 minutes).
///
/// Configuration above this value is rejected at startup.
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during the pre/post verification checks.
///
/// Note: Error messages are intentionally generic to prevent information leakage.
/// Detailed information is logged at debug level for troubleshooting.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds maximum allowed.
    #[error("The access token is invalid or expired")]
    TokenTooLarge,

    /// Token format is invalid (not a valid JWT structure).
    #[error("The access token is invalid or expired")]
    MalformedToken,

    /// Token header is missing the `alg` field.
    #[error("The access token is invalid or expired")]
    MissingAlg,

    /// Token `iat` claim is too far in the future.
    #[error("The access token is invalid or expired")]
    IatTooFarInFuture,
}

// =============================================================================
// Functions
// =============================================================================

/// Reject tokens larger than [`MAX_JWT_SIZE_BYTES`].
///
/// # Errors
///
/// Returns `JwtValidationError::TokenTooLarge` when the token exceeds the limit.
pub fn check_token_size(token: &str) -> Result<(), JwtValidationError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }
    Ok(())
}

/// Extract the `alg` value from a JWT header without verifying the signature.
///
/// Used to reject tokens whose algorithm does not match the configured signing
/// certificate before any cryptographic work is done.
///
/// # Errors
///
/// - `TokenTooLarge` - Token exceeds `MAX_JWT_SIZE_BYTES`
/// - `MalformedToken` - Wrong structure, bad base64, or invalid JSON header
/// - `MissingAlg` - Header has no string `alg` field
pub fn extract_alg(token: &str) -> Result<String, JwtValidationError> {
    check_token_size(token)?;

    // JWT format: header.payload.signature
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        tracing::debug!(
            target: "common.jwt",
            parts = parts.len(),
            "Token rejected: invalid JWT format"
        );
        return Err(JwtValidationError::MalformedToken);
    }

    let header_part = parts.first().ok_or(JwtValidationError::MalformedToken)?;
    let header_bytes = URL_SAFE_NO_PAD.decode(header_part).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT header base64");
        JwtValidationError::MalformedToken
    })?;

    let header: serde_json::Value = serde_json::from_slice(&header_bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse JWT header JSON");
        JwtValidationError::MalformedToken
    })?;

    header
        .get("alg")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .ok_or(JwtValidationError::MissingAlg)
}

/// Validate the `iat` (issued-at) claim with clock skew tolerance.
///
/// Rejects tokens issued further in the future than `clock_skew`.
///
/// # Errors
///
/// Returns `JwtValidationError::IatTooFarInFuture` if the iat timestamp is more than
/// `clock_skew` in the future.
pub fn validate_iat(iat: i64, clock_skew: Duration) -> Result<(), JwtValidationError> {
    let now = chrono::Utc::now().timestamp();
    validate_iat_at(iat, clock_skew, now)
}

/// Deterministic `iat` validation against an explicit `now` timestamp.
pub(crate) fn validate_iat_at(
    iat: i64,
    clock_skew: Duration,
    now: i64,
) -> Result<(), JwtValidationError> {
    // Safe cast: clock_skew is bounded to MAX_CLOCK_SKEW (600 seconds), well within i64 range
    #[allow(clippy::cast_possible_wrap)]
    let clock_skew_secs = clock_skew.as_secs() as i64;
    let max_iat = now + clock_skew_secs;

    if iat > max_iat {
        tracing::debug!(
            target: "common.jwt",
            iat = iat,
            now = now,
            max_allowed = max_iat,
            clock_skew_secs = clock_skew_secs,
            "Token rejected: iat too far in the future"
        );
        return Err(JwtValidationError::IatTooFarInFuture);
    }

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn token_with_header(header: &str) -> String {
        format!("{}.payload.signature", URL_SAFE_NO_PAD.encode(header))
    }

    #[test]
    fn test_clock_skew_constants() {
        assert_eq!(DEFAULT_CLOCK_SKEW, Duration::from_secs(300));
        assert_eq!(MAX_CLOCK_SKEW, Duration::from_secs(600));
        assert!(DEFAULT_CLOCK_SKEW < MAX_CLOCK_SKEW);
    }

    // -------------------------------------------------------------------------
    // extract_alg Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_extract_alg_rs256() {
        let token = token_with_header(r#"{"alg":"RS256","typ":"JWT","kid":"abc"}"#);
        assert_eq!(extract_alg(&token).unwrap(), "RS256");
    }

    #[test]
    fn test_extract_alg_missing_alg() {
        let token = token_with_header(r#"{"typ":"JWT"}"#);
        assert_eq!(extract_alg(&token), Err(JwtValidationError::MissingAlg));
    }

    #[test]
    fn test_extract_alg_non_string_alg() {
        let token = token_with_header(r#"{"alg":256}"#);
        assert_eq!(extract_alg(&token), Err(JwtValidationError::MissingAlg));
    }

    #[test]
    fn test_extract_alg_malformed_token() {
        assert_eq!(
            extract_alg("not-a-jwt"),
            Err(JwtValidationError::MalformedToken)
        );
        assert_eq!(extract_alg(""), Err(JwtValidationError::MalformedToken));
        assert_eq!(
            extract_alg("a.b.c.d"),
            Err(JwtValidationError::MalformedToken)
        );
    }

    #[test]
    fn test_extract_alg_invalid_base64() {
        assert_eq!(
            extract_alg("!!!invalid!!!.payload.signature"),
            Err(JwtValidationError::MalformedToken)
        );
    }

    #[test]
    fn test_extract_alg_invalid_json() {
        let token = token_with_header("not-json");
        assert_eq!(extract_alg(&token), Err(JwtValidationError::MalformedToken));
    }

    #[test]
    fn test_extract_alg_oversized_token() {
        let oversized = "a".repeat(MAX_JWT_SIZE_BYTES + 1);
        assert_eq!(
            extract_alg(&oversized),
            Err(JwtValidationError::TokenTooLarge)
        );
    }

    #[test]
    fn test_check_token_size_at_limit() {
        let token = "a".repeat(MAX_JWT_SIZE_BYTES);
        assert!(check_token_size(&token).is_ok());
    }

    // -------------------------------------------------------------------------
    // validate_iat Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_validate_iat_in_past_is_accepted() {
        let now = 1_700_000_000;
        assert!(validate_iat_at(now - 3600, DEFAULT_CLOCK_SKEW, now).is_ok());
    }

    #[test]
    fn test_validate_iat_within_skew_is_accepted() {
        let now = 1_700_000_000;
        assert!(validate_iat_at(now + 300, DEFAULT_CLOCK_SKEW, now).is_ok());
    }

    #[test]
    fn test_validate_iat_beyond_skew_is_rejected() {
        let now = 1_700_000_000;
        assert_eq!(
            validate_iat_at(now + 301, DEFAULT_CLOCK_SKEW, now),
            Err(JwtValidationError::IatTooFarInFuture)
        );
    }

    #[test]
    fn test_error_messages_are_generic() {
        for err in [
            JwtValidationError::TokenTooLarge,
            JwtValidationError::MalformedToken,
            JwtValidationError::MissingAlg,
            JwtValidationError::IatTooFarInFuture,
        ] {
            assert_eq!(err.to_string(), "The access token is invalid or expired");
        }
    }
}
