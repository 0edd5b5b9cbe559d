//! JWT validation for the WebApi service.
//!
//! Validates bearer tokens issued by the identity provider against the single
//! configured signing certificate.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Only algorithms matching the certificate key type are accepted
//! - Signature, lifetime, audience and issuer are all validated
//! - `iat` is validated with the same clock skew tolerance as `exp`
//! - Failure reasons are logged; clients only see a generic message

use crate::auth::certificate::SigningCertificate;
use crate::auth::claims::TokenClaims;
use crate::config::Auth0Settings;
use common::jwt::{extract_alg, validate_iat, JwtValidationError};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, Validation};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::instrument;

/// Why a request failed bearer authentication.
///
/// The `Display` text is for server-side logs. Responses use
/// [`AuthError::client_message`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("missing Authorization header")]
    MissingToken,

    #[error("Authorization header is not a Bearer credential")]
    InvalidScheme,

    #[error("token exceeds maximum size")]
    TokenTooLarge,

    #[error("token is malformed: {0}")]
    Malformed(String),

    #[error("token algorithm {0} is not allowed for the signing certificate")]
    AlgorithmNotAllowed(String),

    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("token has expired")]
    Expired,

    #[error("token is not yet valid")]
    NotYetValid,

    #[error("token audience does not match")]
    InvalidAudience,

    #[error("token issuer does not match")]
    InvalidIssuer,

    #[error("token iat is too far in the future")]
    IatInFuture,
}

impl AuthError {
    /// Message safe to return to clients.
    pub fn client_message(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "Missing Authorization header",
            AuthError::InvalidScheme => "Invalid Authorization header format",
            _ => "The access token is invalid or expired",
        }
    }
}

impl From<JwtValidationError> for AuthError {
    fn from(err: JwtValidationError) -> Self {
        match err {
            JwtValidationError::TokenTooLarge => AuthError::TokenTooLarge,
            JwtValidationError::MalformedToken => AuthError::Malformed("invalid structure".into()),
            JwtValidationError::MissingAlg => AuthError::Malformed("missing alg".into()),
            JwtValidationError::IatTooFarInFuture => AuthError::IatInFuture,
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidSignature => AuthError::InvalidSignature,
            ErrorKind::ExpiredSignature => AuthError::Expired,
            ErrorKind::ImmatureSignature => AuthError::NotYetValid,
            ErrorKind::InvalidAudience => AuthError::InvalidAudience,
            ErrorKind::InvalidIssuer => AuthError::InvalidIssuer,
            ErrorKind::InvalidAlgorithm => AuthError::AlgorithmNotAllowed("mismatch".into()),
            ErrorKind::MissingRequiredClaim(claim) => {
                AuthError::Malformed(format!("missing required claim {claim}"))
            }
            other => AuthError::Malformed(format!("{other:?}")),
        }
    }
}

/// JWT validator pinned to the identity provider's signing certificate.
pub struct JwtValidator {
    certificate: SigningCertificate,
    validation: Validation,
    clock_skew: Duration,
}

impl JwtValidator {
    /// Create a validator expecting `aud == client_id` and
    /// `iss == https://{domain}`.
    ///
    /// # Arguments
    ///
    /// * `settings` - Identity provider settings
    /// * `certificate` - Parsed signing certificate
    /// * `clock_skew_seconds` - Leeway for `exp`/`nbf` and tolerance for `iat`
    pub fn new(
        settings: &Auth0Settings,
        certificate: SigningCertificate,
        clock_skew_seconds: i64,
    ) -> Self {
        let leeway = u64::try_from(clock_skew_seconds).unwrap_or(0);

        let mut validation = Validation::new(
            certificate
                .algorithms()
                .first()
                .copied()
                .unwrap_or(Algorithm::RS256),
        );
        validation.algorithms = certificate.algorithms().to_vec();
        validation.leeway = leeway;
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.set_audience(&[settings.audience()]);
        validation.set_issuer(&[settings.authority()]);
        validation.set_required_spec_claims(&["exp", "aud", "iss"]);

        Self {
            certificate,
            validation,
            clock_skew: Duration::from_secs(leeway),
        }
    }

    /// Validate a JWT and return its claims.
    ///
    /// # Checks
    ///
    /// 1. Size check - reject tokens > 8KB before parsing
    /// 2. Header `alg` must be one the certificate key can verify
    /// 3. Signature against the certificate public key
    /// 4. `exp` (required) and `nbf` with clock skew leeway
    /// 5. `aud` and `iss`
    /// 6. `iat`, when present, with clock skew tolerance
    ///
    /// # Errors
    ///
    /// Returns the specific `AuthError` for logging; callers must only expose
    /// [`AuthError::client_message`].
    #[instrument(skip_all, name = "webapi.auth.jwt.validate")]
    pub fn validate(&self, token: &str) -> Result<TokenClaims, AuthError> {
        // 1 + 2. Size and header checks before any cryptographic work
        let alg = extract_alg(token).map_err(|e| {
            tracing::debug!(target: "webapi.auth.jwt", error = ?e, "Token header inspection failed");
            AuthError::from(e)
        })?;

        let alg_allowed = Algorithm::from_str(&alg)
            .map(|a| self.certificate.algorithms().contains(&a))
            .unwrap_or(false);
        if !alg_allowed {
            tracing::debug!(target: "webapi.auth.jwt", alg = %alg, "Token algorithm not allowed");
            return Err(AuthError::AlgorithmNotAllowed(alg));
        }

        // 3-5. Signature, lifetime, audience, issuer
        let token_data = decode::<TokenClaims>(
            token,
            self.certificate.decoding_key(),
            &self.validation,
        )
        .map_err(|e| {
            tracing::debug!(target: "webapi.auth.jwt", error = %e, "Token verification failed");
            AuthError::from(e)
        })?;

        // 6. iat is optional (RFC 7519 4.1.6); bound it only when present
        if let Some(iat) = token_data.claims.iat {
            validate_iat(iat, self.clock_skew).map_err(|e| {
                tracing::debug!(target: "webapi.auth.jwt", error = ?e, "Token iat validation failed");
                AuthError::from(e)
            })?;
        }

        tracing::debug!(target: "webapi.auth.jwt", "Token validated successfully");
        Ok(token_data.claims)
    }
}
