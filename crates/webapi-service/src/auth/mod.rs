//! Authentication module for the WebApi service.
//!
//! Bearer tokens are validated against the identity provider's signing
//! certificate and turned into a claims identity.
//!
//! # Components
//!
//! - `certificate` - Signing certificate parsing (X.509 -> verification key)
//! - `claims` - JWT claims structure for validated tokens
//! - `events` - Lifecycle hooks run by the bearer middleware
//! - `identity` - Claims identity handed to handlers
//! - `jwt` - JWT validation

pub mod certificate;
pub mod claims;
pub mod events;
pub mod identity;
pub mod jwt;

pub use certificate::{CertificateError, SigningCertificate};
pub use claims::TokenClaims;
pub use events::{DefaultBearerEvents, JwtBearerEvents, RequestContext, TokenValidatedContext};
pub use identity::{Claim, ClaimsIdentity};
pub use jwt::{AuthError, JwtValidator};
