//! JWT claims structure.
//!
//! Typed view over a validated access token payload. Registered claims are
//! named fields; everything else the identity provider adds (custom
//! namespaced claims, `scope`, `azp`, ...) is kept in `extra`. The `sub` field
//! is redacted in Debug output to prevent exposure in logs.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A claim that may be a single string or an array of strings (`aud`,
/// `permissions`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    Single(String),
    Multiple(Vec<String>),
}

impl Default for OneOrMany {
    fn default() -> Self {
        OneOrMany::Multiple(Vec::new())
    }
}

impl OneOrMany {
    /// All values in token order.
    pub fn values(&self) -> Vec<&str> {
        match self {
            OneOrMany::Single(value) => vec![value.as_str()],
            OneOrMany::Multiple(values) => values.iter().map(String::as_str).collect(),
        }
    }
}

/// Claims of a validated access token.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Issuer (`https://{domain}`).
    pub iss: String,

    /// Subject (user id) - redacted in Debug output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Audience(s).
    pub aud: OneOrMany,

    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,

    /// Issued-at timestamp (Unix epoch seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Not-before timestamp (Unix epoch seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,

    /// Permissions granted by the identity provider's RBAC.
    #[serde(default)]
    pub permissions: OneOrMany,

    /// Remaining payload members.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl fmt::Debug for TokenClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenClaims")
            .field("iss", &self.iss)
            .field("sub", &self.sub.as_ref().map(|_| "[REDACTED]"))
            .field("aud", &self.aud)
            .field("exp", &self.exp)
            .field("iat", &self.iat)
            .field("nbf", &self.nbf)
            .field("permissions", &self.permissions)
            .field("extra_claims", &self.extra.len())
            .finish()
    }
}
