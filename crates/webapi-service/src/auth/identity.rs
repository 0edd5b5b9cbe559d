//! Claims identity for authenticated requests.
//!
//! A flat, ordered list of `(type, value)` claims built from a validated token.
//! Lifecycle hooks may append claims (e.g. `id_token`, roles) before the
//! identity is handed to handlers through request extensions.

use crate::auth::claims::TokenClaims;
use serde::Serialize;
use serde_json::Value;

/// Claim type for the raw bearer token.
pub const ID_TOKEN_CLAIM_TYPE: &str = "id_token";

/// Claim type for roles used by authorization checks.
pub const ROLE_CLAIM_TYPE: &str = "role";

/// Claim type the identity provider uses for RBAC permissions.
pub const PERMISSIONS_CLAIM_TYPE: &str = "permissions";

/// Authentication scheme for identities produced by the bearer middleware.
pub const BEARER_SCHEME: &str = "Bearer";

/// A single claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Claim {
    #[serde(rename = "type")]
    pub claim_type: String,
    pub value: String,
}

impl Claim {
    pub fn new(claim_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            claim_type: claim_type.into(),
            value: value.into(),
        }
    }
}

/// The authenticated principal's claims.
#[derive(Clone, PartialEq, Eq)]
pub struct ClaimsIdentity {
    authentication_scheme: String,
    claims: Vec<Claim>,
}

/// Claim values are mostly user data; Debug lists claim types only.
impl std::fmt::Debug for ClaimsIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let types: Vec<&str> = self.claims.iter().map(|c| c.claim_type.as_str()).collect();
        f.debug_struct("ClaimsIdentity")
            .field("authentication_scheme", &self.authentication_scheme)
            .field("claim_types", &types)
            .finish()
    }
}

impl ClaimsIdentity {
    /// Create an empty identity for `authentication_scheme`.
    pub fn new(authentication_scheme: impl Into<String>) -> Self {
        Self {
            authentication_scheme: authentication_scheme.into(),
            claims: Vec::new(),
        }
    }

    /// Build a bearer identity from validated token claims.
    ///
    /// Registered claims come first in a fixed order, then the remaining
    /// payload members. Arrays yield one claim per element,
    /// objects are kept as compact JSON and `null` values are skipped.
    pub fn from_token_claims(token: &TokenClaims) -> Self {
        let mut identity = Self::new(BEARER_SCHEME);

        identity.add_claim(Claim::new("iss", token.iss.as_str()));
        if let Some(sub) = &token.sub {
            identity.add_claim(Claim::new("sub", sub.as_str()));
        }
        for aud in token.aud.values() {
            identity.add_claim(Claim::new("aud", aud));
        }
        identity.add_claim(Claim::new("exp", token.exp.to_string()));
        if let Some(iat) = token.iat {
            identity.add_claim(Claim::new("iat", iat.to_string()));
        }
        if let Some(nbf) = token.nbf {
            identity.add_claim(Claim::new("nbf", nbf.to_string()));
        }
        for permission in token.permissions.values() {
            identity.add_claim(Claim::new(PERMISSIONS_CLAIM_TYPE, permission));
        }
        for (name, value) in &token.extra {
            identity.add_json_claim(name, value);
        }

        identity
    }

    fn add_json_claim(&mut self, name: &str, value: &Value) {
        match value {
            Value::Null => {}
            Value::String(s) => self.add_claim(Claim::new(name, s.as_str())),
            Value::Bool(_) | Value::Number(_) | Value::Object(_) => {
                self.add_claim(Claim::new(name, value.to_string()));
            }
            Value::Array(items) => {
                for item in items {
                    // Nested arrays are flattened as JSON rather than recursed.
                    match item {
                        Value::Array(_) => self.add_claim(Claim::new(name, item.to_string())),
                        _ => self.add_json_claim(name, item),
                    }
                }
            }
        }
    }

    pub fn authentication_scheme(&self) -> &str {
        &self.authentication_scheme
    }

    pub fn is_authenticated(&self) -> bool {
        !self.authentication_scheme.is_empty()
    }

    pub fn claims(&self) -> &[Claim] {
        &self.claims
    }

    pub fn add_claim(&mut self, claim: Claim) {
        self.claims.push(claim);
    }

    /// All claims of `claim_type`, in insertion order.
    pub fn find_all<'a>(&'a self, claim_type: &'a str) -> impl Iterator<Item = &'a Claim> + 'a {
        self.claims.iter().filter(move |c| c.claim_type == claim_type)
    }

    pub fn find_first(&self, claim_type: &str) -> Option<&Claim> {
        self.claims.iter().find(|c| c.claim_type == claim_type)
    }

    pub fn has_claim(&self, claim_type: &str, value: &str) -> bool {
        self.find_all(claim_type).any(|c| c.value == value)
    }

    /// Role claim values.
    pub fn roles(&self) -> Vec<&str> {
        self.find_all(ROLE_CLAIM_TYPE)
            .map(|c| c.value.as_str())
            .collect()
    }

    pub fn is_in_role(&self, role: &str) -> bool {
        self.has_claim(ROLE_CLAIM_TYPE, role)
    }

    pub fn subject(&self) -> Option<&str> {
        self.find_first("sub").map(|c| c.value.as_str())
    }

    /// Display name: the `name` claim, falling back to `sub`.
    pub fn name(&self) -> Option<&str> {
        self.find_first("name")
            .map(|c| c.value.as_str())
            .or_else(|| self.subject())
    }
}
