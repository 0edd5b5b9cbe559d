//! Test token signing.
//!
//! `TestSigner` owns a self-signed ECDSA P-256 certificate and signs ES256
//! tokens that the service accepts when configured with that certificate.

use base64::{engine::general_purpose::STANDARD, Engine};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use std::collections::HashMap;
use webapi_service::config::{
    AUTH0_CLIENT_ID, AUTH0_CLIENT_SECRET, AUTH0_DOMAIN, AUTH0_SIGNING_CERTIFICATE,
};

/// Tenant domain used by test configurations.
pub const TEST_DOMAIN: &str = "webapi-test.eu.auth0.com";

/// Client id (token audience) used by test configurations.
pub const TEST_CLIENT_ID: &str = "test-webapi-client";

/// Client secret used by test configurations.
pub const TEST_CLIENT_SECRET: &str = "test-webapi-secret";

/// Signs tokens with the private key of a throwaway certificate.
pub struct TestSigner {
    cert: rcgen::Certificate,
    key_pair: rcgen::KeyPair,
}

impl Default for TestSigner {
    fn default() -> Self {
        Self::new()
    }
}

impl TestSigner {
    /// Generate a new certificate and key.
    pub fn new() -> Self {
        let rcgen::CertifiedKey { cert, key_pair } =
            rcgen::generate_simple_self_signed(vec![TEST_DOMAIN.to_string()])
                .expect("Failed to generate test certificate");
        Self { cert, key_pair }
    }

    /// Certificate DER, base64-encoded as the provider dashboard exports it.
    pub fn certificate_base64(&self) -> String {
        STANDARD.encode(self.cert.der())
    }

    /// Certificate as PEM text.
    pub fn certificate_pem(&self) -> String {
        self.cert.pem()
    }

    /// Settings that configure the service to trust this signer.
    pub fn settings(&self) -> HashMap<String, String> {
        HashMap::from([
            (AUTH0_DOMAIN.to_string(), TEST_DOMAIN.to_string()),
            (AUTH0_CLIENT_ID.to_string(), TEST_CLIENT_ID.to_string()),
            (
                AUTH0_CLIENT_SECRET.to_string(),
                TEST_CLIENT_SECRET.to_string(),
            ),
            (
                AUTH0_SIGNING_CERTIFICATE.to_string(),
                self.certificate_base64(),
            ),
        ])
    }

    /// Claims the service accepts: right issuer and audience, valid for an hour.
    pub fn valid_claims(&self) -> Value {
        let now = chrono::Utc::now().timestamp();
        json!({
            "iss": format!("https://{TEST_DOMAIN}"),
            "sub": "auth0|test-user",
            "aud": TEST_CLIENT_ID,
            "iat": now,
            "exp": now + 3600,
        })
    }

    /// [`TestSigner::valid_claims`] with `overrides` merged on top.
    pub fn claims_with(&self, overrides: Value) -> Value {
        let mut claims = self.valid_claims();
        if let (Some(base), Value::Object(more)) = (claims.as_object_mut(), overrides) {
            base.extend(more);
        }
        claims
    }

    /// [`TestSigner::valid_claims`] with the named members removed.
    pub fn claims_without(&self, names: &[&str]) -> Value {
        let mut claims = self.valid_claims();
        if let Some(members) = claims.as_object_mut() {
            for name in names {
                members.remove(*name);
            }
        }
        claims
    }

    /// Sign `claims` as an ES256 JWT.
    pub fn sign(&self, claims: &Value) -> String {
        let key = EncodingKey::from_ec_der(&self.key_pair.serialize_der());
        let mut header = Header::new(Algorithm::ES256);
        header.typ = Some("JWT".to_string());
        encode(&header, claims, &key).expect("Failed to sign token")
    }
}
