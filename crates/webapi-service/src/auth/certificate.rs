//! Signing certificate handling.
//!
//! The identity provider signs access tokens with the private key behind a
//! single X.509 certificate. The certificate is supplied as a setting (base64
//! DER as exported by the provider dashboard, base64 PEM, or raw PEM text) and
//! is parsed once at startup. Only the SubjectPublicKeyInfo is used; chain
//! building and revocation are out of scope.

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine};
use jsonwebtoken::{Algorithm, DecodingKey};
use std::fmt;
use thiserror::Error;
use x509_parser::pem::parse_x509_pem;
use x509_parser::prelude::parse_x509_certificate;
use x509_parser::public_key::PublicKey;

/// Uncompressed SEC1 point lengths (0x04 || X || Y).
const P256_POINT_LEN: usize = 65;
const P384_POINT_LEN: usize = 97;

const PEM_CERTIFICATE_LABEL: &str = "CERTIFICATE";

/// Errors raised while turning the certificate setting into a verification key.
#[derive(Debug, Error)]
pub enum CertificateError {
    #[error("certificate is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("certificate could not be parsed: {0}")]
    Parse(String),

    #[error("unsupported certificate key: {0}")]
    UnsupportedKey(String),
}

/// Verification material extracted from the configured signing certificate.
#[derive(Clone)]
pub struct SigningCertificate {
    decoding_key: DecodingKey,
    algorithms: Vec<Algorithm>,
    subject: String,
    thumbprint: String,
    not_after: i64,
}

impl fmt::Debug for SigningCertificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningCertificate")
            .field("subject", &self.subject)
            .field("thumbprint", &self.thumbprint)
            .field("algorithms", &self.algorithms)
            .field("not_after", &self.not_after)
            .finish_non_exhaustive()
    }
}

impl SigningCertificate {
    /// Build from the raw setting value.
    ///
    /// Accepts PEM text, base64-encoded PEM, or base64-encoded DER.
    ///
    /// # Errors
    ///
    /// - `Base64` if the setting is neither PEM nor valid base64
    /// - `Parse` if the decoded bytes are not an X.509 certificate
    /// - `UnsupportedKey` if the public key is not RSA, P-256 or P-384
    pub fn from_setting(setting: &str) -> Result<Self, CertificateError> {
        let trimmed = setting.trim();
        let der = if trimmed.starts_with("-----BEGIN") {
            pem_to_der(trimmed.as_bytes())?
        } else {
            let normalized: String = trimmed
                .chars()
                .filter(|c| !c.is_whitespace())
                .map(|c| match c {
                    '-' => '+',
                    '_' => '/',
                    other => other,
                })
                .collect();
            let decoded = STANDARD_NO_PAD.decode(normalized.trim_end_matches('='))?;

            if decoded.starts_with(b"-----BEGIN") {
                pem_to_der(&decoded)?
            } else {
                decoded
            }
        };

        Self::from_der(&der)
    }

    /// Build from DER-encoded certificate bytes.
    ///
    /// # Errors
    ///
    /// See [`SigningCertificate::from_setting`].
    pub fn from_der(der: &[u8]) -> Result<Self, CertificateError> {
        let (_, cert) =
            parse_x509_certificate(der).map_err(|e| CertificateError::Parse(e.to_string()))?;

        let spki = cert.public_key();
        let key_bytes: &[u8] = &spki.subject_public_key.data;

        let (decoding_key, algorithms) = match spki.parsed() {
            Ok(PublicKey::RSA(_)) => (
                DecodingKey::from_rsa_der(key_bytes),
                vec![Algorithm::RS256, Algorithm::RS384, Algorithm::RS512],
            ),
            Ok(PublicKey::EC(_)) => match key_bytes.len() {
                P256_POINT_LEN => (DecodingKey::from_ec_der(key_bytes), vec![Algorithm::ES256]),
                P384_POINT_LEN => (DecodingKey::from_ec_der(key_bytes), vec![Algorithm::ES384]),
                other => {
                    return Err(CertificateError::UnsupportedKey(format!(
                        "EC point of {other} bytes (expected P-256 or P-384, uncompressed)"
                    )))
                }
            },
            Ok(_) => {
                return Err(CertificateError::UnsupportedKey(format!(
                    "key algorithm {}",
                    spki.algorithm.algorithm
                )))
            }
            Err(e) => return Err(CertificateError::Parse(e.to_string())),
        };

        let digest = ring::digest::digest(&ring::digest::SHA1_FOR_LEGACY_USE_ONLY, der);

        Ok(Self {
            decoding_key,
            algorithms,
            subject: cert.subject().to_string(),
            thumbprint: hex::encode_upper(digest.as_ref()),
            not_after: cert.validity().not_after.timestamp(),
        })
    }

    /// Key used to verify token signatures.
    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }

    /// Token algorithms the certificate key can verify.
    pub fn algorithms(&self) -> &[Algorithm] {
        &self.algorithms
    }

    /// Certificate subject distinguished name.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Upper-case hex SHA-1 of the DER certificate. For logging only.
    pub fn thumbprint(&self) -> &str {
        &self.thumbprint
    }

    /// Certificate `notAfter` as Unix seconds.
    pub fn not_after(&self) -> i64 {
        self.not_after
    }
}

fn pem_to_der(pem: &[u8]) -> Result<Vec<u8>, CertificateError> {
    let (_, pem) = parse_x509_pem(pem).map_err(|e| CertificateError::Parse(e.to_string()))?;

    if pem.label != PEM_CERTIFICATE_LABEL {
        return Err(CertificateError::Parse(format!(
            "expected PEM label {PEM_CERTIFICATE_LABEL}, got {}",
            pem.label
        )));
    }

    Ok(pem.contents)
}
