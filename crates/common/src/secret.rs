//! Secret types for values that must never reach the logs.
//!
//! Re-exports the [`secrecy`] types. `SecretString` implements `Debug` with
//! redaction, so any settings struct that derives `Debug` stays safe to print.
//!
//! Use `SecretString` for the identity provider client secret and for raw
//! bearer tokens that are held longer than a single request.
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct ProviderCredentials {
//!     client_id: String,
//!     client_secret: SecretString,
//! }
//!
//! let creds = ProviderCredentials {
//!     client_id: "abc123".to_string(),
//!     client_secret: SecretString::from("s3cr3t"),
//! };
//!
//! assert!(!format!("{creds:?}").contains("s3cr3t"));
//! assert_eq!(creds.client_secret.expose_secret(), "s3cr3t");
//! ```

pub use secrecy::{ExposeSecret, SecretString};
