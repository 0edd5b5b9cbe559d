//! # WebApi Test Utilities
//!
//! Shared test utilities for the WebApi service.
//!
//! This crate provides:
//! - Token signing with a throwaway certificate (`TestSigner`)
//! - Server test harness (`TestWebApiServer` for E2E tests)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use webapi_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> anyhow::Result<()> {
//!     let signer = TestSigner::new();
//!     let server = TestWebApiServer::spawn(&signer).await?;
//!
//!     let response = reqwest::Client::new()
//!         .get(format!("{}/api/me", server.url()))
//!         .bearer_auth(signer.sign(&signer.valid_claims()))
//!         .send()
//!         .await?;
//!
//!     assert_eq!(response.status(), 200);
//!     Ok(())
//! }
//! ```

pub mod server_harness;
pub mod token_signer;

// Re-export commonly used items
pub use server_harness::*;
pub use token_signer::*;
