//! WebApi Service Library
//!
//! A small HTTP API protected by bearer tokens from an external identity
//! provider (Auth0). Tokens are verified against a single configured X.509
//! signing certificate; no discovery or key fetching happens at runtime.
//!
//! # Request pipeline
//!
//! ```text
//! CorsLayer -> TraceLayer -> TimeoutLayer -> require_auth (protected routes) -> handlers
//! ```
//!
//! # Modules
//!
//! - `auth` - Certificate parsing, JWT validation, claims identity, lifecycle hooks
//! - `config` - Settings file + environment configuration
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - Bearer authentication middleware
//! - `routes` - Axum router setup

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod routes;
