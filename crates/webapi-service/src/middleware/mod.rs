//! Middleware for the WebApi service.
//!
//! # Components
//!
//! - `auth` - Bearer authentication middleware for protected routes

pub mod auth;

pub use auth::{require_auth, AuthState, RequireRole};
