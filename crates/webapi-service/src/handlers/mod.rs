//! HTTP request handlers for the WebApi service.

pub mod health;
pub mod me;
pub mod ping;

pub use health::health_check;
pub use me::get_me;
pub use ping::{admin_ping, ping, secured_ping};
