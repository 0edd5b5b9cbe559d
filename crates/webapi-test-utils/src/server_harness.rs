//! Test server harness for E2E testing
//!
//! Provides `TestWebApiServer` for spawning real WebApi server instances in tests.

use crate::token_signer::TestSigner;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use webapi_service::auth::JwtBearerEvents;
use webapi_service::config::Config;
use webapi_service::routes::{self, AppState};

/// Test harness for spawning the WebApi server in E2E tests.
pub struct TestWebApiServer {
    addr: SocketAddr,
    config: Config,
    _handle: JoinHandle<()>,
}

impl TestWebApiServer {
    /// Spawn a server that trusts `signer`.
    pub async fn spawn(signer: &TestSigner) -> Result<Self, anyhow::Error> {
        Self::spawn_with(signer.settings(), None).await
    }

    /// Spawn a server from explicit settings and, optionally, custom hooks.
    ///
    /// The server will:
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Start the HTTP server in the background
    pub async fn spawn_with(
        settings: HashMap<String, String>,
        events: Option<Arc<dyn JwtBearerEvents>>,
    ) -> Result<Self, anyhow::Error> {
        let config = Config::from_vars(&settings)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let state = match events {
            Some(events) => AppState::with_events(config.clone(), events),
            None => AppState::new(config.clone()),
        };

        // Build routes using the service's real route builder
        let app = routes::build_routes(Arc::new(state));

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        // Spawn server in background
        let handle = tokio::spawn(async move {
            let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, make_service).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            config,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get reference to the server configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Drop for TestWebApiServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}
