//! CORS integration tests.
//!
//! Any origin may call the API with credentials; preflights echo back what
//! the browser asked for.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::Result;
use reqwest::Method;
use webapi_test_utils::{TestSigner, TestWebApiServer};

#[tokio::test]
async fn test_preflight_from_any_origin_reflects_request() -> Result<()> {
    let signer = TestSigner::new();
    let server = TestWebApiServer::spawn(&signer).await?;

    for origin in ["https://app.example.com", "http://localhost:3000"] {
        let response = reqwest::Client::new()
            .request(Method::OPTIONS, format!("{}/api/secured/ping", server.url()))
            .header("Origin", origin)
            .header("Access-Control-Request-Method", "PUT")
            .header("Access-Control-Request-Headers", "authorization,x-custom-header")
            .send()
            .await?;

        assert_eq!(response.status(), 200);
        let headers = response.headers();
        assert_eq!(headers["access-control-allow-origin"], origin);
        assert_eq!(headers["access-control-allow-credentials"], "true");
        assert_eq!(headers["access-control-allow-methods"], "PUT");
        assert_eq!(
            headers["access-control-allow-headers"],
            "authorization,x-custom-header"
        );
    }
    Ok(())
}

#[tokio::test]
async fn test_actual_request_carries_cors_headers() -> Result<()> {
    let signer = TestSigner::new();
    let server = TestWebApiServer::spawn(&signer).await?;

    let response = reqwest::Client::new()
        .get(format!("{}/api/ping", server.url()))
        .header("Origin", "https://app.example.com")
        .send()
        .await?;

    assert_eq!(response.status(), 200);
    let headers = response.headers();
    assert_eq!(
        headers["access-control-allow-origin"],
        "https://app.example.com"
    );
    assert_eq!(headers["access-control-allow-credentials"], "true");
    Ok(())
}

#[tokio::test]
async fn test_rejected_request_still_carries_cors_headers() -> Result<()> {
    let signer = TestSigner::new();
    let server = TestWebApiServer::spawn(&signer).await?;

    let response = reqwest::Client::new()
        .get(format!("{}/api/me", server.url()))
        .header("Origin", "https://app.example.com")
        .send()
        .await?;

    assert_eq!(response.status(), 401);
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "https://app.example.com"
    );
    Ok(())
}
