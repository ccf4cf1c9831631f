//! End-to-end tests: client → proxy (ExtractCn) → echo backend.

use std::collections::HashMap;
use std::time::Duration;

mod common;

const CERT_INFO: &str = "X-Forwarded-Tls-Client-Cert-Info";

async fn echoed(req: reqwest::RequestBuilder) -> HashMap<String, String> {
    let res = req.send().await.expect("Proxy unreachable");
    assert_eq!(res.status(), 200);
    res.json().await.unwrap()
}

#[tokio::test]
async fn test_injects_common_name() {
    let backend = common::start_echo_backend().await;
    let proxy = common::start_proxy("X-Client-CN", backend).await;
    let client = common::client();

    let headers = echoed(
        client
            .get(proxy.url("/api/items?page=2"))
            .header(CERT_INFO, "Subject%3D%22CN%3Dexample.com%2C%20OU%3DExample%20Org%22")
            .header("x-other", "untouched"),
    )
    .await;

    assert_eq!(headers.get("x-client-cn").map(String::as_str), Some("example.com"));
    assert_eq!(headers.get("x-other").map(String::as_str), Some("untouched"));
    assert_eq!(
        headers.get("x-forwarded-tls-client-cert-info").map(String::as_str),
        Some("Subject%3D%22CN%3Dexample.com%2C%20OU%3DExample%20Org%22")
    );
}

#[tokio::test]
async fn test_missing_cert_info_passes_through() {
    let backend = common::start_echo_backend().await;
    let proxy = common::start_proxy("X-Client-CN", backend).await;

    let headers = echoed(common::client().get(proxy.url("/")).header("x-some-header", "Test")).await;

    assert!(!headers.contains_key("x-client-cn"));
    assert_eq!(headers.get("x-some-header").map(String::as_str), Some("Test"));
}

#[tokio::test]
async fn test_no_common_name_keeps_client_value() {
    let backend = common::start_echo_backend().await;
    let proxy = common::start_proxy("X-Client-CN", backend).await;

    let headers = echoed(
        common::client()
            .post(proxy.url("/submit"))
            .header(CERT_INFO, "Subject%3D%22OU%3DExample%20Org%22")
            .header("x-client-cn", "from-client")
            .body("payload"),
    )
    .await;

    assert_eq!(headers.get("x-client-cn").map(String::as_str), Some("from-client"));
}

#[tokio::test]
async fn test_client_supplied_destination_is_replaced() {
    let backend = common::start_echo_backend().await;
    let proxy = common::start_proxy("X-Client-CN", backend).await;

    let headers = echoed(
        common::client()
            .get(proxy.url("/whoami"))
            .header(CERT_INFO, "Subject%3D%22CN%3Dreal.example%22")
            .header("x-client-cn", "spoofed"),
    )
    .await;

    assert_eq!(headers.get("x-client-cn").map(String::as_str), Some("real.example"));
}

#[tokio::test]
async fn test_malformed_cert_info_passes_through() {
    let backend = common::start_echo_backend().await;
    let proxy = common::start_proxy("X-Client-CN", backend).await;

    let headers = echoed(
        common::client()
            .get(proxy.url("/"))
            .header(CERT_INFO, "CN%3Dexample.com%Z"),
    )
    .await;

    assert!(!headers.contains_key("x-client-cn"));
}

#[tokio::test]
async fn test_upstream_down_is_bad_gateway() {
    // Bind then drop to get a port nothing listens on.
    let dead = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let proxy = common::start_proxy("X-Client-CN", dead).await;

    let res = common::client()
        .get(proxy.url("/"))
        .header(CERT_INFO, "CN%3Dexample.com")
        .send()
        .await
        .expect("Proxy unreachable");

    assert_eq!(res.status(), 502);
}

#[tokio::test]
async fn test_graceful_shutdown() {
    let backend = common::start_echo_backend().await;
    let proxy = common::start_proxy("X-Client-CN", backend).await;
    let client = common::client();

    echoed(client.get(proxy.url("/"))).await;

    proxy.shutdown.trigger();
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert!(client.get(proxy.url("/")).send().await.is_err());
}
