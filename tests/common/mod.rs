//! Shared utilities for integration tests.

use axum::{http::HeaderMap, Json, Router};
use std::collections::HashMap;
use std::net::SocketAddr;
use tokio::net::TcpListener;

use extract_cn_proxy::config::{ExtractCnConfig, ProxyConfig};
use extract_cn_proxy::{HttpServer, Shutdown};

/// Start a backend that replies with the request headers it received as JSON.
pub async fn start_echo_backend() -> SocketAddr {
    let app = Router::new().fallback(|headers: HeaderMap| async move {
        let echoed: HashMap<String, String> = headers
            .iter()
            .map(|(k, v)| (k.to_string(), String::from_utf8_lossy(v.as_bytes()).into_owned()))
            .collect();
        Json(echoed)
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// A running proxy in front of an echo backend.
pub struct TestProxy {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
}

impl TestProxy {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Start the proxy with `dest` as destination header, forwarding to `upstream`.
pub async fn start_proxy(dest: &str, upstream: SocketAddr) -> TestProxy {
    let mut config = ProxyConfig {
        extract_cn: ExtractCnConfig {
            dest_header: dest.to_string(),
        },
        ..ProxyConfig::default()
    };
    config.upstream.url = format!("http://{}", upstream);
    config.listener.bind_address = "127.0.0.1:0".to_string();

    let server = HttpServer::new(config).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestProxy { addr, shutdown }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
