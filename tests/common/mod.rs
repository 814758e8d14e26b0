//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use dynamic_gateway::config::{EntrypointConfig, GatewayConfig};
use dynamic_gateway::dynamic::{DynamicModel, RouterDef, ServerDef, ServiceDef};

pub const API_KEY: &str = "test-key";

/// Start a mock backend on an ephemeral port.
///
/// Responds `200 <name>:<path>` and echoes every `x-*` request header back
/// as `x-echo-<header>`.
pub async fn start_backend(name: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let mut head = Vec::new();
                let mut chunk = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => head.extend_from_slice(&chunk[..n]),
                    }
                }

                let head = String::from_utf8_lossy(&head).to_string();
                let path = head.split_whitespace().nth(1).unwrap_or("/").to_string();
                let body = format!("{name}:{path}");

                let mut response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n",
                    body.len()
                );
                for line in head.lines().skip(1) {
                    if let Some((key, value)) = line.split_once(':') {
                        let key = key.trim().to_ascii_lowercase();
                        if key.starts_with("x-") {
                            response.push_str(&format!("x-echo-{key}: {}\r\n", value.trim()));
                        }
                    }
                }
                response.push_str("\r\n");
                response.push_str(&body);

                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// HTTP client that never goes through an environment proxy.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

/// Static config with one ephemeral `web` entrypoint and the API enabled.
#[allow(dead_code)]
pub fn gateway_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.entrypoints = vec![EntrypointConfig {
        name: "web".into(),
        address: "127.0.0.1:0".into(),
    }];
    config.providers.throttle_ms = 50;
    config.observability.metrics_enabled = false;
    config.api.enabled = true;
    config.api.api_key = API_KEY.into();
    config.api.bind_address = "127.0.0.1:0".into();
    config
}

/// Router `test` on `Path('/')` pointing at service `svc` with one server.
#[allow(dead_code)]
pub fn mock_model(backend: SocketAddr) -> DynamicModel {
    DynamicModel {
        routers: vec![RouterDef::new("test", "Path('/')", "svc")],
        middlewares: vec![],
        services: vec![ServiceDef::new(
            "svc",
            vec![ServerDef::new(backend.ip().to_string(), backend.port())],
        )],
    }
}
