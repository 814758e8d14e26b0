//! Terminal handler forwarding requests to a service.
//!
//! # Responsibilities
//! - Pick an upstream of the service (round-robin)
//! - Rewrite the request URI to the upstream, keeping path and query
//! - Stream the upstream response back unchanged
//!
//! # Design Decisions
//! - End-to-end headers pass through, including Host; hop-by-hop headers
//!   (and any named by `Connection`) are stripped in both directions
//! - Upstream connections are HTTP/1.1 through a shared pooled client
//! - Upstream failures map to 502, an empty pool to 503

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, Request, Response, StatusCode, Uri, Version};
use axum::response::IntoResponse;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::dynamic::{Protocol, ServiceDef};
use crate::load_balancer::UpstreamPool;

/// Headers scoped to a single connection (RFC 9110 §7.6.1).
const HOP_BY_HOP: [HeaderName; 7] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::UPGRADE,
];

/// Remove hop-by-hop headers, including those listed in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|token| HeaderName::from_bytes(token.trim().as_bytes()).ok())
        .collect();

    for name in listed.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
    headers.remove(header::TRANSFER_ENCODING);
}

/// Shared client used to reach upstream servers.
pub type UpstreamClient = Client<HttpConnector, Body>;

/// Build the upstream client with a connect timeout.
pub fn build_client(connect_timeout: Duration) -> UpstreamClient {
    let mut connector = HttpConnector::new();
    connector.set_connect_timeout(Some(connect_timeout));
    connector.set_nodelay(true);
    Client::builder(TokioExecutor::new()).build(connector)
}

/// Dispatches requests to the servers of one service.
#[derive(Debug)]
pub struct ServiceHandler {
    name: String,
    pool: UpstreamPool,
    client: UpstreamClient,
}

impl ServiceHandler {
    pub fn new(service: &ServiceDef, client: UpstreamClient) -> Self {
        Self {
            name: service.name.clone(),
            pool: UpstreamPool::from_service(service),
            client,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pool(&self) -> &UpstreamPool {
        &self.pool
    }

    /// Forward a request to the next upstream.
    pub async fn forward(&self, request: Request<Body>) -> Response<Body> {
        let Some(upstream) = self.pool.next() else {
            tracing::warn!(service = %self.name, "No servers available");
            return (StatusCode::SERVICE_UNAVAILABLE, "No servers available").into_response();
        };

        if upstream.protocol == Protocol::Https {
            tracing::error!(
                service = %self.name,
                upstream = %upstream.authority(),
                "TLS upstream forwarding is not enabled"
            );
            return (StatusCode::BAD_GATEWAY, "TLS upstreams are not supported").into_response();
        }

        let (mut parts, body) = request.into_parts();
        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| "/".to_string());

        let uri: Uri = match format!("http://{}{}", upstream.authority(), path_and_query).parse() {
            Ok(uri) => uri,
            Err(e) => {
                tracing::error!(service = %self.name, error = %e, "Invalid upstream URI");
                return (StatusCode::BAD_GATEWAY, "Invalid upstream address").into_response();
            }
        };
        parts.uri = uri;
        parts.version = Version::HTTP_11;
        strip_hop_by_hop(&mut parts.headers);

        tracing::debug!(
            service = %self.name,
            upstream = %upstream.authority(),
            path = %path_and_query,
            "Forwarding request"
        );

        match self.client.request(Request::from_parts(parts, body)).await {
            Ok(response) => {
                let (mut parts, body) = response.into_parts();
                strip_hop_by_hop(&mut parts.headers);
                Response::from_parts(parts, Body::new(body))
            }
            Err(e) => {
                tracing::error!(
                    service = %self.name,
                    upstream = %upstream.authority(),
                    error = %e,
                    "Upstream error"
                );
                (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn strips_hop_by_hop_and_connection_listed_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive, x-session-hop"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert(header::TE, HeaderValue::from_static("trailers"));
        headers.insert(header::UPGRADE, HeaderValue::from_static("websocket"));
        headers.insert(header::PROXY_AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        headers.insert("x-session-hop", HeaderValue::from_static("1"));
        headers.insert(header::HOST, HeaderValue::from_static("example.com"));
        headers.insert("x-request-id", HeaderValue::from_static("abc"));

        strip_hop_by_hop(&mut headers);

        assert_eq!(headers.len(), 2);
        assert_eq!(headers[header::HOST], "example.com");
        assert_eq!(headers["x-request-id"], "abc");
    }

    #[test]
    fn leaves_end_to_end_headers_alone() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("4"));

        strip_hop_by_hop(&mut headers);

        assert_eq!(headers.len(), 2);
    }
}
