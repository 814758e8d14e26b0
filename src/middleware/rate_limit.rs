//! Per-client token bucket rate limiting.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, Response, StatusCode};
use axum::response::IntoResponse;
use dashmap::DashMap;
use futures_util::future::BoxFuture;
use serde::Deserialize;

use crate::middleware::{parse_options, Middleware, MiddlewareContext, MiddlewareError, Next};
use crate::observability::metrics;

pub const KIND: &str = "rate-limit";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RateLimitOptions {
    /// Sustained requests per second.
    average: f64,
    #[serde(default)]
    burst: Option<f64>,
}

#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(capacity: f64) -> Self {
        Self {
            tokens: capacity,
            last_update: Instant::now(),
        }
    }

    fn try_acquire(&mut self, capacity: f64, refill_rate: f64) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f64();

        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        self.last_update = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Limits each client IP to `average` requests per second with `burst` headroom.
#[derive(Debug)]
pub struct RateLimit {
    name: String,
    average: f64,
    burst: f64,
    buckets: DashMap<String, TokenBucket>,
}

impl RateLimit {
    fn check(&self, key: String) -> bool {
        let mut bucket = self
            .buckets
            .entry(key)
            .or_insert_with(|| TokenBucket::new(self.burst));
        bucket.try_acquire(self.burst, self.average)
    }
}

fn client_key(request: &Request<Body>) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn create(context: MiddlewareContext) -> Result<Arc<dyn Middleware>, MiddlewareError> {
    let options: RateLimitOptions = parse_options(&context)?;
    if !options.average.is_finite() || options.average <= 0.0 {
        return Err(MiddlewareError::Invalid {
            name: context.name,
            reason: "average must be greater than zero".into(),
        });
    }
    let burst = options.burst.unwrap_or(options.average).max(1.0);

    Ok(Arc::new(RateLimit {
        name: context.name,
        average: options.average,
        burst,
        buckets: DashMap::new(),
    }))
}

impl Middleware for RateLimit {
    fn handle<'a>(&'a self, request: Request<Body>, next: Next<'a>) -> BoxFuture<'a, Response<Body>> {
        Box::pin(async move {
            let key = client_key(&request);
            if !self.check(key.clone()) {
                tracing::warn!(middleware = %self.name, client = %key, "Rate limit exceeded");
                metrics::record_rate_limited(&self.name);
                return (StatusCode::TOO_MANY_REQUESTS, "Too many requests").into_response();
            }
            next.run(request).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(average: f64, burst: f64) -> RateLimit {
        RateLimit {
            name: "rl@test".into(),
            average,
            burst,
            buckets: DashMap::new(),
        }
    }

    #[test]
    fn allows_burst_then_rejects() {
        let rl = limiter(0.001, 3.0);
        assert!(rl.check("10.0.0.1".into()));
        assert!(rl.check("10.0.0.1".into()));
        assert!(rl.check("10.0.0.1".into()));
        assert!(!rl.check("10.0.0.1".into()));
    }

    #[test]
    fn clients_have_separate_buckets() {
        let rl = limiter(0.001, 1.0);
        assert!(rl.check("10.0.0.1".into()));
        assert!(!rl.check("10.0.0.1".into()));
        assert!(rl.check("10.0.0.2".into()));
    }

    #[test]
    fn client_key_falls_back_without_connect_info() {
        assert_eq!(client_key(&Request::new(Body::empty())), "unknown");
    }

    #[tokio::test]
    async fn rejects_non_positive_average() {
        let ctx = MiddlewareContext {
            name: "rl@test".into(),
            kind: KIND.into(),
            options: serde_json::json!({ "average": 0 }).as_object().cloned().unwrap(),
        };
        assert!(matches!(create(ctx).await, Err(MiddlewareError::Invalid { .. })));
    }
}
