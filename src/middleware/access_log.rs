//! Structured per-router access logging.

use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use futures_util::future::BoxFuture;
use serde::Deserialize;

use crate::http::request::RequestIdExt;
use crate::middleware::{parse_options, Middleware, MiddlewareContext, MiddlewareError, Next};

pub const KIND: &str = "access-log";

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct AccessLogOptions {}

#[derive(Debug)]
pub struct AccessLog {
    name: String,
}

pub async fn create(context: MiddlewareContext) -> Result<Arc<dyn Middleware>, MiddlewareError> {
    let _: AccessLogOptions = parse_options(&context)?;
    Ok(Arc::new(AccessLog { name: context.name }))
}

impl Middleware for AccessLog {
    fn handle<'a>(&'a self, request: Request<Body>, next: Next<'a>) -> BoxFuture<'a, Response<Body>> {
        Box::pin(async move {
            let start = Instant::now();
            let method = request.method().clone();
            let path = request.uri().path().to_string();
            let request_id = request.request_id().unwrap_or("-").to_string();

            let response = next.run(request).await;

            tracing::info!(
                middleware = %self.name,
                request_id = %request_id,
                method = %method,
                path = %path,
                status = response.status().as_u16(),
                duration_ms = start.elapsed().as_millis() as u64,
                "Access"
            );
            response
        })
    }
}
