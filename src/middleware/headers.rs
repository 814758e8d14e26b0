//! Static header injection.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Request, Response};
use futures_util::future::BoxFuture;
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::middleware::{parse_options, Middleware, MiddlewareContext, MiddlewareError, Next};

pub const KIND: &str = "headers";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct HeadersOptions {
    #[serde(default)]
    request: BTreeMap<String, String>,
    #[serde(default)]
    response: BTreeMap<String, String>,
}

/// Sets fixed headers on the request and on the response.
#[derive(Debug)]
pub struct Headers {
    request: Vec<(HeaderName, HeaderValue)>,
    response: Vec<(HeaderName, HeaderValue)>,
}

impl Headers {
    fn apply(headers: &mut HeaderMap, values: &[(HeaderName, HeaderValue)]) {
        for (name, value) in values {
            headers.insert(name.clone(), value.clone());
        }
    }
}

fn convert(
    name: &str,
    values: BTreeMap<String, String>,
) -> Result<Vec<(HeaderName, HeaderValue)>, MiddlewareError> {
    values
        .into_iter()
        .map(|(key, value)| {
            let header = HeaderName::try_from(key.as_str()).map_err(|e| MiddlewareError::Invalid {
                name: name.to_string(),
                reason: format!("header name '{key}': {e}"),
            })?;
            let value = HeaderValue::try_from(value.as_str()).map_err(|e| MiddlewareError::Invalid {
                name: name.to_string(),
                reason: format!("header '{key}' value: {e}"),
            })?;
            Ok((header, value))
        })
        .collect()
}

pub async fn create(context: MiddlewareContext) -> Result<Arc<dyn Middleware>, MiddlewareError> {
    let options: HeadersOptions = parse_options(&context)?;
    Ok(Arc::new(Headers {
        request: convert(&context.name, options.request)?,
        response: convert(&context.name, options.response)?,
    }))
}

impl Middleware for Headers {
    fn handle<'a>(&'a self, mut request: Request<Body>, next: Next<'a>) -> BoxFuture<'a, Response<Body>> {
        Box::pin(async move {
            Self::apply(request.headers_mut(), &self.request);
            let mut response = next.run(request).await;
            Self::apply(response.headers_mut(), &self.response);
            response
        })
    }
}
