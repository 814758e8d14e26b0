//! Path prefix removal.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderValue, Request, Response, Uri};
use futures_util::future::BoxFuture;
use serde::Deserialize;

use crate::middleware::{parse_options, Middleware, MiddlewareContext, MiddlewareError, Next};

pub const KIND: &str = "strip-prefix";

/// Header carrying the removed prefix to the upstream.
pub const X_FORWARDED_PREFIX: &str = "x-forwarded-prefix";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StripPrefixOptions {
    prefixes: Vec<String>,
}

/// Removes the first matching prefix from the request path.
#[derive(Debug)]
pub struct StripPrefix {
    prefixes: Vec<String>,
}

impl StripPrefix {
    /// Rewritten URI and the prefix that was removed.
    fn strip(&self, uri: &Uri) -> Option<(Uri, &str)> {
        let path = uri.path();
        let prefix = self.prefixes.iter().find(|p| path.starts_with(p.as_str()))?;

        let rest = &path[prefix.len()..];
        let path = if rest.starts_with('/') {
            rest.to_string()
        } else {
            format!("/{rest}")
        };
        let path_and_query = match uri.query() {
            Some(query) => format!("{path}?{query}"),
            None => path,
        };

        let mut parts = uri.clone().into_parts();
        parts.path_and_query = Some(path_and_query.parse().ok()?);
        Some((Uri::from_parts(parts).ok()?, prefix.as_str()))
    }
}

pub async fn create(context: MiddlewareContext) -> Result<Arc<dyn Middleware>, MiddlewareError> {
    let options: StripPrefixOptions = parse_options(&context)?;
    if options.prefixes.is_empty() {
        return Err(MiddlewareError::Invalid {
            name: context.name,
            reason: "at least one prefix is required".into(),
        });
    }
    if let Some(bad) = options.prefixes.iter().find(|p| !p.starts_with('/')) {
        return Err(MiddlewareError::Invalid {
            name: context.name.clone(),
            reason: format!("prefix '{bad}' must start with '/'"),
        });
    }

    Ok(Arc::new(StripPrefix {
        prefixes: options.prefixes,
    }))
}

impl Middleware for StripPrefix {
    fn handle<'a>(&'a self, mut request: Request<Body>, next: Next<'a>) -> BoxFuture<'a, Response<Body>> {
        Box::pin(async move {
            if let Some((uri, prefix)) = self.strip(request.uri()) {
                if let Ok(value) = HeaderValue::from_str(prefix) {
                    request.headers_mut().insert(X_FORWARDED_PREFIX, value);
                }
                *request.uri_mut() = uri;
            }
            next.run(request).await
        })
    }
}
