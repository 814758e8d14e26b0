//! Per-router middleware chain.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};
use futures_util::future::BoxFuture;

use crate::http::forward::ServiceHandler;
use crate::middleware::Middleware;

/// Declared middlewares followed by the terminal service handler.
#[derive(Debug, Clone)]
pub struct MiddlewareChain {
    names: Vec<String>,
    middlewares: Vec<Arc<dyn Middleware>>,
    service: Arc<ServiceHandler>,
}

impl MiddlewareChain {
    pub fn new(middlewares: Vec<(String, Arc<dyn Middleware>)>, service: Arc<ServiceHandler>) -> Self {
        let (names, middlewares) = middlewares.into_iter().unzip();
        Self {
            names,
            middlewares,
            service,
        }
    }

    /// Qualified names of the middlewares, in execution order.
    pub fn middleware_names(&self) -> &[String] {
        &self.names
    }

    pub fn service(&self) -> &ServiceHandler {
        &self.service
    }

    /// Run the request through the chain.
    pub async fn handle(&self, request: Request<Body>) -> Response<Body> {
        Next {
            middlewares: &self.middlewares,
            service: &self.service,
        }
        .run(request)
        .await
    }
}

/// Remainder of a chain, handed to each middleware.
pub struct Next<'a> {
    middlewares: &'a [Arc<dyn Middleware>],
    service: &'a ServiceHandler,
}

impl<'a> Next<'a> {
    /// Pass the request to the next middleware, or to the service.
    pub fn run(self, request: Request<Body>) -> BoxFuture<'a, Response<Body>> {
        match self.middlewares.split_first() {
            Some((first, rest)) => first.handle(
                request,
                Next {
                    middlewares: rest,
                    service: self.service,
                },
            ),
            None => Box::pin(self.service.forward(request)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamic::ServiceDef;
    use crate::http::forward::build_client;
    use axum::http::StatusCode;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Debug)]
    struct Record {
        label: &'static str,
        seen: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Middleware for Record {
        fn handle<'a>(&'a self, request: Request<Body>, next: Next<'a>) -> BoxFuture<'a, Response<Body>> {
            Box::pin(async move {
                self.seen.lock().unwrap().push(self.label);
                next.run(request).await
            })
        }
    }

    #[derive(Debug)]
    struct ShortCircuit;

    impl Middleware for ShortCircuit {
        fn handle<'a>(&'a self, _request: Request<Body>, _next: Next<'a>) -> BoxFuture<'a, Response<Body>> {
            Box::pin(async move {
                let mut response = Response::new(Body::empty());
                *response.status_mut() = StatusCode::FORBIDDEN;
                response
            })
        }
    }

    fn empty_service() -> Arc<ServiceHandler> {
        let service = ServiceDef::new("svc@test", vec![]);
        Arc::new(ServiceHandler::new(&service, build_client(Duration::from_secs(1))))
    }

    #[tokio::test]
    async fn runs_middlewares_in_declared_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let chain = MiddlewareChain::new(
            vec![
                ("first".into(), Arc::new(Record { label: "first", seen: seen.clone() }) as Arc<dyn Middleware>),
                ("second".into(), Arc::new(Record { label: "second", seen: seen.clone() })),
            ],
            empty_service(),
        );

        let response = chain.handle(Request::new(Body::empty())).await;

        // An empty service answers 503 once the chain reaches it.
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(*seen.lock().unwrap(), vec!["first", "second"]);
        assert_eq!(chain.middleware_names(), &["first".to_string(), "second".to_string()]);
    }

    #[tokio::test]
    async fn middleware_can_short_circuit() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let chain = MiddlewareChain::new(
            vec![
                ("deny".into(), Arc::new(ShortCircuit) as Arc<dyn Middleware>),
                ("after".into(), Arc::new(Record { label: "after", seen: seen.clone() })),
            ],
            empty_service(),
        );

        let response = chain.handle(Request::new(Body::empty())).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(seen.lock().unwrap().is_empty());
    }
}
