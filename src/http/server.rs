//! Entrypoint HTTP server.
//!
//! # Responsibilities
//! - Create the Axum router for one entrypoint
//! - Wire up middleware (timeout, request ID, tracing)
//! - Bind server to listener
//! - Dispatch every request against the live routing table
//!
//! # Design Decisions
//! - One table snapshot per request; a concurrent swap never splits a request
//! - 503 before the first table exists, 404 when no route matches

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::http::request::{propagate_request_id_layer, set_request_id_layer, RequestIdExt};
use crate::observability::metrics;
use crate::routing::TableSwapController;

/// State injected into the dispatch handler.
#[derive(Clone)]
struct EntrypointState {
    name: Arc<str>,
    tables: Arc<TableSwapController>,
}

/// HTTP server for one named entrypoint.
pub struct EntrypointServer {
    name: String,
    router: Router,
}

impl EntrypointServer {
    pub fn new(name: impl Into<String>, tables: Arc<TableSwapController>, request_timeout: Duration) -> Self {
        let name = name.into();
        let state = EntrypointState {
            name: Arc::from(name.as_str()),
            tables,
        };
        Self {
            router: Self::build_router(state, request_timeout),
            name,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: EntrypointState, request_timeout: Duration) -> Router {
        Router::new()
            .fallback(dispatch)
            .with_state(state)
            .layer(TimeoutLayer::new(request_timeout))
            .layer(propagate_request_id_layer())
            .layer(set_request_id_layer())
            .layer(TraceLayer::new_for_http())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Serve until `shutdown` resolves.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(entrypoint = %self.name, address = %addr, "Entrypoint listening");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;

        tracing::info!(entrypoint = %self.name, "Entrypoint stopped");
        Ok(())
    }
}

async fn dispatch(State(state): State<EntrypointState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let response = route_request(&state, request).await;
    metrics::record_request(&state.name, response.status().as_u16(), start);
    response
}

async fn route_request(state: &EntrypointState, request: Request<Body>) -> Response {
    let request_id = request.request_id().unwrap_or("unknown").to_string();

    let Some(table) = state.tables.load() else {
        tracing::warn!(request_id = %request_id, entrypoint = %state.name, "No routing table yet");
        return (StatusCode::SERVICE_UNAVAILABLE, "No routing table available").into_response();
    };

    let route = table
        .entrypoint(&state.name)
        .and_then(|entrypoint| entrypoint.match_request(&request));

    match route {
        Some(route) => {
            tracing::debug!(
                request_id = %request_id,
                router = %route.name(),
                service = %route.chain().service().name(),
                "Route matched"
            );
            route.handle(request).await
        }
        None => {
            tracing::debug!(
                request_id = %request_id,
                path = %request.uri().path(),
                "No route matched"
            );
            (StatusCode::NOT_FOUND, "No matching route found").into_response()
        }
    }
}
