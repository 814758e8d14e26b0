//! Operator API.
//!
//! Read-only view of the gateway: version, the last accepted merged
//! configuration and the live routing table. Every route requires
//! `Authorization: Bearer <api_key>`.

pub mod auth;
pub mod handlers;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use axum::{middleware, routing::get, Router};
use tokio::net::TcpListener;

use crate::dynamic::DynamicModel;
use crate::routing::TableSwapController;

use self::auth::api_auth;
use self::handlers::{get_entrypoints, get_rawdata, get_version};

pub use handlers::{EntrypointSummary, RouteSummary, ServerSummary, VersionInfo};

/// State shared by API handlers.
#[derive(Clone)]
pub struct ApiState {
    model: Arc<ArcSwapOption<DynamicModel>>,
    tables: Arc<TableSwapController>,
    api_key: Arc<str>,
}

impl ApiState {
    pub fn new(tables: Arc<TableSwapController>, api_key: &str) -> Self {
        Self {
            model: Arc::new(ArcSwapOption::empty()),
            tables,
            api_key: Arc::from(api_key),
        }
    }

    /// Watcher listener keeping the served raw configuration current.
    pub fn listener(&self) -> impl Fn(&DynamicModel) + Send + Sync + 'static {
        let model = self.model.clone();
        move |merged: &DynamicModel| model.store(Some(Arc::new(merged.clone())))
    }

    pub fn current_model(&self) -> Option<Arc<DynamicModel>> {
        self.model.load_full()
    }
}

pub fn api_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/version", get(get_version))
        .route("/api/rawdata", get(get_rawdata))
        .route("/api/entrypoints", get(get_entrypoints))
        .layer(middleware::from_fn_with_state(state.clone(), api_auth))
        .with_state(state)
}

/// Serve the API until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: ApiState, shutdown: F) -> Result<(), std::io::Error>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    tracing::info!(address = %addr, "API listening");

    let app = api_router(state).into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;

    tracing::info!("API stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamic::{ServerDef, ServiceDef};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    fn get(path: &str, key: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(path);
        if let Some(key) = key {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {key}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    fn state() -> ApiState {
        ApiState::new(Arc::new(TableSwapController::new()), "secret")
    }

    #[tokio::test]
    async fn rejects_missing_or_wrong_key() {
        let app = api_router(state());
        let response = app.clone().oneshot(get("/api/version", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app.oneshot(get("/api/version", Some("wrong"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn version_reports_no_table() {
        let response = api_router(state())
            .oneshot(get("/api/version", Some("secret")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let info: VersionInfo = serde_json::from_slice(&body).unwrap();
        assert_eq!(info.generation, 0);
        assert!(!info.serving);
    }

    #[tokio::test]
    async fn rawdata_follows_listener() {
        let state = state();
        let app = api_router(state.clone());

        let response = app.clone().oneshot(get("/api/rawdata", Some("secret"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let model = DynamicModel {
            services: vec![ServiceDef::new("svc@file", vec![ServerDef::new("127.0.0.1", 80)])],
            ..Default::default()
        };
        (state.listener())(&model);

        let response = app.oneshot(get("/api/rawdata", Some("secret"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let served: DynamicModel = serde_json::from_slice(&body).unwrap();
        assert_eq!(served, model);
    }

    #[tokio::test]
    async fn entrypoints_empty_without_table() {
        let response = api_router(state())
            .oneshot(get("/api/entrypoints", Some("secret")))
            .await
            .unwrap();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let entrypoints: Vec<EntrypointSummary> = serde_json::from_slice(&body).unwrap();
        assert!(entrypoints.is_empty());
    }

    #[tokio::test]
    async fn entrypoints_report_in_flight_requests() {
        use crate::dynamic::RouterDef;
        use crate::http::build_client;
        use crate::middleware::MiddlewareRegistry;
        use crate::routing::RouterFactory;
        use std::time::Duration;

        let mut router = RouterDef::new("api@file", "PathPrefix('/api')", "svc@file");
        router.entrypoints = vec!["web".into()];
        let model = DynamicModel {
            routers: vec![router],
            services: vec![ServiceDef::new(
                "svc@file",
                vec![ServerDef::new("10.0.0.1", 80), ServerDef::new("10.0.0.2", 80)],
            )],
            ..Default::default()
        };
        let factory = RouterFactory::new(
            Arc::new(MiddlewareRegistry::with_builtins()),
            vec!["web".into()],
            build_client(Duration::from_secs(1)),
        );
        let state = state();
        state.tables.swap(factory.build(&model).await.unwrap());

        let table = state.tables.load().unwrap();
        let route = &table.entrypoint("web").unwrap().routes()[0];
        let _busy = route.chain().service().pool().next().unwrap();

        let response = api_router(state.clone())
            .oneshot(get("/api/entrypoints", Some("secret")))
            .await
            .unwrap();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let entrypoints: Vec<EntrypointSummary> = serde_json::from_slice(&body).unwrap();

        let servers = &entrypoints[0].routes[0].servers;
        assert_eq!(servers.len(), 2);
        assert_eq!(servers[0].address, "10.0.0.1:80");
        assert_eq!(servers[0].in_flight, 1);
        assert_eq!(servers[1].in_flight, 0);
    }
}
