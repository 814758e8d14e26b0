use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::api::ApiState;
use crate::routing::TableState;

#[derive(Debug, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    /// Generation of the live routing table, 0 before the first one.
    pub generation: u64,
    pub serving: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RouteSummary {
    pub name: String,
    pub rule: String,
    pub priority: i32,
    pub service: String,
    pub middlewares: Vec<String>,
    pub servers: Vec<ServerSummary>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ServerSummary {
    pub address: String,
    /// Requests currently forwarded to this server.
    pub in_flight: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EntrypointSummary {
    pub name: String,
    /// Routes in evaluation order.
    pub routes: Vec<RouteSummary>,
}

pub async fn get_version(State(state): State<ApiState>) -> Json<VersionInfo> {
    let (generation, serving) = match state.tables.state() {
        TableState::NoTable => (0, false),
        TableState::Serving { generation } => (generation, true),
    };
    Json(VersionInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        generation,
        serving,
    })
}

pub async fn get_rawdata(State(state): State<ApiState>) -> Response {
    match state.current_model() {
        Some(model) => Json(model.as_ref().clone()).into_response(),
        None => (StatusCode::NOT_FOUND, "No configuration applied yet").into_response(),
    }
}

pub async fn get_entrypoints(State(state): State<ApiState>) -> Json<Vec<EntrypointSummary>> {
    let Some(table) = state.tables.load() else {
        return Json(Vec::new());
    };

    let summaries = table
        .entrypoint_names()
        .into_iter()
        .filter_map(|name| table.entrypoint(name))
        .map(|entrypoint| EntrypointSummary {
            name: entrypoint.name().to_string(),
            routes: entrypoint
                .routes()
                .iter()
                .map(|route| RouteSummary {
                    name: route.name().to_string(),
                    rule: route.rule().to_string(),
                    priority: route.priority(),
                    service: route.chain().service().name().to_string(),
                    middlewares: route.chain().middleware_names().to_vec(),
                    servers: route
                        .chain()
                        .service()
                        .pool()
                        .upstreams()
                        .iter()
                        .map(|upstream| ServerSummary {
                            address: upstream.authority(),
                            in_flight: upstream.in_flight(),
                        })
                        .collect(),
                })
                .collect(),
        })
        .collect();

    Json(summaries)
}
