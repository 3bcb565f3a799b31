//! HTTP surface over the runtime

use axum::{
    extract::{Path as AxumPath, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tonesoul_core::{GatewayConfig, TraceId};
use tonesoul_evolution::Context;
use tonesoul_pipeline::{RoutingPolicy, ToneFunction};
use tonesoul_runtime::ToneSoulRuntime;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub struct GatewayState {
    pub runtime: Arc<ToneSoulRuntime>,
    pub started_at: Instant,
}

#[derive(Debug, Deserialize)]
pub struct ProcessRequest {
    pub sentence: String,
    #[serde(default)]
    pub trace_id: Option<String>,
    #[serde(default)]
    pub user_satisfaction: Option<f64>,
}

/// Error body returned by every failing handler.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Runtime(#[from] tonesoul_core::Error),
    #[error("unknown tone function: {0}")]
    UnknownTone(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        use tonesoul_core::Error;
        let status = match &self {
            ApiError::Runtime(Error::NotFound(_)) | ApiError::UnknownTone(_) => StatusCode::NOT_FOUND,
            ApiError::Runtime(Error::InvalidTransition { .. }) => StatusCode::CONFLICT,
            ApiError::Runtime(e) if e.is_validation() => StatusCode::BAD_REQUEST,
            ApiError::Runtime(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Build the router. Split from `start_gateway` so it can be driven in-process.
pub fn build_router(runtime: Arc<ToneSoulRuntime>) -> Router {
    let state = Arc::new(GatewayState {
        runtime,
        started_at: Instant::now(),
    });

    Router::new()
        .route("/health", get(health_handler))
        .route("/v1/process", post(process_handler))
        .route("/v1/modules", get(modules_handler))
        .route("/v1/routes/:tone", post(rebind_handler))
        .route("/v1/evolution/status", get(evolution_status_handler))
        .route("/v1/evolution/insights", get(evolution_insights_handler))
        .route("/v1/evolution/reflect", post(reflect_handler))
        .route("/v1/vows", get(vows_handler))
        .route("/v1/vows/:id/fulfill", post(fulfill_handler))
        .route("/v1/vows/:id/withdraw", post(withdraw_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .with_state(state)
}

pub async fn start_gateway(runtime: Arc<ToneSoulRuntime>, config: &GatewayConfig) -> anyhow::Result<()> {
    let bind_addr: SocketAddr = format!("{}:{}", config.bind.to_addr(), config.port).parse()?;
    let app = build_router(runtime);

    info!("ToneSoul Gateway v{} starting", env!("CARGO_PKG_VERSION"));
    info!("  Listening on: {}", bind_addr);
    info!("  Process:   POST http://{}/v1/process", bind_addr);
    info!("  Evolution: GET  http://{}/v1/evolution/status", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health_handler(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.started_at.elapsed().as_secs(),
        "responders": state.runtime.pipeline().responders().list().len(),
        "vows": state.runtime.vows().len(),
    }))
}

async fn process_handler(
    State(state): State<Arc<GatewayState>>,
    Json(request): Json<ProcessRequest>,
) -> Response {
    let trace_id = request.trace_id.map(TraceId::from);
    let result = state
        .runtime
        .process_with_feedback(&request.sentence, trace_id, request.user_satisfaction)
        .await;
    if result.success {
        Json(result).into_response()
    } else {
        warn!(trace_id = %result.trace_id, "Process request failed");
        (StatusCode::UNPROCESSABLE_ENTITY, Json(result)).into_response()
    }
}

async fn modules_handler(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    Json(state.runtime.list_modules())
}

async fn rebind_handler(
    AxumPath(tone): AxumPath<String>,
    State(state): State<Arc<GatewayState>>,
    Json(policy): Json<RoutingPolicy>,
) -> Result<impl IntoResponse, ApiError> {
    let tone_fn = ToneFunction::parse(&tone).ok_or(ApiError::UnknownTone(tone))?;
    let previous = state.runtime.rebind_route(tone_fn, policy);
    Ok(Json(json!({
        "tone_function": tone_fn,
        "previous": previous,
        "routing_table": state.runtime.pipeline().router().available_routes(),
    })))
}

async fn evolution_status_handler(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    Json(state.runtime.status().await)
}

async fn evolution_insights_handler(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    Json(state.runtime.evolution_overview().await)
}

async fn reflect_handler(
    State(state): State<Arc<GatewayState>>,
    body: Option<Json<Context>>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state.runtime.trigger_reflection(body.map(|Json(c)| c)).await?;
    Ok(Json(report))
}

async fn vows_handler(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    Json(state.runtime.list_vows())
}

async fn fulfill_handler(
    AxumPath(id): AxumPath<String>,
    State(state): State<Arc<GatewayState>>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.runtime.fulfill_vow(&id)?))
}

async fn withdraw_handler(
    AxumPath(id): AxumPath<String>,
    State(state): State<Arc<GatewayState>>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.runtime.withdraw_vow(&id)?))
}
