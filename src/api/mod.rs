// REST API endpoints for the orchestrator

use axum::{
    Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::OrchestrationError;
use crate::model::{SimulationRequest, SimulationResponse};
use crate::orchestrator::Orchestrator;


/// The orchestrator holds no mutable state, so requests share it without locking.
pub type AppState = Arc<Orchestrator>;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/simulations", post(run_simulation))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

async fn health_check() -> Result<Json<Value>, StatusCode> {
    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": env!("CARGO_PKG_NAME"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}

/// Drive parse → schedule → simulate for one application package.
///
/// A body that fails to decode is rejected here, before the orchestrator
/// (and therefore any collaborator) sees it.
async fn run_simulation(
    State(state): State<AppState>,
    payload: Result<Json<SimulationRequest>, JsonRejection>,
) -> Result<Json<SimulationResponse>, OrchestrationError> {
    let Json(request) =
        payload.map_err(|e| OrchestrationError::InvalidRequest(e.body_text()))?;

    let response = state.run_simulation(request).await?;

    Ok(Json(response))
}
