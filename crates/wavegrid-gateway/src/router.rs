//! Axum router construction for the gateway.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete router.
///
/// - `GET /health` -- gateway liveness
/// - `GET /api/v1/ws/{session_id}` -- duplex frame channel
/// - `POST /api/v1/ml/predict-face` -- one-shot head-pose classification
/// - `GET /api/v1/ml/health` -- classifier reachability
///
/// CORS allows any origin so browser screens on another port can connect.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/v1/ws/{session_id}", get(ws::ws_session))
        .route("/api/v1/ml/predict-face", post(handlers::predict_face))
        .route("/api/v1/ml/health", get(handlers::ml_health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
