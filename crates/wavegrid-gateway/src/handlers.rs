//! REST handlers for the gateway.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use tracing::debug;
use wavegrid_types::{FacePrediction, FrameMessage};

use crate::error::GatewayError;
use crate::state::AppState;

/// Liveness of the gateway itself.
///
/// # Route
///
/// `GET /health`
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "sessions": state.sessions.count().await,
        "uptime_seconds": state.uptime_seconds(),
    }))
}

/// Head-pose classification of a single frame, outside any channel.
///
/// # Route
///
/// `POST /api/v1/ml/predict-face`
pub async fn predict_face(
    State(state): State<Arc<AppState>>,
    body: Result<Json<FrameMessage>, JsonRejection>,
) -> Result<Json<FacePrediction>, GatewayError> {
    let Json(frame) = body.map_err(|rejection| {
        debug!("predict-face body rejected: {rejection}");
        GatewayError::MissingImage
    })?;
    if frame.image_base64.is_empty() {
        return Err(GatewayError::MissingImage);
    }
    let prediction = state.classifier.predict_face(&frame.image_base64).await?;
    Ok(Json(prediction))
}

/// Reachability of the classifier service.
///
/// # Route
///
/// `GET /api/v1/ml/health`
pub async fn ml_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if state.classifier.health().await {
        (StatusCode::OK, Json(json!({ "ml_service": "healthy" })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "ml_service": "unavailable" })),
        )
    }
}
