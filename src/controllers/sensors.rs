use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;

use crate::error::ApiError;
use crate::models::SensorState;
use crate::polisen_client::EventSource;
use crate::services::sensor::RefreshOutcome;
use crate::AppState;

pub fn routes<S: EventSource>() -> Router<Arc<AppState<S>>> {
    Router::new()
        .route("/sensors", get(list_sensors::<S>))
        .route("/sensors/{name}", get(get_sensor::<S>))
        .route("/sensors/{name}/refresh", post(refresh_sensor::<S>))
}

pub async fn list_sensors<S: EventSource>(
    State(state): State<Arc<AppState<S>>>,
) -> Json<Vec<SensorState>> {
    Json(state.sensors.iter().map(|s| s.state()).collect())
}

pub async fn get_sensor<S: EventSource>(
    State(state): State<Arc<AppState<S>>>,
    Path(name): Path<String>,
) -> Result<Json<SensorState>, ApiError> {
    let sensor = state
        .sensor(&name)
        .ok_or_else(|| ApiError::SensorNotFound(name.clone()))?;
    Ok(Json(sensor.state()))
}

// Ручной запуск обновления; перекрывающийся вызов пропускается
pub async fn refresh_sensor<S: EventSource>(
    State(state): State<Arc<AppState<S>>>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let sensor = state
        .sensor(&name)
        .ok_or_else(|| ApiError::SensorNotFound(name.clone()))?;

    let outcome = sensor.refresh().await;
    let error = match &outcome {
        RefreshOutcome::Failed(e) => Some(e.to_string()),
        _ => None,
    };

    Ok(Json(json!({
        "success": matches!(outcome, RefreshOutcome::Updated(_)),
        "outcome": outcome.kind(),
        "error": error,
        "sensor": sensor.state(),
    })))
}
