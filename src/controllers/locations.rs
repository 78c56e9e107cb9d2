use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::polisen_client::EventSource;
use crate::AppState;

pub fn routes<S: EventSource>() -> Router<Arc<AppState<S>>> {
    Router::new().route("/locations", get(list_locations::<S>))
}

pub async fn list_locations<S: EventSource>(State(state): State<Arc<AppState<S>>>) -> Json<Value> {
    let locations = state.locations.suggestions().await;
    Json(json!({
        "count": locations.len(),
        "locations": locations.as_slice(),
    }))
}
