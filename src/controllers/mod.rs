pub mod locations;
pub mod sensors;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::polisen_client::EventSource;
use crate::AppState;

pub fn routes<S: EventSource>() -> Router<Arc<AppState<S>>> {
    Router::new()
        .merge(sensors::routes::<S>())
        .merge(locations::routes::<S>())
}

/// Full HTTP surface with state attached.
pub fn app<S: EventSource>(state: Arc<AppState<S>>) -> Router {
    Router::new()
        .route("/", get(|| async { "Polisen Events v1.0" }))
        .route("/health", get(|| async { "OK" }))
        .nest("/api", routes::<S>())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
