use axum::{routing::get, Json, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::state::AppState;

pub mod search;

async fn healthz() -> Json<String> {
    Json("healthy".to_string())
}

/// Main router for the application, with all API and health endpoints attached
pub fn app_router() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/search", get(search::search))
        .layer(TraceLayer::new_for_http())
        //
        // The UI is served from another origin during development
        //
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods(Any),
        )
}
