use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use log::error;

use crate::{
    api_types::{ErrorBody, SearchQuery, SearchResponse},
    state::AppState,
};

pub const QUERY_REQUIRED: &str = "Query is required";
pub const SEARCH_FAILED: &str = "Failed to search models";

type ErrorReply = (StatusCode, Json<ErrorBody>);

fn error_reply(status: StatusCode, message: &str) -> ErrorReply {
    (status, Json(ErrorBody::new(message)))
}

#[axum::debug_handler]
pub async fn search(
    State(app_state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, ErrorReply> {
    let query = match params.q {
        Some(query) if !query.is_empty() => query,
        _ => return Err(error_reply(StatusCode::BAD_REQUEST, QUERY_REQUIRED)),
    };

    // Stages never fail, so the only way to get here with an error is a panic in the pipeline.
    let pipeline = Arc::clone(&app_state.pipeline);
    let response = tokio::spawn(async move { pipeline.search(&query).await })
        .await
        .map_err(|err| {
            error!("search pipeline failed: {}", err);
            error_reply(StatusCode::INTERNAL_SERVER_ERROR, SEARCH_FAILED)
        })?;

    Ok(Json(response))
}
