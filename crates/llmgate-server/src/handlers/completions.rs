//! Direct (non-streaming) completion handler.

use axum::{extract::State, Json};

use crate::{error::ServerError, models::PromptRequest, offload, state::AppState};

/// `POST /v1/completions`: run the prompt to completion and return the text
/// as a JSON string.
pub async fn handle_completion(
    State(state): State<AppState>,
    Json(req): Json<PromptRequest>,
) -> Result<Json<String>, ServerError> {
    let text = offload::complete(&state, req.prompt).await?;
    Ok(Json(text))
}
