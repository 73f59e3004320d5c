//! Legacy `/v0` chat route: bare prompt in, SSE of JSON-encoded text out.

use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};

use crate::{
    error::ServerError,
    handlers::respond,
    models::PromptRequest,
    offload::{self, OffloadStrategy},
    pipeline::GenerationParams,
    state::AppState,
    streaming::{self, SseShape},
};

pub async fn handle_chat_completion_v0(
    State(state): State<AppState>,
    Json(req): Json<PromptRequest>,
) -> Result<Response, ServerError> {
    let launch = offload::launch(
        &state,
        req.prompt,
        GenerationParams::default(),
        OffloadStrategy::Inline,
    )
    .await?;
    Ok(respond(launch, |items| {
        streaming::event_stream(items, SseShape::Text).into_response()
    }))
}
