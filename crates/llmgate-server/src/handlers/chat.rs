//! Chat completion handlers.

use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};

use crate::{
    config::V2Mode,
    error::ServerError,
    handlers::respond,
    models::ChatCompletionRequest,
    offload::{self, OffloadStrategy},
    pipeline::{combine_messages, GenerationParams},
    state::AppState,
    streaming::{self, SseShape},
};

/// Reject requests with nothing to generate from, before the model is touched.
fn prompt_from(req: &ChatCompletionRequest) -> Result<String, ServerError> {
    if req.messages.is_empty() {
        return Err(ServerError::InvalidInput(
            "messages must not be empty".to_string(),
        ));
    }
    Ok(combine_messages(&req.messages))
}

/// `POST /v1/chat/completions`: generation runs on the request task and is
/// written as chunked `data:` lines.
///
/// The session guard lives inside the body stream, so a client disconnect
/// drops the stream, cancels the session and frees its slot.
pub async fn handle_chat_completion(
    State(state): State<AppState>,
    Json(req): Json<ChatCompletionRequest>,
) -> Result<Response, ServerError> {
    let prompt = prompt_from(&req)?;
    let params = GenerationParams::with_max_tokens(req.max_tokens);
    let launch = offload::launch(&state, prompt, params, OffloadStrategy::Inline).await?;
    Ok(respond(launch, streaming::chunked_response))
}

/// `POST /v2/chat/completions`: either server-sent events fed by a worker
/// thread, or an immediate acknowledgement with generation detached,
/// depending on the configured mode.
pub async fn handle_chat_completion_v2(
    State(state): State<AppState>,
    Json(req): Json<ChatCompletionRequest>,
) -> Result<Response, ServerError> {
    let prompt = prompt_from(&req)?;
    let params = GenerationParams::with_max_tokens(req.max_tokens);
    let strategy = match state.config.v2_mode {
        V2Mode::Sse => OffloadStrategy::Worker,
        V2Mode::Background => OffloadStrategy::Detached,
    };

    let launch = offload::launch(&state, prompt, params, strategy).await?;
    Ok(respond(launch, |items| {
        streaming::event_stream(items, SseShape::Frame).into_response()
    }))
}
