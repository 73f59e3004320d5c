//! HTTP request handlers for API endpoints.

use axum::{
    response::{IntoResponse, Response},
    Json,
};

use crate::models::Acknowledgement;
use crate::offload::{FrameItems, Launch};

pub mod chat;
pub mod completions;
pub mod health;
pub mod index;
pub mod legacy;

pub use chat::{handle_chat_completion, handle_chat_completion_v2};
pub use completions::handle_completion;
pub use health::handle_health;
pub use index::handle_index;
pub use legacy::handle_chat_completion_v0;

/// Turn a launched generation into a response: streams go through the
/// route's wire adapter, detached runs are acknowledged.
pub(crate) fn respond(launch: Launch, adapter: impl FnOnce(FrameItems) -> Response) -> Response {
    match launch {
        Launch::Stream(items) => adapter(items),
        Launch::Detached(_task) => Json(Acknowledgement::started()).into_response(),
    }
}
