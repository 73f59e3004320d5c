//! Chat and prompt request types.

use crate::models::common::ChatMessage;
use serde::{Deserialize, Serialize};

/// Default cap on generated tokens for chat requests.
pub const DEFAULT_MAX_TOKENS: usize = 250;

fn default_max_tokens() -> usize {
    DEFAULT_MAX_TOKENS
}

/// Chat completion request (`/v1` and `/v2` chat routes).
#[derive(Debug, Deserialize)]
pub struct ChatCompletionRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
}

/// Bare prompt request (`/v1/completions` and the legacy `/v0` chat route).
#[derive(Debug, Deserialize)]
pub struct PromptRequest {
    pub prompt: String,
}

/// Body returned when generation was handed off to a background task.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Acknowledgement {
    pub detail: String,
}

impl Acknowledgement {
    pub fn started() -> Self {
        Self {
            detail: "Chat generation started".to_string(),
        }
    }
}
