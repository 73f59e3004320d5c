//! Frame types written to the client while a generation streams.

use serde::{Deserialize, Serialize};

/// Why a frame was emitted. `Stop` marks the end-of-sequence token; every
/// other chunk is `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FinishReason {
    Stop,
    Unknown,
}

/// One generated chunk, in chat-completion shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseFrame {
    pub choices: Vec<FrameChoice>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameChoice {
    pub message: FrameMessage,
    pub finish_reason: FinishReason,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameMessage {
    pub role: String,
    pub content: String,
}

impl ResponseFrame {
    /// A single-choice frame carrying `content` with the `system` role.
    pub fn new(content: String, finish_reason: FinishReason) -> Self {
        Self {
            choices: vec![FrameChoice {
                message: FrameMessage {
                    role: "system".to_string(),
                    content,
                },
                finish_reason,
            }],
        }
    }

    /// Text of the first choice.
    pub fn content(&self) -> &str {
        self.choices
            .first()
            .map(|c| c.message.content.as_str())
            .unwrap_or("")
    }
}
