//! Request/response types for the chat-completion routes.

pub mod chat;
pub mod common;
pub mod streaming;

pub use chat::{Acknowledgement, ChatCompletionRequest, PromptRequest};
pub use common::ChatMessage;
pub use streaming::{FinishReason, FrameChoice, FrameMessage, ResponseFrame};
