//! Common types used across request shapes.

use serde::{Deserialize, Serialize};

/// Chat message. The role is carried through deserialization but does not
/// reach the engine: messages are flattened into a single prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}
