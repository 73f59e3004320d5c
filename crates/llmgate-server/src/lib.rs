//! # llmgate-server
//!
//! HTTP gateway over a single lazily loaded language model.
//!
//! Chat requests are flattened into one prompt, run through the
//! [`pipeline::GenerationPipeline`] and streamed back in one of three wire
//! shapes (chunked `data:` lines, server-sent events, or a legacy SSE of bare
//! text). Where generation runs relative to the request is chosen per route by
//! [`offload::OffloadStrategy`].

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod offload;
pub mod pipeline;
pub mod server;
pub mod session_manager;
pub mod state;
pub mod streaming;

pub use config::{ServerConfig, V2Mode};
pub use error::ServerError;
pub use offload::OffloadStrategy;
pub use pipeline::{GenerationParams, GenerationPipeline, StreamItem};
pub use server::{create_router, run_server};
pub use session_manager::SessionManager;
pub use state::AppState;
