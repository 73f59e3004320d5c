//! # llmgate-runtime
//!
//! Engine implementations and loading for llmgate:
//! - [`RuntimeLoader`] maps `ModelConfig.kind` to an engine factory
//! - [`MockEngine`] is a deterministic echo engine used by tests and the `mock` model type
//! - [`telemetry`] records time-to-first-token and throughput for a generation run

pub mod loader;
pub mod mock;
pub mod telemetry;
mod vocab;

pub use loader::RuntimeLoader;
pub use mock::{MockEngine, DEFAULT_VOCAB_CAPACITY, EOS_TOKEN};
pub use telemetry::{
    InferenceMetrics, InferenceTimer, LogTelemetry, NoopTelemetry, TelemetryHook, TracingTelemetry,
};
