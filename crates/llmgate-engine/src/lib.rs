//! # llmgate-engine
//!
//! The "narrow waist" of llmgate. Defines the [`Engine`] trait through which the
//! gateway talks to a locally hosted language model, the [`EngineLoader`] that
//! constructs one from a [`ModelConfig`], and the lazily initialized
//! [`ModelHandle`] that owns the process-wide instance.
//!
//! ## Design Notes
//!
//! ### Shared access
//! `Engine` methods take `&self` and the trait requires `Send + Sync`: one engine
//! instance is shared by every in-flight request. Backends that are not
//! re-entrant must guard their own state (e.g. a `Mutex` around the decode
//! loop), or the server must be configured to run a single session at a time.
//!
//! ### Token streams
//! [`Engine::generate`] returns an owned, one-shot iterator. It must not borrow
//! the engine, so it can be moved onto a worker thread and dropped at any point
//! to abandon generation.

mod config;
mod handle;

use std::sync::Arc;

pub use config::{ModelConfig, DEFAULT_MODEL_FILE, DEFAULT_MODEL_NAME, DEFAULT_MODEL_TYPE};
pub use handle::{HandleState, ModelHandle};

pub type Result<T> = std::result::Result<T, EngineError>;

/// Token ID type (i32 for FFI compat; logically non-negative).
pub type TokenId = i32;

/// Lazy, finite, non-restartable sequence of generated tokens.
pub type TokenStream = Box<dyn Iterator<Item = Result<TokenId>> + Send>;

/// Top-level error type for all engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Model loading failed: {0}")]
    ModelLoad(String),
    #[error("Tokenization failed: {0}")]
    Tokenization(String),
    #[error("Generation failed: {0}")]
    Generation(String),
}

/// The core engine trait. Everything else plugs into this.
pub trait Engine: Send + Sync {
    /// Convert text into a sequence of token IDs.
    ///
    /// Rejected input (empty, oversized, unencodable) is reported as
    /// [`EngineError::Tokenization`].
    fn tokenize(&self, text: &str) -> Result<Vec<TokenId>>;

    /// Start generating from a tokenized prompt.
    fn generate(&self, tokens: &[TokenId]) -> Result<TokenStream>;

    /// Convert token IDs back into text.
    fn detokenize(&self, tokens: &[TokenId]) -> Result<String>;

    /// Whether `token` is the model's end-of-sequence marker.
    fn is_end_of_sequence(&self, token: TokenId) -> bool;

    /// Direct call: prompt in, full generated text out.
    ///
    /// The default drains [`Engine::generate`] up to the end-of-sequence token.
    fn complete(&self, prompt: &str) -> Result<String> {
        let tokens = self.tokenize(prompt)?;
        let mut generated = Vec::new();
        for token in self.generate(&tokens)? {
            let token = token?;
            if self.is_end_of_sequence(token) {
                break;
            }
            generated.push(token);
        }
        self.detokenize(&generated)
    }
}

/// Constructs an engine from configuration. Called at most once per
/// successful [`ModelHandle`] initialization; may be slow (disk + memory).
pub trait EngineLoader: Send + Sync {
    fn load(&self, config: &ModelConfig) -> Result<Arc<dyn Engine>>;
}

impl<F> EngineLoader for F
where
    F: Fn(&ModelConfig) -> Result<Arc<dyn Engine>> + Send + Sync,
{
    fn load(&self, config: &ModelConfig) -> Result<Arc<dyn Engine>> {
        self(config)
    }
}
