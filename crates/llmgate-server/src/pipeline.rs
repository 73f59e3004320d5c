//! Transport-agnostic generation pipeline.
//!
//! `run` tokenizes and starts generation eagerly, so input and start-up errors
//! surface before any frame exists. The returned [`FrameStream`] is pulled one
//! item at a time: each `next()` asks the engine for exactly one chunk,
//! detokenizes it and wraps it in a [`ResponseFrame`]. Once the engine's
//! sequence is exhausted it yields a single [`StreamItem::Done`].

use std::sync::Arc;

use llmgate_engine::{Engine, EngineError, Result, TokenId, TokenStream};
use llmgate_runtime::{InferenceTimer, TelemetryHook, TracingTelemetry};

use crate::models::{ChatMessage, FinishReason, ResponseFrame};

/// Flatten chat messages into one prompt: contents joined by a single space,
/// in order. Roles are dropped.
pub fn combine_messages(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .map(|msg| msg.content.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GenerationParams {
    /// Stop after this many content frames. `None` drains the engine.
    pub max_tokens: Option<usize>,
}

impl GenerationParams {
    pub fn with_max_tokens(max_tokens: usize) -> Self {
        Self {
            max_tokens: Some(max_tokens),
        }
    }
}

/// One item of a generation: a content frame or the terminal sentinel.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamItem {
    Frame(ResponseFrame),
    Done,
}

pub struct GenerationPipeline {
    engine: Arc<dyn Engine>,
    model: String,
    telemetry: Arc<dyn TelemetryHook>,
}

impl GenerationPipeline {
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self {
            engine,
            model: String::new(),
            telemetry: Arc::new(TracingTelemetry),
        }
    }

    /// Model name reported in telemetry.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_telemetry(mut self, telemetry: Arc<dyn TelemetryHook>) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn run(&self, prompt: &str, params: GenerationParams) -> Result<FrameStream> {
        let tokens = self.engine.tokenize(prompt)?;
        if tokens.is_empty() {
            return Err(EngineError::Tokenization(
                "prompt produced no tokens".to_string(),
            ));
        }
        let timer = InferenceTimer::new(self.model.clone(), tokens.len(), Arc::clone(&self.telemetry));
        let chunks = self.engine.generate(&tokens).map_err(into_generation)?;

        Ok(FrameStream {
            engine: Arc::clone(&self.engine),
            chunks: Some(chunks),
            remaining: params.max_tokens,
            timer: Some(timer),
        })
    }
}

/// Lazy, one-shot sequence of frames for a single request.
///
/// Dropping it abandons the underlying token stream.
pub struct FrameStream {
    engine: Arc<dyn Engine>,
    chunks: Option<TokenStream>,
    remaining: Option<usize>,
    timer: Option<InferenceTimer>,
}

impl FrameStream {
    fn frame_for(&self, token: TokenId) -> Result<ResponseFrame> {
        let content = self.engine.detokenize(&[token]).map_err(into_generation)?;
        let finish_reason = if self.engine.is_end_of_sequence(token) {
            FinishReason::Stop
        } else {
            FinishReason::Unknown
        };
        Ok(ResponseFrame::new(content, finish_reason))
    }

    fn finish(&mut self) -> StreamItem {
        self.chunks = None;
        if let Some(timer) = self.timer.take() {
            timer.finish();
        }
        StreamItem::Done
    }

    fn fail(&mut self, err: EngineError) -> EngineError {
        self.chunks = None;
        if let Some(timer) = self.timer.take() {
            tracing::warn!(
                generated_tokens = timer.token_count(),
                error = %err,
                "generation aborted"
            );
        }
        err
    }
}

impl Iterator for FrameStream {
    type Item = Result<StreamItem>;

    fn next(&mut self) -> Option<Self::Item> {
        let chunks = self.chunks.as_mut()?;

        if self.remaining == Some(0) {
            return Some(Ok(self.finish()));
        }

        match chunks.next() {
            None => Some(Ok(self.finish())),
            Some(Err(err)) => Some(Err(self.fail(into_generation(err)))),
            Some(Ok(token)) => {
                if let Some(remaining) = self.remaining.as_mut() {
                    *remaining -= 1;
                }
                if let Some(timer) = self.timer.as_mut() {
                    timer.mark_token();
                }
                match self.frame_for(token) {
                    Ok(frame) => Some(Ok(StreamItem::Frame(frame))),
                    Err(err) => Some(Err(self.fail(err))),
                }
            }
        }
    }
}

/// Anything that goes wrong after tokenization is a generation failure.
fn into_generation(err: EngineError) -> EngineError {
    match err {
        EngineError::Generation(_) => err,
        other => EngineError::Generation(other.to_string()),
    }
}
