//! Telemetry hooks for generation performance measurement.
//!
//! Provides:
//! - [`InferenceMetrics`] — TTFT, tokens/sec, and generation summary
//! - [`TelemetryHook`] trait — callback interface for real-time metric reporting
//! - [`InferenceTimer`] — records timestamps and computes metrics
//! - [`NoopTelemetry`] / [`LogTelemetry`] / [`TracingTelemetry`] — built-in hooks

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

/// Aggregate metrics from a generation run.
#[derive(Debug, Clone)]
pub struct InferenceMetrics {
    /// Model the run was served by.
    pub model: String,
    /// Time from start until the first generated token, in milliseconds.
    pub ttft_ms: f64,
    /// Tokens generated per second after the first token.
    pub tokens_per_sec: f64,
    /// Number of prompt tokens.
    pub prompt_tokens: usize,
    /// Number of tokens generated.
    pub generated_tokens: usize,
    /// Total wall-clock time in milliseconds.
    pub total_time_ms: f64,
}

/// Callback trait for real-time inference telemetry.
///
/// All methods have default no-op implementations so hooks can be selective.
pub trait TelemetryHook: Send + Sync {
    /// Called when the first token arrives.
    fn on_first_token(&self, _ttft_ms: f64) {}

    /// Called after each generated token.
    fn on_token_generated(&self, _token_idx: usize, _elapsed_ms: f64) {}

    /// Called when generation finishes with the full metrics summary.
    fn on_generation_complete(&self, _metrics: &InferenceMetrics) {}
}

/// No-op telemetry hook.
#[derive(Debug, Clone, Copy)]
pub struct NoopTelemetry;

impl TelemetryHook for NoopTelemetry {}

/// Keeps the last completed report for later retrieval.
#[derive(Debug, Clone, Default)]
pub struct LogTelemetry {
    last_report: Arc<Mutex<Option<InferenceMetrics>>>,
}

impl LogTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retrieve the last completed generation's metrics.
    pub fn last_metrics(&self) -> Option<InferenceMetrics> {
        self.last_report
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl TelemetryHook for LogTelemetry {
    fn on_generation_complete(&self, metrics: &InferenceMetrics) {
        *self.last_report.lock().unwrap_or_else(PoisonError::into_inner) = Some(metrics.clone());
    }
}

/// Emits one `tracing` event per completed generation.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTelemetry;

impl TelemetryHook for TracingTelemetry {
    fn on_generation_complete(&self, metrics: &InferenceMetrics) {
        tracing::info!(
            model = %metrics.model,
            prompt_tokens = metrics.prompt_tokens,
            generated_tokens = metrics.generated_tokens,
            ttft_ms = metrics.ttft_ms,
            tokens_per_sec = metrics.tokens_per_sec,
            total_time_ms = metrics.total_time_ms,
            "generation complete"
        );
    }
}

/// Records timestamps during generation to compute [`InferenceMetrics`].
///
/// Usage:
/// 1. Call [`InferenceTimer::new`] at generation start
/// 2. Call [`mark_token`](InferenceTimer::mark_token) for each generated token
/// 3. Call [`finish`](InferenceTimer::finish) to compute final metrics
pub struct InferenceTimer {
    model: String,
    prompt_tokens: usize,
    start: Instant,
    first_token: Option<Instant>,
    token_count: usize,
    hook: Arc<dyn TelemetryHook>,
}

impl InferenceTimer {
    pub fn new(model: impl Into<String>, prompt_tokens: usize, hook: Arc<dyn TelemetryHook>) -> Self {
        Self {
            model: model.into(),
            prompt_tokens,
            start: Instant::now(),
            first_token: None,
            token_count: 0,
            hook,
        }
    }

    /// Mark a token generated. The first call also fires `on_first_token`.
    pub fn mark_token(&mut self) {
        let now = Instant::now();
        if self.first_token.is_none() {
            self.first_token = Some(now);
            self.hook
                .on_first_token(now.duration_since(self.start).as_secs_f64() * 1000.0);
        }
        self.token_count += 1;
        let elapsed_ms = now.duration_since(self.start).as_secs_f64() * 1000.0;
        self.hook.on_token_generated(self.token_count, elapsed_ms);
    }

    pub fn token_count(&self) -> usize {
        self.token_count
    }

    /// Finalize and return metrics. Fires `on_generation_complete`.
    pub fn finish(self) -> InferenceMetrics {
        let total_time_ms = self.start.elapsed().as_secs_f64() * 1000.0;

        let ttft_ms = self
            .first_token
            .map(|t| t.duration_since(self.start).as_secs_f64() * 1000.0)
            .unwrap_or(0.0);

        let decode_time_ms = total_time_ms - ttft_ms;
        let tokens_per_sec = if decode_time_ms > 0.0 && self.token_count > 0 {
            self.token_count as f64 / (decode_time_ms / 1000.0)
        } else {
            0.0
        };

        let metrics = InferenceMetrics {
            model: self.model,
            ttft_ms,
            tokens_per_sec,
            prompt_tokens: self.prompt_tokens,
            generated_tokens: self.token_count,
            total_time_ms,
        };

        self.hook.on_generation_complete(&metrics);
        metrics
    }
}
