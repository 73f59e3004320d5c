//! Where generation runs relative to the request that asked for it.
//!
//! - [`OffloadStrategy::Inline`]: the pipeline is pulled by the response body
//!   stream on the request's own task.
//! - [`OffloadStrategy::Worker`]: a blocking-pool thread re-acquires the engine,
//!   runs the pipeline and hands frames back through a one-slot channel, so a
//!   slow client slows the worker rather than buffering output.
//! - [`OffloadStrategy::Detached`]: a background task drains the pipeline and
//!   only logs the outcome; nothing flows back to the caller.
//!
//! Only the prompt string and [`GenerationParams`] cross into workers.

use std::sync::Arc;

use futures::stream::{BoxStream, StreamExt};
use llmgate_engine::ModelHandle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinError, JoinHandle};
use tokio_stream::wrappers::ReceiverStream;

use crate::error::ServerError;
use crate::pipeline::{FrameStream, GenerationParams, GenerationPipeline, StreamItem};
use crate::state::AppState;

pub type ItemResult = Result<StreamItem, ServerError>;

/// Frames on their way to a streaming adapter.
pub type FrameItems = BoxStream<'static, ItemResult>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffloadStrategy {
    Inline,
    Worker,
    Detached,
}

impl OffloadStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            OffloadStrategy::Inline => "inline",
            OffloadStrategy::Worker => "worker",
            OffloadStrategy::Detached => "detached",
        }
    }
}

/// Outcome of [`launch`].
pub enum Launch {
    Stream(FrameItems),
    Detached(JoinHandle<()>),
}

/// Start a generation under `strategy`.
pub async fn launch(
    state: &AppState,
    prompt: String,
    params: GenerationParams,
    strategy: OffloadStrategy,
) -> Result<Launch, ServerError> {
    tracing::debug!(offload = strategy.as_str(), "starting generation");
    match strategy {
        OffloadStrategy::Inline => inline(state, prompt, params).await.map(Launch::Stream),
        OffloadStrategy::Worker => worker(state, prompt, params).await.map(Launch::Stream),
        OffloadStrategy::Detached => detached(state, prompt, params).map(Launch::Detached),
    }
}

/// Tokenize and start generation on the calling task; frames are produced
/// as the response body is polled.
pub async fn inline(
    state: &AppState,
    prompt: String,
    params: GenerationParams,
) -> Result<FrameItems, ServerError> {
    let guard = state
        .sessions
        .try_acquire()
        .ok_or(ServerError::ServiceUnavailable)?;
    let engine = state.model.acquire_async().await?;
    let frames = GenerationPipeline::new(engine)
        .with_model(state.model.config().name.clone())
        .run(&prompt, params)?;
    let cancel = guard.cancellation_token();

    let stream = async_stream::stream! {
        // Keep the session alive for the lifetime of the stream.
        let _guard = guard;
        for item in frames {
            if cancel.is_cancelled() {
                tracing::debug!("generation cancelled");
                break;
            }
            yield item.map_err(ServerError::from);
        }
    };
    Ok(stream.boxed())
}

/// Run acquire + tokenize + generate on the blocking pool.
///
/// Errors raised before the first frame come back as `Err` so the handler can
/// still answer with a status code. Later errors travel in-band.
pub async fn worker(
    state: &AppState,
    prompt: String,
    params: GenerationParams,
) -> Result<FrameItems, ServerError> {
    let guard = state
        .sessions
        .try_acquire()
        .ok_or(ServerError::ServiceUnavailable)?;
    let model = Arc::clone(&state.model);
    let (tx, rx) = mpsc::channel::<ItemResult>(1);
    let (started_tx, started_rx) = oneshot::channel::<Result<(), ServerError>>();

    let task = tokio::task::spawn_blocking(move || {
        let cancel = guard.cancellation_token();
        let frames = match start_pipeline(&model, &prompt, params) {
            Ok(frames) => {
                let _ = started_tx.send(Ok(()));
                frames
            }
            Err(err) => {
                // Free the slot before the handler answers.
                drop(guard);
                let _ = started_tx.send(Err(err));
                return;
            }
        };
        let _guard = guard;
        for item in frames {
            if cancel.is_cancelled() {
                tracing::debug!("generation cancelled");
                return;
            }
            // A closed channel means the response body was dropped.
            if tx.blocking_send(item.map_err(ServerError::from)).is_err() {
                tracing::debug!("client disconnected, abandoning generation");
                return;
            }
        }
    });

    match started_rx.await {
        Ok(Ok(())) => Ok(ReceiverStream::new(rx).boxed()),
        Ok(Err(err)) => Err(err),
        Err(_) => Err(worker_failure(task.await)),
    }
}

/// Generate in the background with no return channel to the caller.
///
/// Accepted work waits for a session slot instead of being rejected, since
/// nobody is waiting on the response. Acceptance itself is bounded by the
/// session manager's backlog: when it is full the caller gets
/// [`ServerError::ServiceUnavailable`] and nothing is spawned.
pub fn detached(
    state: &AppState,
    prompt: String,
    params: GenerationParams,
) -> Result<JoinHandle<()>, ServerError> {
    let ticket = state.sessions.try_enqueue().ok_or_else(|| {
        tracing::warn!(
            max_backlog = state.sessions.max_backlog(),
            "background backlog full, rejecting generation"
        );
        ServerError::ServiceUnavailable
    })?;
    let model = Arc::clone(&state.model);
    let sessions = Arc::clone(&state.sessions);

    Ok(tokio::spawn(async move {
        let _ticket = ticket;
        let guard = sessions.acquire().await;
        let session_id = guard.session_id();

        let outcome = tokio::task::spawn_blocking(move || -> Result<usize, ServerError> {
            let cancel = guard.cancellation_token();
            let _guard = guard;
            let mut frames = 0usize;
            for item in start_pipeline(&model, &prompt, params)? {
                if cancel.is_cancelled() {
                    break;
                }
                if let StreamItem::Frame(_) = item? {
                    frames += 1;
                }
            }
            Ok(frames)
        })
        .await;

        match outcome {
            Ok(Ok(frames)) => {
                tracing::info!(%session_id, frames, "background generation finished")
            }
            Ok(Err(err)) => {
                tracing::error!(%session_id, error = %err, "background generation failed")
            }
            Err(err) => {
                tracing::error!(%session_id, error = %err, "background generation worker failed")
            }
        }
    }))
}

/// Direct call on the blocking pool: prompt in, full text out.
pub async fn complete(state: &AppState, prompt: String) -> Result<String, ServerError> {
    let guard = state
        .sessions
        .try_acquire()
        .ok_or(ServerError::ServiceUnavailable)?;
    let model = Arc::clone(&state.model);

    tokio::task::spawn_blocking(move || -> Result<String, ServerError> {
        let _guard = guard;
        let engine = model.acquire()?;
        Ok(engine.complete(&prompt)?)
    })
    .await
    .map_err(|e| worker_failure(Err(e)))?
}

fn start_pipeline(
    model: &ModelHandle,
    prompt: &str,
    params: GenerationParams,
) -> Result<FrameStream, ServerError> {
    let engine = model.acquire()?;
    let frames = GenerationPipeline::new(engine)
        .with_model(model.config().name.clone())
        .run(prompt, params)?;
    Ok(frames)
}

fn worker_failure(joined: Result<(), JoinError>) -> ServerError {
    match joined {
        Err(err) => ServerError::Generation(format!("worker failed: {}", err)),
        Ok(()) => ServerError::Generation("worker exited before starting".to_string()),
    }
}
