//! Lazily constructed, process-wide engine handle.
//!
//! The handle starts `Uninitialized`. The first [`ModelHandle::acquire`] moves it
//! to `Initializing` and runs the loader with the state lock released; callers
//! that arrive meanwhile park on a condvar. Success moves it to `Ready` for the
//! rest of the process lifetime (there is no unload). Failure, or a panicking
//! loader, puts it back to `Uninitialized` so a later request can retry.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use crate::{Engine, EngineError, EngineLoader, ModelConfig, Result};

/// Observable lifecycle state of a [`ModelHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    Uninitialized,
    Initializing,
    Ready,
}

impl HandleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            HandleState::Uninitialized => "uninitialized",
            HandleState::Initializing => "initializing",
            HandleState::Ready => "ready",
        }
    }
}

enum Slot {
    Uninitialized,
    Initializing,
    Ready(Arc<dyn Engine>),
}

/// Owns at most one live engine instance.
pub struct ModelHandle {
    config: ModelConfig,
    loader: Arc<dyn EngineLoader>,
    slot: Mutex<Slot>,
    changed: Condvar,
}

/// Reverts an in-progress initialization unless disarmed.
struct InitGuard<'a> {
    handle: &'a ModelHandle,
    armed: bool,
}

impl Drop for InitGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            *self.handle.lock() = Slot::Uninitialized;
            self.handle.changed.notify_all();
        }
    }
}

impl ModelHandle {
    pub fn new(config: ModelConfig, loader: Arc<dyn EngineLoader>) -> Self {
        Self {
            config,
            loader,
            slot: Mutex::new(Slot::Uninitialized),
            changed: Condvar::new(),
        }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn state(&self) -> HandleState {
        match *self.lock() {
            Slot::Uninitialized => HandleState::Uninitialized,
            Slot::Initializing => HandleState::Initializing,
            Slot::Ready(_) => HandleState::Ready,
        }
    }

    /// The engine, if it has already been constructed.
    pub fn engine(&self) -> Option<Arc<dyn Engine>> {
        match &*self.lock() {
            Slot::Ready(engine) => Some(Arc::clone(engine)),
            _ => None,
        }
    }

    /// Return the engine, constructing it on first use.
    ///
    /// Blocks the calling thread while another caller is initializing.
    pub fn acquire(&self) -> Result<Arc<dyn Engine>> {
        let mut slot = self.lock();
        loop {
            let initializing = match &*slot {
                Slot::Ready(engine) => return Ok(Arc::clone(engine)),
                Slot::Initializing => true,
                Slot::Uninitialized => false,
            };
            if !initializing {
                break;
            }
            slot = self
                .changed
                .wait(slot)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *slot = Slot::Initializing;
        drop(slot);

        let mut guard = InitGuard {
            handle: self,
            armed: true,
        };

        tracing::info!(
            name = %self.config.name,
            file = %self.config.file,
            kind = %self.config.kind,
            "loading model"
        );
        let start = Instant::now();
        let engine = self.loader.load(&self.config).map_err(|err| {
            tracing::error!(error = %err, "model load failed");
            match err {
                EngineError::ModelLoad(_) => err,
                other => EngineError::ModelLoad(other.to_string()),
            }
        })?;

        guard.armed = false;
        *self.lock() = Slot::Ready(Arc::clone(&engine));
        self.changed.notify_all();

        tracing::info!(
            name = %self.config.name,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "model ready"
        );
        Ok(engine)
    }

    /// [`acquire`](Self::acquire) from async code: a cold handle is
    /// initialized on the blocking pool instead of the calling task.
    pub async fn acquire_async(self: &Arc<Self>) -> Result<Arc<dyn Engine>> {
        if let Some(engine) = self.engine() {
            return Ok(engine);
        }
        let handle = Arc::clone(self);
        tokio::task::spawn_blocking(move || handle.acquire())
            .await
            .map_err(|e| EngineError::ModelLoad(format!("loader task failed: {}", e)))?
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{TokenId, TokenStream};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::time::Duration;

    struct NullEngine;

    impl Engine for NullEngine {
        fn tokenize(&self, text: &str) -> Result<Vec<TokenId>> {
            Ok(text.bytes().map(TokenId::from).collect())
        }

        fn generate(&self, _tokens: &[TokenId]) -> Result<TokenStream> {
            Ok(Box::new(std::iter::empty()))
        }

        fn detokenize(&self, _tokens: &[TokenId]) -> Result<String> {
            Ok(String::new())
        }

        fn is_end_of_sequence(&self, _token: TokenId) -> bool {
            false
        }
    }

    fn counting_loader(count: Arc<AtomicUsize>, delay: Duration) -> Arc<dyn EngineLoader> {
        Arc::new(move |_: &ModelConfig| -> Result<Arc<dyn Engine>> {
            count.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(delay);
            Ok(Arc::new(NullEngine))
        })
    }

    #[test]
    fn starts_uninitialized_and_becomes_ready() {
        let count = Arc::new(AtomicUsize::new(0));
        let handle = ModelHandle::new(
            ModelConfig::default(),
            counting_loader(count.clone(), Duration::ZERO),
        );
        assert_eq!(handle.state(), HandleState::Uninitialized);
        assert!(handle.engine().is_none());

        handle.acquire().unwrap();
        assert_eq!(handle.state(), HandleState::Ready);
        assert!(handle.engine().is_some());

        handle.acquire().unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn concurrent_cold_acquire_constructs_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let handle = Arc::new(ModelHandle::new(
            ModelConfig::default(),
            counting_loader(count.clone(), Duration::from_millis(50)),
        ));
        let barrier = Arc::new(Barrier::new(16));

        let threads: Vec<_> = (0..16)
            .map(|_| {
                let handle = handle.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    handle.acquire().unwrap()
                })
            })
            .collect();

        let engines: Vec<_> = threads.into_iter().map(|t| t.join().unwrap()).collect();
        assert_eq!(count.load(Ordering::SeqCst), 1);
        for engine in &engines[1..] {
            assert!(Arc::ptr_eq(&engines[0], engine));
        }
    }

    #[test]
    fn failed_load_leaves_handle_retryable() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        let loader = move |_: &ModelConfig| -> Result<Arc<dyn Engine>> {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(EngineError::ModelLoad("missing file".to_string()))
            } else {
                Ok(Arc::new(NullEngine))
            }
        };
        let handle = ModelHandle::new(ModelConfig::default(), Arc::new(loader));

        let err = handle.acquire().err().unwrap();
        assert!(matches!(err, EngineError::ModelLoad(ref m) if m == "missing file"));
        assert_eq!(handle.state(), HandleState::Uninitialized);

        handle.acquire().unwrap();
        assert_eq!(handle.state(), HandleState::Ready);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn loader_errors_are_reported_as_model_load() {
        let loader = |_: &ModelConfig| -> Result<Arc<dyn Engine>> {
            Err(EngineError::Generation("backend crashed".to_string()))
        };
        let handle = ModelHandle::new(ModelConfig::default(), Arc::new(loader));
        let err = handle.acquire().err().unwrap();
        assert!(matches!(err, EngineError::ModelLoad(_)));
    }

    #[test]
    fn panicking_loader_resets_state() {
        let loader = |_: &ModelConfig| -> Result<Arc<dyn Engine>> { panic!("loader blew up") };
        let handle = ModelHandle::new(ModelConfig::default(), Arc::new(loader));

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| handle.acquire()));
        assert!(outcome.is_err());
        assert_eq!(handle.state(), HandleState::Uninitialized);
    }

    #[tokio::test]
    async fn acquire_async_initializes_off_task() {
        let count = Arc::new(AtomicUsize::new(0));
        let handle = Arc::new(ModelHandle::new(
            ModelConfig::default(),
            counting_loader(count.clone(), Duration::from_millis(5)),
        ));
        handle.acquire_async().await.unwrap();
        handle.acquire_async().await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(handle.state(), HandleState::Ready);
    }
}
