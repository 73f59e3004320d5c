//! Session lifecycle management for generation requests.
//!
//! Every generation (streamed, direct or detached) holds a session slot for as
//! long as it runs. The slot count bounds how many generations share the
//! engine at once, and each session carries a cancellation token that the
//! generation loop checks between chunks.
//!
//! Background generations additionally hold a [`BacklogTicket`] from the
//! moment they are accepted until they finish, which bounds how much detached
//! work (waiting or running) can pile up.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Tracks active generation sessions and controls concurrency.
pub struct SessionManager {
    /// Active sessions keyed by session ID.
    active: Mutex<HashMap<Uuid, CancellationToken>>,
    /// Semaphore limiting concurrent generations.
    concurrency_limit: Arc<Semaphore>,
    max_concurrent: usize,
    /// Semaphore limiting accepted background generations.
    backlog: Arc<Semaphore>,
    max_backlog: usize,
}

/// A reserved place in the background backlog, released on drop.
pub struct BacklogTicket {
    _permit: OwnedSemaphorePermit,
}

/// Releases the session slot when dropped.
///
/// When the HTTP connection drops (client disconnect), the response stream
/// holding this guard is dropped and the slot is freed; the token is
/// cancelled so a worker still pulling chunks stops at the next one.
pub struct SessionGuard {
    session_id: Uuid,
    cancel: CancellationToken,
    manager: Arc<SessionManager>,
    _permit: OwnedSemaphorePermit,
}

impl SessionGuard {
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Get a clone of the cancellation token to check in generation loops.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.manager.remove_session(self.session_id);
    }
}

impl SessionManager {
    /// Backlog defaults to `max_concurrent`.
    pub fn new(max_concurrent: usize) -> Arc<Self> {
        Self::with_backlog(max_concurrent, max_concurrent)
    }

    pub fn with_backlog(max_concurrent: usize, max_backlog: usize) -> Arc<Self> {
        Arc::new(Self {
            active: Mutex::new(HashMap::new()),
            concurrency_limit: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
            backlog: Arc::new(Semaphore::new(max_backlog)),
            max_backlog,
        })
    }

    /// Reserve a backlog place for background work. Returns None if full.
    pub fn try_enqueue(&self) -> Option<BacklogTicket> {
        let permit = Arc::clone(&self.backlog).try_acquire_owned().ok()?;
        Some(BacklogTicket { _permit: permit })
    }

    /// Acquire a session slot, waiting for one to free up.
    pub async fn acquire(self: &Arc<Self>) -> SessionGuard {
        let permit = Arc::clone(&self.concurrency_limit)
            .acquire_owned()
            .await
            .expect("semaphore not closed");
        self.register(permit)
    }

    /// Try to acquire without waiting. Returns None if at capacity.
    pub fn try_acquire(self: &Arc<Self>) -> Option<SessionGuard> {
        let permit = Arc::clone(&self.concurrency_limit).try_acquire_owned().ok()?;
        Some(self.register(permit))
    }

    fn register(self: &Arc<Self>, permit: OwnedSemaphorePermit) -> SessionGuard {
        let session_id = Uuid::new_v4();
        let cancel = CancellationToken::new();
        self.lock_active().insert(session_id, cancel.clone());
        tracing::debug!(%session_id, "session started");
        SessionGuard {
            session_id,
            cancel,
            manager: Arc::clone(self),
            _permit: permit,
        }
    }

    fn remove_session(&self, id: Uuid) {
        self.lock_active().remove(&id);
        tracing::debug!(session_id = %id, "session finished");
    }

    /// Cancel every active session (used on shutdown).
    pub fn cancel_all(&self) {
        for token in self.lock_active().values() {
            token.cancel();
        }
    }

    pub fn active_count(&self) -> usize {
        self.lock_active().len()
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Number of available slots.
    pub fn available_permits(&self) -> usize {
        self.concurrency_limit.available_permits()
    }

    /// Background generations accepted and not yet finished.
    pub fn queued_count(&self) -> usize {
        self.max_backlog - self.backlog.available_permits()
    }

    pub fn max_backlog(&self) -> usize {
        self.max_backlog
    }

    fn lock_active(&self) -> MutexGuard<'_, HashMap<Uuid, CancellationToken>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn try_acquire_respects_limit() {
        let sessions = SessionManager::new(2);
        let a = sessions.try_acquire().unwrap();
        let _b = sessions.try_acquire().unwrap();
        assert!(sessions.try_acquire().is_none());
        assert_eq!(sessions.active_count(), 2);
        assert_eq!(sessions.available_permits(), 0);

        drop(a);
        assert_eq!(sessions.active_count(), 1);
        assert!(sessions.try_acquire().is_some());
    }

    #[test]
    fn dropping_guard_cancels_token() {
        let sessions = SessionManager::new(1);
        let guard = sessions.try_acquire().unwrap();
        let token = guard.cancellation_token();
        assert!(!token.is_cancelled());
        drop(guard);
        assert!(token.is_cancelled());
    }

    #[test]
    fn cancel_all_reaches_active_sessions() {
        let sessions = SessionManager::new(3);
        let guards: Vec<_> = (0..3).map(|_| sessions.try_acquire().unwrap()).collect();
        sessions.cancel_all();
        assert!(guards.iter().all(|g| g.cancellation_token().is_cancelled()));
    }

    #[test]
    fn backlog_is_bounded_independently_of_slots() {
        let sessions = SessionManager::with_backlog(1, 2);
        let a = sessions.try_enqueue().unwrap();
        let _b = sessions.try_enqueue().unwrap();
        assert!(sessions.try_enqueue().is_none());
        assert_eq!(sessions.queued_count(), 2);
        // Streaming slots are untouched.
        assert!(sessions.try_acquire().is_some());

        drop(a);
        assert_eq!(sessions.queued_count(), 1);
        assert!(sessions.try_enqueue().is_some());
    }

    #[tokio::test]
    async fn acquire_waits_for_a_free_slot() {
        let sessions = SessionManager::new(1);
        let first = sessions.try_acquire().unwrap();

        let waiter = {
            let sessions = sessions.clone();
            tokio::spawn(async move { sessions.acquire().await.session_id() })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        let first_id = first.session_id();
        drop(first);
        let second_id = waiter.await.unwrap();
        assert_ne!(first_id, second_id);
    }
}
