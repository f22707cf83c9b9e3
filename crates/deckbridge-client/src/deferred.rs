//! Single-assignment completions.
//!
//! [`deferred`] splits a result slot into a [`Resolver`] that settles it and a
//! [`Completion`] future that observes it. Only the first settle has any
//! effect. The completion is woken through the runtime, so it never settles
//! inside the call that resolves it.

use crate::ClientError;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};
use tokio::sync::oneshot;

type Slot<T> = Arc<Mutex<Option<oneshot::Sender<Result<T, ClientError>>>>>;

/// Create a pending completion and the handle that settles it.
pub fn deferred<T>() -> (Resolver<T>, Completion<T>) {
    let (tx, rx) = oneshot::channel();
    (
        Resolver {
            slot: Arc::new(Mutex::new(Some(tx))),
        },
        Completion { rx },
    )
}

/// Settles a [`Completion`]. Cloning shares the same slot.
pub struct Resolver<T> {
    slot: Slot<T>,
}

impl<T> Clone for Resolver<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T> std::fmt::Debug for Resolver<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("settled", &self.is_settled())
            .finish()
    }
}

impl<T> Resolver<T> {
    /// Resolve with a value. Returns `false` if already settled.
    pub fn resolve(&self, value: T) -> bool {
        self.settle(Ok(value))
    }

    /// Reject with an error. Returns `false` if already settled.
    pub fn reject(&self, error: ClientError) -> bool {
        self.settle(Err(error))
    }

    pub fn is_settled(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    fn settle(&self, result: Result<T, ClientError>) -> bool {
        let sender = self.slot.lock().unwrap_or_else(PoisonError::into_inner).take();
        match sender {
            Some(tx) => {
                // The receiver may already be gone; the slot is settled either way.
                let _ = tx.send(result);
                true
            }
            None => false,
        }
    }
}

/// Future side of [`deferred`].
///
/// Yields [`ClientError::Abandoned`] if every [`Resolver`] is dropped
/// without settling.
#[derive(Debug)]
#[must_use = "completions do nothing unless awaited"]
pub struct Completion<T> {
    rx: oneshot::Receiver<Result<T, ClientError>>,
}

impl<T> Completion<T> {
    /// A completion that is already rejected.
    pub fn failed(error: ClientError) -> Self {
        let (resolver, completion) = deferred();
        resolver.reject(error);
        completion
    }
}

impl<T> Future for Completion<T> {
    type Output = Result<T, ClientError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(ClientError::Abandoned)))
    }
}
