//! Bounded dispatch channel between watch interceptors and workers.
//!
//! Built on tokio's bounded mpsc channel. Senders are cheap clones, one per
//! interceptor; publishing is strictly non-blocking, and a send against a
//! full channel drops the envelope and bumps a shared counter rather than
//! ever stalling the producing request. The receive side is shareable so
//! several workers can drain with competing-consumer semantics: every
//! envelope is delivered to exactly one of them.
//!
//! Ordering is FIFO per sender; interleaving across senders is unspecified.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;
use tokio::sync::{Mutex, mpsc};

use crate::envelope::UpdateEnvelope;

/// Errors from a publish attempt. Both are recoverable: callers log and move
/// on, and nothing here ever reaches the request's own error path.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("update channel is full; envelope dropped")]
    ChannelFull,

    #[error("update channel is closed")]
    Closed,
}

/// Create a bounded update channel with the given capacity.
///
/// Capacity is fixed for the life of the channel. Panics if `capacity` is
/// zero (a zero-capacity channel could never accept a non-blocking send).
pub fn update_channel(capacity: usize) -> (UpdateSender, UpdateReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    let dropped = Arc::new(AtomicU64::new(0));
    (
        UpdateSender { tx, dropped },
        UpdateReceiver {
            rx: Arc::new(Mutex::new(rx)),
        },
    )
}

/// Write end of the dispatch channel.
///
/// This is the only handle a watch interceptor receives; there is no way to
/// read from it, which keeps the flow one-directional by construction.
#[derive(Clone)]
pub struct UpdateSender {
    tx: mpsc::Sender<UpdateEnvelope>,
    dropped: Arc<AtomicU64>,
}

impl UpdateSender {
    /// Attempt a non-blocking publish.
    ///
    /// Returns immediately regardless of consumer health. A full channel
    /// drops the envelope and increments the shared drop counter.
    pub fn try_publish(&self, envelope: UpdateEnvelope) -> Result<(), PublishError> {
        match self.tx.try_send(envelope) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                Err(PublishError::ChannelFull)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(PublishError::Closed),
        }
    }

    /// Total envelopes dropped on a full channel, across all sender clones.
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// The fixed capacity the channel was created with.
    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }
}

impl std::fmt::Debug for UpdateSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateSender")
            .field("capacity", &self.capacity())
            .field("dropped", &self.dropped_count())
            .finish()
    }
}

/// Read end of the dispatch channel.
///
/// Clones share the underlying receiver behind an async mutex, so multiple
/// workers compete for envelopes rather than each seeing every one.
#[derive(Clone)]
pub struct UpdateReceiver {
    rx: Arc<Mutex<mpsc::Receiver<UpdateEnvelope>>>,
}

impl UpdateReceiver {
    /// Receive the next envelope, waiting until one is available.
    ///
    /// Returns `None` once all senders are dropped and the channel is
    /// drained.
    pub async fn recv(&self) -> Option<UpdateEnvelope> {
        self.rx.lock().await.recv().await
    }

    /// Receive without waiting. Returns `None` when the channel is empty or
    /// another clone currently holds the receiver.
    pub fn try_recv(&self) -> Option<UpdateEnvelope> {
        self.rx.try_lock().ok()?.try_recv().ok()
    }
}

impl std::fmt::Debug for UpdateReceiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateReceiver").finish_non_exhaustive()
    }
}
