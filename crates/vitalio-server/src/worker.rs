//! Update worker seam.
//!
//! Subscription matching and delivery live outside this server; what lives
//! here is the seam they plug into: a handler trait receiving one envelope
//! at a time, and the drain tasks that feed it from the update channel.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use vitalio_core::{UpdateEnvelope, UpdateReceiver};

/// Consumer-side contract for update envelopes.
#[async_trait]
pub trait UpdateHandler: Send + Sync {
    async fn handle(&self, update: UpdateEnvelope);
}

/// Default handler: logs each update and nothing else.
pub struct LoggingHandler;

#[async_trait]
impl UpdateHandler for LoggingHandler {
    async fn handle(&self, update: UpdateEnvelope) {
        tracing::info!(
            subject_id = %update.subject_id,
            resource_type = %update.resource_type,
            occurred_at = %update.occurred_at,
            timestamp_source = update.timestamp_source.as_str(),
            "Resource update received"
        );
    }
}

/// Spawn `count` draining tasks over a shared receiver.
///
/// Receiver clones compete for envelopes, so each update reaches exactly one
/// handler invocation. Tasks exit when the channel closes.
pub fn spawn_workers(
    receiver: UpdateReceiver,
    count: usize,
    handler: Arc<dyn UpdateHandler>,
) -> Vec<JoinHandle<()>> {
    (0..count.max(1))
        .map(|index| {
            let receiver = receiver.clone();
            let handler = handler.clone();
            tokio::spawn(async move {
                while let Some(update) = receiver.recv().await {
                    handler.handle(update).await;
                }
                tracing::debug!(worker = index, "Update worker stopped; channel closed");
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use vitalio_core::{EventInstant, TimestampSource, update_channel};

    struct CountingHandler(AtomicUsize);

    #[async_trait]
    impl UpdateHandler for CountingHandler {
        async fn handle(&self, _update: UpdateEnvelope) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn envelope(subject: &str) -> UpdateEnvelope {
        UpdateEnvelope::new(
            subject,
            EventInstant::from_str("2015-04-01T00:00:00-04:00").unwrap(),
            "MedicationStatement",
            TimestampSource::CaptureTime,
        )
    }

    #[tokio::test]
    async fn workers_drain_every_envelope_exactly_once() {
        let (sender, receiver) = update_channel(16);
        let handler = Arc::new(CountingHandler(AtomicUsize::new(0)));

        let handles = spawn_workers(receiver, 3, handler.clone());

        for i in 0..10 {
            sender.try_publish(envelope(&format!("s{i}"))).unwrap();
        }
        drop(sender);

        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(handler.0.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn zero_worker_count_still_spawns_one() {
        let (sender, receiver) = update_channel(4);
        let handler = Arc::new(CountingHandler(AtomicUsize::new(0)));

        let handles = spawn_workers(receiver, 0, handler.clone());
        assert_eq!(handles.len(), 1);

        sender.try_publish(envelope("only")).unwrap();
        drop(sender);
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(handler.0.load(Ordering::SeqCst), 1);
    }
}
