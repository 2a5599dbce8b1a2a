//! Background relay workers feeding the local queue back into the pipeline.

use std::sync::Arc;

use courier_core::message::Payload;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::sending::LocalQueue;
use crate::service::MessageService;

/// Spawns `workers` tasks that process envelopes from `queue` until it is
/// closed and drained.
///
/// Envelopes for distinct aggregates are processed concurrently; the
/// dispatcher serializes envelopes for the same aggregate. A failed envelope
/// is logged and dropped.
#[must_use]
pub fn spawn_relay_workers(
    service: Arc<MessageService>,
    queue: Arc<LocalQueue>,
    workers: usize,
) -> Vec<JoinHandle<()>> {
    (0..workers)
        .map(|worker| {
            let service = Arc::clone(&service);
            let queue = Arc::clone(&queue);
            tokio::spawn(async move {
                debug!(worker, "relay worker started");
                while let Some(envelope) = queue.dequeue().await {
                    let message_id = envelope.message_id();
                    if let Err(failure) = service.process(Payload::new(envelope)).await {
                        error!(worker, %message_id, %failure, "relayed message dropped");
                    }
                }
                debug!(worker, "relay worker stopped");
            })
        })
        .collect()
}
