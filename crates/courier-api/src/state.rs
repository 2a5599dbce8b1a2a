//! Shared application state.

use std::fmt;
use std::sync::Arc;

use courier_core::clock::Clock;
use courier_core::repository::EventRepository;
use courier_messaging::{LocalQueue, MessageService, MessagingError};
use courier_shipping::routing::message_service;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The shipping message pipeline.
    pub service: Arc<MessageService>,
    /// Event store backing the pipeline, used directly by queries.
    pub event_repository: Arc<dyn EventRepository>,
    /// Queue receiving relayed messages; drained by the relay workers.
    pub queue: Arc<LocalQueue>,
}

impl AppState {
    /// Wires the shipping pipeline over `event_repository`.
    ///
    /// # Errors
    ///
    /// Returns a registration error if the shipping aggregates cannot be
    /// registered with the dispatcher.
    pub fn new(
        event_repository: Arc<dyn EventRepository>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, MessagingError> {
        let queue = Arc::new(LocalQueue::new());
        let service = message_service(
            Arc::clone(&event_repository),
            clock,
            Arc::clone(&queue),
        )?;
        Ok(Self {
            service: Arc::new(service),
            event_repository,
            queue,
        })
    }
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("service", &self.service)
            .field("queued", &self.queue.len())
            .finish_non_exhaustive()
    }
}
