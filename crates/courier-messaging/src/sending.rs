//! Sending chain: relays committed outbound sends as new envelopes.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use courier_core::envelope::Envelope;
use tokio::sync::Notify;
use tracing::debug;

use crate::context::OutboundSend;
use crate::error::MessagingError;

/// Delivers relayed envelopes, in process or to an external transport.
#[async_trait]
pub trait SendingStrategy: Send + Sync {
    /// Hands `envelopes` over for delivery, in order. Either every envelope
    /// is accepted or, on error, none of them is.
    async fn deliver(&self, envelopes: Vec<Envelope>) -> Result<(), MessagingError>;
}

type Predicate = Box<dyn Fn(&OutboundSend) -> bool + Send + Sync>;

struct SendingRule {
    matches: Predicate,
    strategy: Arc<dyn SendingStrategy>,
}

/// Ordered list of predicate/strategy rules for outbound sends. The first
/// matching rule delivers; later rules are not consulted.
#[derive(Default)]
pub struct SendingChain {
    rules: Vec<SendingRule>,
}

impl SendingChain {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a rule.
    #[must_use]
    pub fn when<P>(mut self, matches: P, strategy: Arc<dyn SendingStrategy>) -> Self
    where
        P: Fn(&OutboundSend) -> bool + Send + Sync + 'static,
    {
        self.rules.push(SendingRule {
            matches: Box::new(matches),
            strategy,
        });
        self
    }

    /// Appends a rule for sends addressed to `target_type`.
    #[must_use]
    pub fn to_aggregate_type(
        self,
        target_type: &'static str,
        strategy: Arc<dyn SendingStrategy>,
    ) -> Self {
        self.when(move |send| send.target_type == target_type, strategy)
    }

    /// Appends a catch-all rule.
    #[must_use]
    pub fn otherwise(self, strategy: Arc<dyn SendingStrategy>) -> Self {
        self.when(|_| true, strategy)
    }

    /// Number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns `true` if the chain has no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    fn strategy_for(&self, send: &OutboundSend) -> Result<&Arc<dyn SendingStrategy>, MessagingError> {
        self.rules
            .iter()
            .find(|rule| (rule.matches)(send))
            .map(|rule| &rule.strategy)
            .ok_or_else(|| MessagingError::UnroutableOutboundMessage {
                message_id: send.message_id,
                target_type: send.target_type.clone(),
                target_id: send.target_id,
            })
    }

    /// Converts one send into an envelope and delivers it.
    ///
    /// # Errors
    ///
    /// Returns `UnroutableOutboundMessage` if no rule matches, or the
    /// strategy's delivery error.
    pub async fn relay(&self, send: OutboundSend) -> Result<(), MessagingError> {
        let strategy = self.strategy_for(&send)?;
        strategy.deliver(vec![send.into_envelope()]).await
    }

    /// Relays every send and returns how many were delivered.
    ///
    /// Every send is matched before the first delivery, so an unroutable
    /// send fails the batch without delivering any of it. Sends sharing a
    /// strategy go out in one `deliver` call, in their original order, so a
    /// failing strategy delivers none of its share.
    ///
    /// # Errors
    ///
    /// Returns `UnroutableOutboundMessage` for the first unmatched send, or
    /// the first delivery error.
    pub async fn relay_all(&self, sends: Vec<OutboundSend>) -> Result<usize, MessagingError> {
        let mut batches: Vec<(Arc<dyn SendingStrategy>, Vec<Envelope>)> = Vec::new();
        let mut count = 0;
        for send in sends {
            let strategy = self.strategy_for(&send)?;
            debug!(
                outbound_id = %send.message_id,
                target_type = %send.target_type,
                target_id = %send.target_id,
                "relaying"
            );
            let envelope = send.into_envelope();
            match batches.iter_mut().find(|(s, _)| Arc::ptr_eq(s, strategy)) {
                Some((_, batch)) => batch.push(envelope),
                None => batches.push((Arc::clone(strategy), vec![envelope])),
            }
            count += 1;
        }

        for (strategy, batch) in batches {
            strategy.deliver(batch).await?;
        }
        Ok(count)
    }
}

impl fmt::Debug for SendingChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SendingChain")
            .field("rules", &self.rules.len())
            .finish()
    }
}

#[derive(Debug, Default)]
struct QueueState {
    items: VecDeque<Envelope>,
    closed: bool,
}

/// In-process FIFO of relayed envelopes awaiting re-entry into the
/// pipeline.
#[derive(Debug, Default)]
pub struct LocalQueue {
    state: Mutex<QueueState>,
    available: Notify,
}

impl LocalQueue {
    /// Creates an empty, open queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends `envelope`. Envelopes pushed after `close` are still handed
    /// out until the queue is empty.
    pub fn push(&self, envelope: Envelope) {
        self.state().items.push_back(envelope);
        self.available.notify_one();
    }

    /// Appends every envelope under one lock, so consumers never see part
    /// of the batch without the rest.
    pub fn push_all(&self, envelopes: impl IntoIterator<Item = Envelope>) {
        let pushed = {
            let mut state = self.state();
            let before = state.items.len();
            state.items.extend(envelopes);
            state.items.len() - before
        };
        for _ in 0..pushed {
            self.available.notify_one();
        }
    }

    /// Takes the oldest envelope without waiting.
    pub fn try_dequeue(&self) -> Option<Envelope> {
        self.state().items.pop_front()
    }

    /// Waits for the oldest envelope. Returns `None` once the queue is
    /// closed and empty.
    pub async fn dequeue(&self) -> Option<Envelope> {
        loop {
            let notified = self.available.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            {
                let mut state = self.state();
                if let Some(envelope) = state.items.pop_front() {
                    return Some(envelope);
                }
                if state.closed {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// Wakes every waiting consumer; consumers stop once the queue drains.
    pub fn close(&self) {
        self.state().closed = true;
        self.available.notify_waiters();
    }

    /// Returns `true` once `close` has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state().closed
    }

    /// Number of queued envelopes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state().items.len()
    }

    /// Returns `true` if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state().items.is_empty()
    }
}

#[async_trait]
impl SendingStrategy for LocalQueue {
    async fn deliver(&self, envelopes: Vec<Envelope>) -> Result<(), MessagingError> {
        self.push_all(envelopes);
        Ok(())
    }
}
