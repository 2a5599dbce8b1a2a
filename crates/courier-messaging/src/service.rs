//! The message pipeline: receive, dispatch, relay.

use courier_core::message::{Message, MessageId, Payload};
use courier_core::repository::StoredEvent;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::dispatcher::MessageDispatcher;
use crate::error::{AtStage, ProcessingFailure, ProcessingStage};
use crate::receiving::ReceivingChain;
use crate::sending::{LocalQueue, SendingChain};

/// Summary of one envelope processed to `Done`.
#[derive(Debug)]
pub struct ProcessReport {
    /// Id of the processed envelope.
    pub message_id: MessageId,
    /// Kind of the receiving aggregate.
    pub receiver_type: String,
    /// Id of the receiving aggregate.
    pub receiver_id: Uuid,
    /// Events committed by the handling call.
    pub committed_events: Vec<StoredEvent>,
    /// Number of outbound sends handed to the sending chain.
    pub relayed: usize,
    /// `true` if the envelope was an already handled redelivery.
    pub duplicate: bool,
}

/// Runs candidates through the receiving chain, the dispatcher and the
/// sending chain.
#[derive(Debug)]
pub struct MessageService {
    receiving: ReceivingChain,
    dispatcher: MessageDispatcher,
    sending: SendingChain,
}

impl MessageService {
    /// Wires the three pipeline stages together.
    #[must_use]
    pub fn new(
        receiving: ReceivingChain,
        dispatcher: MessageDispatcher,
        sending: SendingChain,
    ) -> Self {
        Self {
            receiving,
            dispatcher,
            sending,
        }
    }

    /// The dispatcher, for read access to aggregates.
    #[must_use]
    pub fn dispatcher(&self) -> &MessageDispatcher {
        &self.dispatcher
    }

    /// Processes one candidate object.
    ///
    /// Sends are relayed only after the handling call committed.
    ///
    /// # Errors
    ///
    /// Returns a [`ProcessingFailure`] tagged with the stage that failed:
    /// `Received` when no receiving rule matches, `Routed`, `Resolving` and
    /// `Handling` as reported by the dispatcher, and `Committed` when the
    /// committed call's sends cannot be relayed.
    #[instrument(skip_all, fields(message_type = candidate.message_type()))]
    pub async fn process(&self, candidate: Payload) -> Result<ProcessReport, ProcessingFailure> {
        let result = self.run(&candidate).await;
        match &result {
            Ok(report) => info!(
                message_id = %report.message_id,
                events = report.committed_events.len(),
                relayed = report.relayed,
                duplicate = report.duplicate,
                "message processed"
            ),
            Err(failure) => warn!(
                stage = %failure.stage,
                error = %failure.error,
                "message processing failed"
            ),
        }
        result
    }

    /// Wraps `message` and processes it.
    ///
    /// # Errors
    ///
    /// See [`process`](Self::process).
    pub async fn process_message<M: Message>(
        &self,
        message: M,
    ) -> Result<ProcessReport, ProcessingFailure> {
        self.process(Payload::new(message)).await
    }

    /// Processes queued envelopes until `queue` is empty, including any the
    /// processed envelopes relay back onto it.
    ///
    /// # Errors
    ///
    /// Stops at the first failure; envelopes still queued stay queued.
    pub async fn drain(&self, queue: &LocalQueue) -> Result<Vec<ProcessReport>, ProcessingFailure> {
        let mut reports = Vec::new();
        while let Some(envelope) = queue.try_dequeue() {
            reports.push(self.process(Payload::new(envelope)).await?);
        }
        Ok(reports)
    }

    async fn run(&self, candidate: &Payload) -> Result<ProcessReport, ProcessingFailure> {
        let envelope = self
            .receiving
            .resolve(candidate)
            .at(ProcessingStage::Received)?;
        debug!(
            stage = %ProcessingStage::Routed,
            message_id = %envelope.message_id(),
            receiver_type = envelope.receiver_type(),
            receiver_id = %envelope.receiver_id(),
            requirement = %envelope.requirement(),
            "routed"
        );

        let outcome = self.dispatcher.dispatch(&envelope).await?;
        debug!(stage = %ProcessingStage::Committed, events = outcome.committed_events.len(), "dispatched");

        debug!(stage = %ProcessingStage::Relaying, sends = outcome.sends.len(), "relaying");
        let relayed = self
            .sending
            .relay_all(outcome.sends)
            .await
            .at(ProcessingStage::Committed)?;
        debug!(stage = %ProcessingStage::Done, "relayed");

        Ok(ProcessReport {
            message_id: outcome.message_id,
            receiver_type: envelope.receiver_type().to_owned(),
            receiver_id: envelope.receiver_id(),
            committed_events: outcome.committed_events,
            relayed,
            duplicate: outcome.duplicate,
        })
    }
}
