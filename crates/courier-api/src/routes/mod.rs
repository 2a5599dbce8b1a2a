//! Route modules organized by aggregate.

pub mod cargo;
pub mod handling_events;
pub mod health;

use courier_messaging::ProcessReport;
use serde::Serialize;
use uuid::Uuid;

/// Response body returned after a submitted message is processed.
#[derive(Debug, Serialize)]
pub struct MessageAccepted {
    /// Id of the processed message.
    pub message_id: Uuid,
    /// IDs of the domain events produced and persisted.
    pub event_ids: Vec<Uuid>,
    /// Number of follow-up messages queued for the relay workers.
    pub relayed: usize,
    /// `true` if the message id had already been processed.
    pub duplicate: bool,
}

impl From<ProcessReport> for MessageAccepted {
    fn from(report: ProcessReport) -> Self {
        Self {
            message_id: report.message_id.0,
            event_ids: report.committed_events.iter().map(|e| e.event_id).collect(),
            relayed: report.relayed,
            duplicate: report.duplicate,
        }
    }
}
