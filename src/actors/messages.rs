//! Messages flowing from the HTTP layer to the dispatch worker

use crate::WebhookMessage;
use crate::resolver::Destination;

/// One webhook delivery bound for one destination.
///
/// Immutable once enqueued; ownership moves through the queue to the worker.
/// The destination is shared by every alert in the batch.
#[derive(Debug, Clone)]
pub struct DispatchTask {
    /// Where the batch is delivered to
    pub destination: Destination,

    /// The decoded webhook payload
    pub message: WebhookMessage,
}
