//! DispatcherActor - delivers queued webhook batches to Sentry
//!
//! A single sequential consumer: tasks are processed in strict FIFO order,
//! alerts within a batch in their original order, and the worker does not
//! move on until the current submission round-trip has returned. Nothing in
//! here retries; a failed submission is logged and abandoned.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::cache::ClientCache;
use crate::event::EventBuilder;
use crate::resolver::Destination;
use crate::sentry::{EventSink, Result};

use super::messages::DispatchTask;

/// Queue capacity. A full queue back-pressures the HTTP handlers instead of
/// buffering without bound.
const QUEUE_CAPACITY: usize = 64;

/// Actor that drains the dispatch queue.
pub struct DispatcherActor<S> {
    /// Task receiver; the channel closing is the shutdown signal
    task_rx: mpsc::Receiver<DispatchTask>,

    /// Per-DSN client cache, mutated only by this actor
    cache: ClientCache<S>,

    /// Builds outbound events from alerts
    builder: EventBuilder,
}

impl<S: EventSink> DispatcherActor<S> {
    fn new(
        task_rx: mpsc::Receiver<DispatchTask>,
        cache: ClientCache<S>,
        builder: EventBuilder,
    ) -> Self {
        Self {
            task_rx,
            cache,
            builder,
        }
    }

    /// Run the actor's main loop.
    ///
    /// Exits once every [`DispatcherHandle`] has been dropped and the queue
    /// has been drained.
    #[instrument(skip(self))]
    pub async fn run(mut self) {
        debug!("starting dispatcher");

        while let Some(task) = self.task_rx.recv().await {
            self.process(task).await;
        }

        debug!("dispatch queue closed, dispatcher stopped");
    }

    /// Deliver one task: resolve the client, then submit every alert in
    /// batch order.
    async fn process(&mut self, task: DispatchTask) {
        let client = match self.cache.get_or_create(&task.destination) {
            Ok(client) => client,
            Err(e) => {
                error!("could not create client: {e}, dropping {} alerts", task.message.alerts.len());
                return;
            }
        };

        for alert in &task.message.alerts {
            let event = match self.builder.build(alert) {
                Ok(event) => event,
                Err(e) => {
                    warn!("template failed for {}: {e}, skipping alert", alert.name());
                    continue;
                }
            };

            match client.capture(&event).await {
                Ok(event_id) => {
                    info!(event_id = %event_id, alert_name = %alert.name(), "event submitted");
                }
                Err(e) => {
                    error!(alert_name = %alert.name(), "event dropped: {e}");
                }
            }
        }
    }
}

/// Sending side of the dispatch queue.
///
/// Clones share one queue. Dropping the last clone closes the queue, which
/// lets the worker drain and exit.
#[derive(Clone)]
pub struct DispatcherHandle {
    sender: mpsc::Sender<DispatchTask>,
}

impl DispatcherHandle {
    /// Spawn the dispatch worker.
    ///
    /// The factory constructs one client per distinct DSN, on first use. The
    /// returned join handle completes once the queue has fully drained after
    /// shutdown.
    pub fn spawn<S, F>(builder: EventBuilder, factory: F) -> (Self, JoinHandle<()>)
    where
        S: EventSink + 'static,
        F: Fn(&Destination) -> Result<S> + Send + 'static,
    {
        let (task_tx, task_rx) = mpsc::channel(QUEUE_CAPACITY);

        let actor = DispatcherActor::new(task_rx, ClientCache::new(factory), builder);
        let join = tokio::spawn(actor.run());

        (Self { sender: task_tx }, join)
    }

    /// Enqueue a task, waiting while the queue is full.
    ///
    /// Returns `false` if the worker is gone, which only happens during
    /// shutdown.
    pub async fn dispatch(&self, task: DispatchTask) -> bool {
        self.sender.send(task).await.is_ok()
    }
}
