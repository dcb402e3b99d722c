//! Per-destination client cache
//!
//! One outbound client per distinct DSN, created lazily the first time a task
//! for that DSN is processed and kept for the process lifetime. The cache is
//! owned by the single dispatch worker, so no locking is involved; the worker
//! is the only writer.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::resolver::Destination;
use crate::sentry::Result;

/// Constructs a client for a destination. [`crate::sentry::SentryClient::new`]
/// in production, counting or recording factories in tests.
pub type ClientFactory<S> = Box<dyn Fn(&Destination) -> Result<S> + Send>;

/// Lazily constructed clients, keyed by DSN.
pub struct ClientCache<S> {
    clients: HashMap<String, Arc<S>>,
    factory: ClientFactory<S>,
}

impl<S> ClientCache<S> {
    pub fn new(factory: impl Fn(&Destination) -> Result<S> + Send + 'static) -> Self {
        Self {
            clients: HashMap::new(),
            factory: Box::new(factory),
        }
    }

    /// Return the client for this destination, constructing it on first use.
    ///
    /// A cache hit ignores the destination's environment: the first
    /// environment seen for a DSN wins for the lifetime of that client. A
    /// construction failure is returned and nothing is cached, so the next
    /// task for the same DSN retries.
    pub fn get_or_create(&mut self, destination: &Destination) -> Result<Arc<S>> {
        if let Some(client) = self.clients.get(&destination.dsn) {
            return Ok(Arc::clone(client));
        }

        debug!("creating client for new destination");
        let client = Arc::new((self.factory)(destination)?);
        self.clients
            .insert(destination.dsn.clone(), Arc::clone(&client));

        Ok(client)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
