//! Dispatch pipeline
//!
//! The gateway separates ingestion from delivery with a single actor:
//!
//! ```text
//!   HTTP handlers (concurrent)
//!        │ DispatchTask
//!        ▼
//!   bounded mpsc queue ──► DispatcherActor (one task, strictly sequential)
//!                               │
//!                               ├─ ClientCache: one client per DSN
//!                               └─ per alert: build event, submit, log
//! ```
//!
//! Handlers enqueue and return; the worker serializes every outbound
//! submission and every cache mutation, which is what makes the cache safe
//! without a lock. Shutdown is close-and-drain: once every handle is dropped
//! the channel closes, the worker finishes the buffered tasks and exits.

pub mod dispatcher;
pub mod messages;
