//! Per-alert event construction
//!
//! Maps one webhook alert into the outbound Sentry event record: timestamp
//! selection, rendered message, label tags, severity mapping and fingerprint
//! templating.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::template::Renderer;
use crate::{Alert, AlertStatus};

/// Logger name attached to every event.
const LOGGER: &str = "alertmanager";

/// Sentry severity levels, ordered by importance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Warning,
    Error,
    Fatal,
}

impl Level {
    /// Map the `severity` label onto a level.
    ///
    /// Unknown values and a missing label both map to [`Level::Error`].
    pub fn from_labels(labels: &BTreeMap<String, String>) -> Self {
        match labels.get("severity").map(String::as_str) {
            Some("info") => Level::Info,
            Some("warning") => Level::Warning,
            Some("critical") => Level::Fatal,
            _ => Level::Error,
        }
    }
}

/// Raw alert time window, attached to every event regardless of which end was
/// chosen as the primary timestamp.
#[derive(Debug, Clone, Serialize)]
pub struct Extra {
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

/// One outbound Sentry event, built fresh per alert.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub logger: String,
    pub level: Level,
    pub tags: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fingerprint: Vec<String>,
    pub extra: Extra,
}

/// Builds [`Event`]s from alerts using the compiled templates.
#[derive(Clone)]
pub struct EventBuilder {
    renderer: Arc<Renderer>,
    wall_clock_timestamps: bool,
}

impl EventBuilder {
    /// `wall_clock_timestamps` replaces the alert's own timestamps with the
    /// processing time (the original's "dumb timestamps" mode).
    pub fn new(renderer: Arc<Renderer>, wall_clock_timestamps: bool) -> Self {
        Self {
            renderer,
            wall_clock_timestamps,
        }
    }

    /// Build the event record for one alert.
    ///
    /// A message render failure aborts only this alert; the caller logs and
    /// moves on to the next one in the batch.
    pub fn build(&self, alert: &Alert) -> Result<Event, handlebars::RenderError> {
        let message = self.renderer.message(alert)?;

        Ok(Event {
            message,
            timestamp: self.timestamp(alert),
            logger: LOGGER.to_string(),
            level: Level::from_labels(&alert.labels),
            tags: alert.labels.clone(),
            fingerprint: self.renderer.fingerprint(alert),
            extra: Extra {
                starts_at: alert.starts_at,
                ends_at: alert.ends_at,
            },
        })
    }

    fn timestamp(&self, alert: &Alert) -> DateTime<Utc> {
        if self.wall_clock_timestamps {
            return Utc::now();
        }

        let chosen = match alert.status {
            AlertStatus::Firing => alert.starts_at,
            AlertStatus::Resolved => alert.ends_at,
        };

        chosen.unwrap_or_else(Utc::now)
    }
}
