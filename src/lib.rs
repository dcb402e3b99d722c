pub mod actors;
pub mod cache;
pub mod config;
pub mod event;
pub mod resolver;
pub mod sentry;
pub mod server;
pub mod template;

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One Alertmanager webhook delivery.
///
/// This is our own schema for the wire format described in
/// <https://prometheus.io/docs/alerting/latest/configuration/#webhook_config>,
/// independent of any SDK type. Everything except `alerts` is tolerated to be
/// absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookMessage {
    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub group_key: String,

    #[serde(default)]
    pub truncated_alerts: u64,

    #[serde(default)]
    pub status: AlertStatus,

    #[serde(default)]
    pub receiver: String,

    #[serde(default)]
    pub group_labels: BTreeMap<String, String>,

    #[serde(default)]
    pub common_labels: BTreeMap<String, String>,

    #[serde(default)]
    pub common_annotations: BTreeMap<String, String>,

    #[serde(default, rename = "externalURL")]
    pub external_url: String,

    pub alerts: Vec<Alert>,
}

/// A single firing or resolved condition with labels, annotations and a time
/// window.
///
/// Labels and annotations use `BTreeMap` so iteration is always in sorted key
/// order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    #[serde(default)]
    pub status: AlertStatus,

    #[serde(default)]
    pub labels: BTreeMap<String, String>,

    #[serde(default)]
    pub annotations: BTreeMap<String, String>,

    #[serde(default)]
    pub starts_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,

    #[serde(default, rename = "generatorURL")]
    pub generator_url: String,

    /// Alertmanager's own label hash, unrelated to our fingerprint templates.
    #[serde(default)]
    pub fingerprint: String,
}

impl Alert {
    /// The `alertname` label, used in submission logs.
    pub fn name(&self) -> &str {
        self.labels
            .get("alertname")
            .map(String::as_str)
            .unwrap_or("unknown")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    #[default]
    Firing,
    Resolved,
}

impl Display for AlertStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertStatus::Firing => write!(f, "firing"),
            AlertStatus::Resolved => write!(f, "resolved"),
        }
    }
}
