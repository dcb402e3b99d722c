//! Per-request destination resolution
//!
//! Every webhook lands on one destination: a DSN plus an optional
//! environment. By default that is the statically configured pair. When a
//! broker URL is configured, the request's basic-auth username and URL path
//! are combined into a per-request DSN instead, so one gateway can fan out to
//! many Sentry projects.

use tracing::warn;
use url::Url;

/// Where a batch of alerts is delivered to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    /// Sentry DSN connection string. May be empty when no default DSN is
    /// configured and the request did not carry enough to synthesize one.
    pub dsn: String,

    /// Optional environment stamped onto every event for this destination.
    pub environment: Option<String>,
}

/// Computes the destination for an inbound request.
///
/// Resolution is pure: the same path and token always yield the same
/// destination.
pub struct DestinationResolver {
    default: Destination,
    broker_url: Option<Url>,
}

impl DestinationResolver {
    pub fn new(default_dsn: String, environment: Option<String>, broker_url: Option<Url>) -> Self {
        Self {
            default: Destination {
                dsn: default_dsn,
                environment,
            },
            broker_url,
        }
    }

    /// Resolve the destination for a request.
    ///
    /// - No broker URL, no auth token, or root path: the default destination.
    /// - One path segment: DSN synthesized as
    ///   `{scheme}://{token}@{broker_host}/{segment}`, default environment.
    /// - Two path segments: DSN from the first segment, environment from the
    ///   second.
    /// - Anything else fails resolution; the request falls back to the
    ///   default destination with a warning.
    pub fn resolve(&self, path: &str, auth_token: Option<&str>) -> Destination {
        let Some(broker_url) = &self.broker_url else {
            return self.default.clone();
        };

        let Some(token) = auth_token else {
            return self.default.clone();
        };

        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        match segments.as_slice() {
            [] => self.default.clone(),
            [project] => Destination {
                dsn: synthesize_dsn(broker_url, token, project),
                environment: self.default.environment.clone(),
            },
            [project, environment] => Destination {
                dsn: synthesize_dsn(broker_url, token, project),
                environment: Some((*environment).to_string()),
            },
            _ => {
                warn!("cannot resolve destination from path {path:?}, using default");
                self.default.clone()
            }
        }
    }
}

fn synthesize_dsn(broker_url: &Url, token: &str, project: &str) -> String {
    let authority = match (broker_url.host_str(), broker_url.port()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_string(),
        (None, _) => String::new(),
    };

    format!("{}://{token}@{authority}/{project}", broker_url.scheme())
}
