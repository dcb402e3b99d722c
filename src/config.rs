//! Gateway configuration
//!
//! Every setting resolves flag-first, then environment variable, then
//! built-in default. The message template flag takes a file path while the
//! environment variable carries the template literally, matching how the
//! gateway has historically been deployed.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::Parser;
use tracing::trace;
use url::Url;

use crate::template::DEFAULT_TEMPLATE;

const ENV_DSN: &str = "SENTRY_DSN";
const ENV_SENTRY_URL: &str = "SENTRY_URL";
const ENV_ENVIRONMENT: &str = "SENTRY_ENVIRONMENT";
const ENV_TEMPLATE: &str = "SENTRY_GATEWAY_TEMPLATE";
const ENV_FINGERPRINT_TEMPLATES: &str = "SENTRY_GATEWAY_FINGERPRINT_TEMPLATES";
const ENV_DUMB_TIMESTAMPS: &str = "SENTRY_GATEWAY_DUMB_TIMESTAMPS";
const ENV_ADDR: &str = "SENTRY_GATEWAY_ADDR";

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:9096";

#[derive(Debug, Clone, Parser)]
#[command(name = "sentry-gateway", version, about = "Sentry gateway for Alertmanager")]
pub struct Args {
    /// Default Sentry DSN
    #[arg(short, long)]
    pub dsn: Option<String>,

    /// Sentry base URL used to synthesize per-request DSNs
    #[arg(short = 'u', long)]
    pub sentry_url: Option<String>,

    /// Sentry environment attached to submitted events
    #[arg(short, long)]
    pub environment: Option<String>,

    /// Path of the template file for the event message
    #[arg(short, long)]
    pub template: Option<PathBuf>,

    /// Template to use as part of the Sentry event fingerprint (repeatable)
    #[arg(short, long = "fingerprint-template")]
    pub fingerprint_templates: Vec<String>,

    /// Use the wall clock instead of the alert's StartsAt/EndsAt
    #[arg(short = 's', long)]
    pub dumb_timestamps: bool,

    /// Address to listen on for webhooks
    #[arg(short, long)]
    pub addr: Option<SocketAddr>,
}

/// Fully resolved gateway configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Default DSN; empty when only per-request DSNs are used
    pub default_dsn: String,

    /// Default environment for submitted events
    pub environment: Option<String>,

    /// Broker URL for synthesizing per-request DSNs
    pub sentry_url: Option<Url>,

    /// Message template source (already read from file if one was given)
    pub message_template: String,

    /// Fingerprint template sources
    pub fingerprint_templates: Vec<String>,

    /// Replace alert timestamps with the processing time
    pub dumb_timestamps: bool,

    /// Webhook listen address
    pub listen_addr: SocketAddr,
}

impl Config {
    /// Apply the flag > env > default precedence and validate.
    pub fn resolve(args: Args) -> anyhow::Result<Self> {
        let default_dsn = args
            .dsn
            .or_else(|| env_var(ENV_DSN))
            .unwrap_or_default();

        let sentry_url = args
            .sentry_url
            .or_else(|| env_var(ENV_SENTRY_URL))
            .map(|raw| Url::parse(&raw).with_context(|| format!("invalid sentry URL {raw:?}")))
            .transpose()?;

        if default_dsn.is_empty() && sentry_url.is_none() {
            bail!("one of --dsn or --sentry-url is required");
        }

        let environment = args.environment.or_else(|| env_var(ENV_ENVIRONMENT));

        let message_template = match args.template {
            Some(path) => std::fs::read_to_string(&path)
                .with_context(|| format!("cannot read template file {}", path.display()))?,
            None => env_var(ENV_TEMPLATE).unwrap_or_else(|| DEFAULT_TEMPLATE.to_string()),
        };

        let fingerprint_templates = if args.fingerprint_templates.is_empty() {
            env_var(ENV_FINGERPRINT_TEMPLATES)
                .map(|raw| {
                    raw.split(',')
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default()
        } else {
            args.fingerprint_templates
        };

        // The flag can only switch the mode on, so the env var fills in when
        // the flag is absent.
        let dumb_timestamps = args.dumb_timestamps
            || env_var(ENV_DUMB_TIMESTAMPS)
                .and_then(|raw| raw.parse::<bool>().ok())
                .unwrap_or(false);

        let listen_addr = match args.addr {
            Some(addr) => addr,
            None => env_var(ENV_ADDR)
                .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string())
                .parse()
                .context("invalid listen address")?,
        };

        let config = Self {
            default_dsn,
            environment,
            sentry_url,
            message_template,
            fingerprint_templates,
            dumb_timestamps,
            listen_addr,
        };

        trace!("resolved config: {config:?}");
        Ok(config)
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}
