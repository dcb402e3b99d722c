use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use sentry_gateway::{
    actors::dispatcher::DispatcherHandle,
    config::{Args, Config},
    event::EventBuilder,
    resolver::{Destination, DestinationResolver},
    sentry::SentryClient,
    server::{AppState, spawn_server},
    template::Renderer,
};
use tokio::sync::watch;
use tracing::{info, level_filters::LevelFilter, trace, warn};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

/// How long in-flight HTTP requests get to finish after the termination
/// signal. The dispatch queue is drained fully regardless.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

fn init() {
    let filter = filter::Targets::new().with_targets(vec![
        ("sentry_gateway", LevelFilter::DEBUG),
        ("gateway", LevelFilter::DEBUG),
        ("tower_http", LevelFilter::INFO),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    let config = Config::resolve(args)?;

    let renderer = Arc::new(Renderer::new(
        &config.message_template,
        &config.fingerprint_templates,
    )?);
    let builder = EventBuilder::new(renderer, config.dumb_timestamps);

    let (dispatcher, dispatcher_join) =
        DispatcherHandle::spawn(builder, |destination: &Destination| {
            SentryClient::new(&destination.dsn, destination.environment.clone())
        });

    let resolver = DestinationResolver::new(
        config.default_dsn,
        config.environment,
        config.sentry_url,
    );

    let state = AppState {
        resolver: Arc::new(resolver),
        dispatcher: dispatcher.clone(),
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (_addr, mut server) = spawn_server(config.listen_addr, state, shutdown_rx).await?;

    shutdown_signal().await;
    info!("termination signal received, shutting down");

    // Stop accepting new webhooks, give in-flight requests a grace period.
    let _ = shutdown_tx.send(true);
    if tokio::time::timeout(SHUTDOWN_GRACE, &mut server).await.is_err() {
        warn!("grace period elapsed with requests still in flight");
        server.abort();
    }

    // Close the queue and let the worker drain what is already enqueued.
    drop(dispatcher);
    dispatcher_join.await?;

    info!("dispatch queue drained, bye");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("cannot install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
