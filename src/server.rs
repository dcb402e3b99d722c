//! Webhook ingestion endpoint
//!
//! One POST endpoint on every path. The handler decodes the webhook body,
//! resolves the destination from the request path and basic-auth token, and
//! enqueues a dispatch task. Delivery outcome is never reported to the
//! caller; failures are visible in the logs only.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri, header};
use axum::routing::post;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::WebhookMessage;
use crate::actors::dispatcher::DispatcherHandle;
use crate::actors::messages::DispatchTask;
use crate::resolver::DestinationResolver;

/// Shared state for the ingestion handler.
#[derive(Clone)]
pub struct AppState {
    /// Destination resolution for inbound requests
    pub resolver: Arc<DestinationResolver>,

    /// Sending side of the dispatch queue
    pub dispatcher: DispatcherHandle,
}

/// Build the ingestion router: any path, POST only.
pub fn router(state: AppState) -> Router {
    Router::new()
        .fallback_service(post(ingest).with_state(state))
        .layer(TraceLayer::new_for_http())
}

/// Bind the listener and serve in a background task.
///
/// Flipping the watch channel starts graceful shutdown: the listener stops
/// accepting new connections and the task completes once in-flight requests
/// finish.
pub async fn spawn_server(
    bind_addr: SocketAddr,
    state: AppState,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<(SocketAddr, JoinHandle<()>)> {
    let app = router(state);

    let listener = TcpListener::bind(bind_addr).await?;
    let addr = listener.local_addr()?;

    info!("listening for webhooks on {addr}");

    let handle = tokio::spawn(async move {
        let shutdown = async move {
            let _ = shutdown.changed().await;
        };

        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
        {
            error!("server error: {e}");
        }
    });

    Ok((addr, handle))
}

/// Handle one webhook delivery.
///
/// Decode failures answer 400 without enqueueing anything. A successful
/// enqueue answers 200 immediately; the handler does not wait for delivery.
/// The enqueue itself may wait when the queue is full, back-pressuring the
/// HTTP layer.
async fn ingest(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let message: WebhookMessage = match serde_json::from_slice(&body) {
        Ok(message) => message,
        Err(e) => {
            warn!("invalid webhook payload: {e}");
            return StatusCode::BAD_REQUEST;
        }
    };

    let token = basic_auth_token(&headers);
    let destination = state.resolver.resolve(uri.path(), token.as_deref());

    let task = DispatchTask {
        destination,
        message,
    };

    if !state.dispatcher.dispatch(task).await {
        // Only reachable while shutting down
        error!("dispatch queue closed, dropping webhook");
        return StatusCode::SERVICE_UNAVAILABLE;
    }

    StatusCode::OK
}

/// Extract the username of a basic-auth `Authorization` header.
///
/// The username carries the Sentry public key for per-request destinations;
/// the password is ignored.
fn basic_auth_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let encoded = value.strip_prefix("Basic ")?;
    let decoded = BASE64.decode(encoded).ok()?;
    let credentials = String::from_utf8(decoded).ok()?;

    let (username, _) = credentials.split_once(':').unwrap_or((credentials.as_str(), ""));
    if username.is_empty() {
        return None;
    }

    Some(username.to_string())
}
