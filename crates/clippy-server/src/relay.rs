//! Relay endpoints
//!
//! Each population has a subscribe stream and a publish endpoint. A publish
//! from one side is validated, stamped and fanned out to the other side's
//! registry:
//!
//! - `GET  /api/clippy`        web subscribes
//! - `POST /api/clippy`        CLI publishes to web
//! - `GET  /api/clippy/stream` CLI subscribes
//! - `POST /api/clippy/stream` web publishes to CLI

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    body::Bytes,
    extract::State,
    http::header,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Json, Response,
    },
};
use clippy_core::{accept, protocol::now_millis, Message, StreamMessage};
use clippy_observability::{logging::create_connection_span, RelayMetrics};
use futures::{Stream, StreamExt};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::ApiError;
use crate::registry::{ConnectionHandle, ConnectionRegistry, Payload};
use crate::state::AppState;

pub const CLI_TO_WEB: &str = "cli_to_web";
pub const WEB_TO_CLI: &str = "web_to_cli";

/// Acknowledgement returned to a publisher
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishResponse {
    pub success: bool,
    /// Subscribers still live after the broadcast
    pub connections: usize,
    pub message_type: &'static str,
}

/// SSE stream of one subscriber; leaves its registry when dropped
pub struct Subscription {
    id: String,
    registry: Arc<ConnectionRegistry>,
    receiver: mpsc::UnboundedReceiver<Payload>,
}

impl Subscription {
    /// Register a new subscriber whose first event is `connection-established`
    pub fn open(registry: Arc<ConnectionRegistry>) -> Result<Self, ApiError> {
        let (handle, receiver) = ConnectionHandle::channel();

        // queued before the handle is visible to broadcasts, so it is always first
        let established = serde_json::to_string(&StreamMessage::connection_established(now_millis()))?;
        handle
            .send(Payload::from(established))
            .map_err(|e| ApiError::Internal(e.to_string()))?;

        let id = handle.id().to_string();
        registry.add(handle);

        Ok(Self {
            id,
            registry,
            receiver,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Stream for Subscription {
    type Item = Result<Event, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver
            .poll_recv(cx)
            .map(|payload| payload.map(|p| Ok(Event::default().data(&*p))))
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if self.registry.remove(&self.id) {
            let _span = create_connection_span(self.registry.name(), &self.id).entered();
            info!(
                remaining = self.registry.len(),
                "Subscriber disconnected"
            );
        }
    }
}

fn subscribe(state: &AppState, registry: &Arc<ConnectionRegistry>) -> Result<Response, ApiError> {
    let subscription = Subscription::open(Arc::clone(registry))?;

    {
        let _span = create_connection_span(registry.name(), subscription.id()).entered();
        info!(live = registry.len(), "Subscriber connected");
    }

    let stream = subscription.take_until(state.shutdown.clone().cancelled_owned());
    let sse = Sse::new(stream).keep_alive(KeepAlive::new().interval(state.keep_alive()));

    if state.config.server.cors {
        let headers = [
            (header::CONNECTION, "keep-alive"),
            (header::ACCESS_CONTROL_ALLOW_METHODS, "GET, POST"),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
        ];
        Ok((headers, sse).into_response())
    } else {
        Ok(([(header::CONNECTION, "keep-alive")], sse).into_response())
    }
}

fn parse(body: &[u8]) -> Result<Message, ApiError> {
    let raw: serde_json::Value =
        serde_json::from_slice(body).map_err(|e| ApiError::InvalidJson(e.to_string()))?;
    Ok(accept(&raw)?)
}

fn publish(
    target: &ConnectionRegistry,
    direction: &'static str,
    body: &[u8],
) -> Result<Json<PublishResponse>, ApiError> {
    let message = match parse(body) {
        Ok(message) => message,
        Err(e) => {
            RelayMetrics::record_rejected(e.reason());
            warn!(direction, "Rejected publish: {}", e);
            return Err(e);
        }
    };

    let payload = Payload::from(serde_json::to_string(&message)?);
    let connections = target.broadcast(payload);
    RelayMetrics::record_published(direction);

    debug!(
        direction,
        message_type = message.message_type(),
        connections,
        "Broadcast message"
    );

    Ok(Json(PublishResponse {
        success: true,
        connections,
        message_type: message.message_type(),
    }))
}

/// `GET /api/clippy`
pub async fn web_subscribe(State(state): State<AppState>) -> Result<Response, ApiError> {
    subscribe(&state, &state.web)
}

/// `POST /api/clippy`
pub async fn cli_publish(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<PublishResponse>, ApiError> {
    publish(&state.web, CLI_TO_WEB, &body)
}

/// `GET /api/clippy/stream`
pub async fn cli_subscribe(State(state): State<AppState>) -> Result<Response, ApiError> {
    subscribe(&state, &state.cli)
}

/// `POST /api/clippy/stream`
pub async fn web_publish(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<PublishResponse>, ApiError> {
    publish(&state.cli, WEB_TO_CLI, &body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_reports_live_count_and_type() {
        let registry = ConnectionRegistry::new("web");
        let (handle, mut rx) = ConnectionHandle::channel();
        registry.add(handle);

        let Json(ack) = publish(&registry, CLI_TO_WEB, br#"{"type":"message","text":"hello"}"#).unwrap();
        assert!(ack.success);
        assert_eq!(ack.connections, 1);
        assert_eq!(ack.message_type, "message");

        let delivered: serde_json::Value = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(delivered["text"], "hello");
        assert!(delivered["timestamp"].is_i64());
    }

    #[test]
    fn test_rejected_publish_never_broadcasts() {
        let registry = ConnectionRegistry::new("cli");
        let (handle, mut rx) = ConnectionHandle::channel();
        registry.add(handle);

        let bodies: [&[u8]; 4] = [b"{}", br#"{"type":"message"}"#, b"not json", br#"["message"]"#];
        for body in bodies {
            assert!(publish(&registry, WEB_TO_CLI, body).is_err());
        }
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_existing_timestamp_is_kept() {
        let registry = ConnectionRegistry::new("web");
        let (handle, mut rx) = ConnectionHandle::channel();
        registry.add(handle);

        let Json(ack) =
            publish(&registry, CLI_TO_WEB, br#"{"type":"typing","text":"","timestamp":7}"#).unwrap();
        assert_eq!(ack.message_type, "typing");
        let delivered: serde_json::Value = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(delivered["timestamp"], 7);
    }

    #[tokio::test]
    async fn test_subscription_starts_with_connection_established() {
        let registry = Arc::new(ConnectionRegistry::new("web"));
        let mut subscription = Subscription::open(Arc::clone(&registry)).unwrap();
        assert_eq!(registry.len(), 1);

        registry.broadcast(Payload::from(r#"{"type":"message","text":"later"}"#));

        let first = subscription.receiver.recv().await.unwrap();
        let first: StreamMessage = serde_json::from_str(&first).unwrap();
        assert_eq!(first.message_type(), "connection-established");

        let second = subscription.receiver.recv().await.unwrap();
        assert!(second.contains("later"));
    }

    #[test]
    fn test_dropping_subscription_unregisters() {
        let registry = Arc::new(ConnectionRegistry::new("cli"));
        let subscription = Subscription::open(Arc::clone(&registry)).unwrap();
        let id = subscription.id().to_string();

        drop(subscription);
        assert!(registry.is_empty());
        // explicit removal after the drop is a no-op
        assert!(!registry.remove(&id));
    }
}
