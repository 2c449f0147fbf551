//! HTTP client for the relay
//!
//! The CLI publishes on `POST /api/clippy` (delivered to browsers) and
//! subscribes on `GET /api/clippy/stream` (what browsers send back).

use std::time::Duration;

use anyhow::{anyhow, bail};
use clippy_core::{Message, StreamMessage};
use colored::Colorize;
use eventsource_client::{Client, ClientBuilder, ReconnectOptions, SSE};
use futures::Stream;
use serde::Deserialize;

pub const PUBLISH_PATH: &str = "/api/clippy";
pub const STREAM_PATH: &str = "/api/clippy/stream";

/// Acknowledgement returned by a successful publish
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishAck {
    pub success: bool,
    pub connections: usize,
    pub message_type: String,
}

#[derive(Debug, Deserialize)]
struct RelayError {
    error: String,
}

#[derive(Clone)]
pub struct RelayClient {
    server_url: String,
    http: reqwest::Client,
    debug: bool,
}

impl RelayClient {
    pub fn new(server_url: &str, debug: bool) -> Self {
        Self {
            server_url: server_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
            debug,
        }
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn publish_url(&self) -> String {
        format!("{}{}", self.server_url, PUBLISH_PATH)
    }

    pub fn stream_url(&self) -> String {
        format!("{}{}", self.server_url, STREAM_PATH)
    }

    /// Publish one message to the browser side
    pub async fn publish(&self, message: &Message) -> anyhow::Result<PublishAck> {
        let url = self.publish_url();

        if self.debug {
            eprintln!("{}", format!("[DEBUG] POST {}", url).dimmed());
            eprintln!(
                "{}",
                format!("[DEBUG] Request body: {}", serde_json::to_string(message)?).dimmed()
            );
        }

        let response = self
            .http
            .post(&url)
            .json(message)
            .send()
            .await
            .map_err(|e| self.unreachable(e))?;
        let status = response.status();

        if self.debug {
            eprintln!("{}", format!("[DEBUG] Response: {}", status).dimmed());
        }

        if status.is_success() {
            return Ok(response.json().await?);
        }

        let body = response.text().await?;
        bail!("Relay rejected message ({}): {}", status, error_reason(&body))
    }

    /// Subscribe to the CLI-facing stream
    ///
    /// Dropped connections are retried with backoff once the first attempt
    /// succeeded; a relay that is down at startup ends the stream with an error.
    pub fn events(
        &self,
    ) -> anyhow::Result<impl Stream<Item = Result<SSE, eventsource_client::Error>>> {
        let url = self.stream_url();

        if self.debug {
            eprintln!("{}", format!("[DEBUG] Connecting SSE: {}", url).dimmed());
        }

        let client = ClientBuilder::for_url(&url)?
            .reconnect(
                ReconnectOptions::reconnect(true)
                    .retry_initial(false)
                    .delay(Duration::from_secs(1))
                    .backoff_factor(2)
                    .delay_max(Duration::from_secs(30))
                    .build(),
            )
            .build();

        Ok(client.stream())
    }

    fn unreachable(&self, err: reqwest::Error) -> anyhow::Error {
        if err.is_connect() {
            anyhow!(
                "Cannot reach relay at {} (is clippy-server running?): {}",
                self.server_url,
                err
            )
        } else {
            err.into()
        }
    }
}

/// The `error` field of a relay error body, or the raw body
pub fn error_reason(body: &str) -> String {
    serde_json::from_str::<RelayError>(body)
        .map(|e| e.error)
        .unwrap_or_else(|_| body.to_string())
}

/// Decode the data of one SSE event
pub fn parse_event(data: &str) -> Option<StreamMessage> {
    serde_json::from_str(data).ok()
}
