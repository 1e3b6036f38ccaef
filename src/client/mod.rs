//! Gateway client
//!
//! Streams a prompt through the gateway and feeds the decoded events to a
//! sink.

pub mod consumer;

use std::io::Write;
use std::time::Duration;

use anyhow::Context;
use reqwest::Client;
use reqwest::header::ACCEPT;

use crate::http_client::{ProxyConfig, build_client};
use crate::model::config::Config;
use crate::sse::{self, Event, decode_stream};

pub use consumer::{EventSink, Outcome, consume};

/// Client for the gateway's `GET /stream` endpoint
pub struct GatewayClient {
    client: Client,
    stream_url: String,
}

impl GatewayClient {
    pub fn new(client: Client, gateway_url: &str) -> Self {
        Self {
            client,
            stream_url: format!("{}/stream", gateway_url.trim_end_matches('/')),
        }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let proxy = ProxyConfig::from_config(config);
        let client = build_client(
            proxy.as_ref(),
            Some(Duration::from_secs(config.connect_timeout_secs)),
            config.tls_backend,
        )?;
        Ok(Self::new(client, &config.gateway_url))
    }

    /// Stream `prompt` into `sink`
    ///
    /// Fails if the gateway cannot be reached or rejects the request; once the
    /// stream is open, the outcome reports how it ended.
    pub async fn stream(&self, prompt: &str, sink: &mut impl EventSink) -> anyhow::Result<Outcome> {
        let response = self
            .client
            .get(&self.stream_url)
            .header(ACCEPT, sse::CONTENT_TYPE)
            .query(&[("prompt", prompt)])
            .send()
            .await
            .with_context(|| format!("Failed to connect to gateway at {}", self.stream_url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Gateway returned {}: {}", status, body.trim());
        }

        let events = decode_stream(Box::pin(response.bytes_stream()));
        Ok(consume(events, sink).await)
    }
}

/// Sink printing tokens to stdout as they arrive
#[derive(Debug, Default)]
pub struct TerminalSink {
    wrote_text: bool,
}

impl EventSink for TerminalSink {
    fn on_token(&mut self, token: &str) {
        let mut stdout = std::io::stdout().lock();
        let _ = stdout.write_all(token.as_bytes());
        let _ = stdout.flush();
        self.wrote_text = true;
    }

    fn on_status(&mut self, status: &str) {
        tracing::debug!(status = %status, "Stream status");
    }

    fn on_error(&mut self, message: &str) {
        self.finish_line();
        eprintln!("{}", message);
    }

    fn on_other(&mut self, event: &Event) {
        tracing::debug!(kind = %event.kind, data = %event.data, "Ignoring event");
    }
}

impl TerminalSink {
    /// Terminate the current output line, if any text was printed
    pub fn finish_line(&mut self) {
        if self.wrote_text {
            println!();
            self.wrote_text = false;
        }
    }
}
