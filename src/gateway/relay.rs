//! Byte-transparent SSE relay
//!
//! Opens one upstream request per downstream stream and forwards upstream
//! bytes as they arrive. The relay never parses frames:
//!
//! - Failures before forwarding starts (connect error, connect timeout, no
//!   response headers in time, non-success status) are reported as one
//!   `error` event, then the stream ends.
//! - A failure after forwarding started cannot be framed into bytes already
//!   sent, so the downstream stream fails instead and its consumer sees an
//!   abrupt close.
//! - Dropping the returned stream drops the upstream response, closing the
//!   outbound connection.

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use futures::future::ready;
use futures::stream::{self, BoxStream};
use futures::{Stream, StreamExt};
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use reqwest::{Client, RequestBuilder, Response};
use serde_json::json;
use uuid::Uuid;

use super::error::RelayError;
use crate::http_client::{ProxyConfig, build_client};
use crate::model::config::{Config, TlsBackend};
use crate::sse;

/// Bound on reading the quoted body of an upstream error response
const ERROR_BODY_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Relay configuration
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Producer base URL; requests go to `{upstream_url}/chat`
    pub upstream_url: String,
    /// Bound on establishing the upstream connection
    pub connect_timeout: Option<Duration>,
    /// Bound on receiving response headers; forwarding itself has no deadline
    pub response_timeout: Option<Duration>,
    pub proxy: Option<ProxyConfig>,
    pub tls_backend: TlsBackend,
}

impl RelayConfig {
    pub fn new(upstream_url: impl Into<String>) -> Self {
        Self {
            upstream_url: upstream_url.into(),
            connect_timeout: None,
            response_timeout: None,
            proxy: None,
            tls_backend: TlsBackend::default(),
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = Some(timeout);
        self
    }

    pub fn from_config(config: &Config) -> Self {
        let mut relay_config = Self::new(config.upstream_url.clone())
            .with_connect_timeout(Duration::from_secs(config.connect_timeout_secs));
        if config.response_timeout_secs > 0 {
            relay_config = relay_config.with_response_timeout(Duration::from_secs(config.response_timeout_secs));
        }
        relay_config.proxy = ProxyConfig::from_config(config);
        relay_config.tls_backend = config.tls_backend;
        relay_config
    }
}

/// SSE relay to one upstream producer
pub struct Relay {
    client: Client,
    chat_url: String,
    response_timeout: Option<Duration>,
}

impl Relay {
    pub fn new(config: RelayConfig) -> anyhow::Result<Self> {
        let client = build_client(config.proxy.as_ref(), config.connect_timeout, config.tls_backend)?;
        let chat_url = format!("{}/chat", config.upstream_url.trim_end_matches('/'));
        Ok(Self {
            client,
            chat_url,
            response_timeout: config.response_timeout,
        })
    }

    /// Upstream endpoint URL
    pub fn chat_url(&self) -> &str {
        &self.chat_url
    }

    fn request(&self, prompt: &str) -> RequestBuilder {
        self.client
            .post(&self.chat_url)
            .header(ACCEPT, sse::CONTENT_TYPE)
            .header(CACHE_CONTROL, "no-cache")
            .json(&json!({ "prompt": prompt }))
    }

    /// Relay the upstream stream for `prompt`
    ///
    /// Yields either the upstream bytes unmodified, or exactly one encoded
    /// `error` frame when the upstream never started streaming.
    pub fn relay(&self, prompt: &str) -> BoxStream<'static, Result<Bytes, RelayError>> {
        let stream_id = Uuid::new_v4();
        let request = self.request(prompt);
        let chat_url = self.chat_url.clone();

        stream::once(open_upstream(request, self.response_timeout))
            .flat_map(move |result| match result {
                Ok(response) => {
                    tracing::info!(
                        stream_id = %stream_id,
                        status = %response.status(),
                        "Upstream accepted, forwarding"
                    );
                    UpstreamBody::new(Box::pin(response.bytes_stream()), stream_id).boxed()
                }
                Err(e) => {
                    tracing::warn!(
                        stream_id = %stream_id,
                        upstream = %chat_url,
                        error = %e,
                        "Upstream unavailable, reporting error event"
                    );
                    stream::once(ready(Ok(e.to_event().to_frame()))).boxed()
                }
            })
            .boxed()
    }
}

async fn open_upstream(
    request: RequestBuilder,
    response_timeout: Option<Duration>,
) -> Result<Response, RelayError> {
    let send = request.send();
    let response = match response_timeout {
        Some(limit) => tokio::time::timeout(limit, send)
            .await
            .map_err(|_| RelayError::NoResponse(limit))?,
        None => send.await,
    };
    let mut response = response.map_err(RelayError::from_send)?;

    let status = response.status();
    if !status.is_success() {
        // Quote only the first chunk, and only if it arrives promptly;
        // the body may itself be a stream that never yields
        let body = tokio::time::timeout(ERROR_BODY_READ_TIMEOUT, response.chunk())
            .await
            .ok()
            .and_then(|chunk| chunk.ok().flatten())
            .unwrap_or_default();
        return Err(RelayError::upstream_status(status, &body));
    }

    Ok(response)
}

/// Forwarding half of a relayed stream
///
/// Passes chunks through in order, skipping empty ones. Holds at most the
/// chunk currently in flight.
pub struct UpstreamBody<S> {
    upstream: Option<S>,
    stream_id: Uuid,
    bytes_forwarded: u64,
    chunks_forwarded: u64,
}

impl<S> UpstreamBody<S> {
    pub fn new(upstream: S, stream_id: Uuid) -> Self {
        Self {
            upstream: Some(upstream),
            stream_id,
            bytes_forwarded: 0,
            chunks_forwarded: 0,
        }
    }
}

impl<S> Stream for UpstreamBody<S>
where
    S: Stream<Item = reqwest::Result<Bytes>> + Unpin,
{
    type Item = Result<Bytes, RelayError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        loop {
            let Some(upstream) = this.upstream.as_mut() else {
                return Poll::Ready(None);
            };

            match futures::ready!(Pin::new(upstream).poll_next(cx)) {
                Some(Ok(chunk)) => {
                    if chunk.is_empty() {
                        continue;
                    }
                    this.bytes_forwarded += chunk.len() as u64;
                    this.chunks_forwarded += 1;
                    return Poll::Ready(Some(Ok(chunk)));
                }
                Some(Err(e)) => {
                    this.upstream = None;
                    tracing::warn!(
                        stream_id = %this.stream_id,
                        bytes_forwarded = this.bytes_forwarded,
                        error = %e,
                        "Upstream failed mid-stream, aborting downstream"
                    );
                    return Poll::Ready(Some(Err(RelayError::MidStream(e))));
                }
                None => {
                    this.upstream = None;
                    tracing::info!(
                        stream_id = %this.stream_id,
                        bytes_forwarded = this.bytes_forwarded,
                        chunks_forwarded = this.chunks_forwarded,
                        "Upstream stream completed"
                    );
                    return Poll::Ready(None);
                }
            }
        }
    }
}

impl<S> Drop for UpstreamBody<S> {
    fn drop(&mut self) {
        if self.upstream.is_some() {
            tracing::info!(
                stream_id = %self.stream_id,
                bytes_forwarded = self.bytes_forwarded,
                "Downstream closed, closing upstream connection"
            );
        }
    }
}
