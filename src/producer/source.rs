//! Token sources
//!
//! A token source turns a prompt into a lazy sequence of text fragments.
//! An `Err` item is a producer fault; the sequence is not polled after it.

use std::time::Duration;

use futures::future::ready;
use futures::stream::{self, BoxStream};
use futures::{StreamExt, TryStreamExt};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::http_client::{ProxyConfig, build_client};
use crate::model::config::Config;
use crate::sse::decode_stream;

/// Sentinel data payload ending an OpenAI completion stream
const OPENAI_DONE: &str = "[DONE]";

const SYSTEM_PROMPT: &str = "You are a helpful assistant. Answer concisely.";

/// Producer of token sequences
pub trait TokenSource: Send + Sync {
    /// Source name (for logging)
    fn name(&self) -> &'static str;

    /// Start producing tokens for `prompt`
    fn tokens(&self, prompt: &str) -> BoxStream<'static, anyhow::Result<String>>;
}

/// Pick the token source for a configuration
///
/// Uses OpenAI when an API key is configured, the echo source otherwise.
pub fn from_config(config: &Config) -> anyhow::Result<Box<dyn TokenSource>> {
    match config.openai_api_key() {
        Some(api_key) => Ok(Box::new(OpenAiTokenSource::new(config, api_key)?)),
        None => Ok(Box::new(EchoTokenSource::new(Duration::from_millis(
            config.echo_delay_ms,
        )))),
    }
}

/// Echoes the prompt back one character at a time
#[derive(Debug, Clone)]
pub struct EchoTokenSource {
    delay: Duration,
}

impl EchoTokenSource {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl TokenSource for EchoTokenSource {
    fn name(&self) -> &'static str {
        "echo"
    }

    fn tokens(&self, prompt: &str) -> BoxStream<'static, anyhow::Result<String>> {
        let text = format!("Echo (fake LLM): {}", prompt);
        let delay = self.delay;
        let chars: Vec<String> = text.chars().map(String::from).collect();

        stream::iter(chars)
            .then(move |ch| async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                Ok::<_, anyhow::Error>(ch)
            })
            .boxed()
    }
}

/// Streaming chat completion against an OpenAI-compatible API
pub struct OpenAiTokenSource {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiTokenSource {
    pub fn new(config: &Config, api_key: &str) -> anyhow::Result<Self> {
        let proxy = ProxyConfig::from_config(config);
        let client = build_client(
            proxy.as_ref(),
            Some(Duration::from_secs(config.connect_timeout_secs)),
            config.tls_backend,
        )?;

        Ok(Self {
            client,
            base_url: config.openai_base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: config.openai_model.clone(),
        })
    }

    fn request_body(&self, prompt: &str) -> serde_json::Value {
        json!({
            "model": self.model,
            "temperature": 0.2,
            "stream": true,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt },
            ],
        })
    }
}

/// Extract the text delta of one completion chunk
///
/// Returns `Ok(None)` for chunks without text (role preambles, finish markers).
fn parse_delta(data: &str) -> anyhow::Result<Option<String>> {
    let chunk: ChatCompletionChunk = serde_json::from_str(data)
        .map_err(|e| anyhow::anyhow!("Invalid completion chunk: {}", e))?;

    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .filter(|content| !content.is_empty()))
}

impl TokenSource for OpenAiTokenSource {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn tokens(&self, prompt: &str) -> BoxStream<'static, anyhow::Result<String>> {
        let request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&self.request_body(prompt));

        let connect = async move {
            let response = request.send().await?;
            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                anyhow::bail!("OpenAI API returned {}: {}", status, body);
            }
            Ok::<_, anyhow::Error>(decode_stream(Box::pin(response.bytes_stream())))
        };

        stream::once(connect)
            .flat_map(|result| match result {
                Ok(events) => events
                    .map_err(anyhow::Error::from)
                    .try_take_while(|event| ready(Ok(event.data != OPENAI_DONE)))
                    .try_filter_map(|event| ready(parse_delta(&event.data)))
                    .boxed(),
                Err(e) => stream::once(ready(Err(e))).boxed(),
            })
            .boxed()
    }
}
