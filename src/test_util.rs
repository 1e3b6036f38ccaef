//! Shared test helpers

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::Router;
use futures::StreamExt;
use futures::stream::{self, BoxStream};

use crate::client::EventSink;
use crate::producer::TokenSource;
use crate::sse::Event;

/// Serve `app` on an ephemeral local port, returning its base URL
pub async fn spawn_server(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// A local address nothing listens on
pub fn unused_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

/// Token source replaying a fixed script, optionally failing at the end
pub struct ScriptedSource {
    tokens: Vec<String>,
    fail_with: Option<String>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedSource {
    pub fn new(tokens: Vec<&str>) -> Self {
        Self {
            tokens: tokens.into_iter().map(String::from).collect(),
            fail_with: None,
            prompts: Arc::default(),
        }
    }

    /// Fail with `message` after the scripted tokens
    pub fn failing(mut self, message: &str) -> Self {
        self.fail_with = Some(message.to_string());
        self
    }

    /// Prompts received so far
    pub fn prompts(&self) -> Arc<Mutex<Vec<String>>> {
        self.prompts.clone()
    }
}

impl TokenSource for ScriptedSource {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn tokens(&self, prompt: &str) -> BoxStream<'static, anyhow::Result<String>> {
        self.prompts.lock().unwrap().push(prompt.to_string());

        let tokens = stream::iter(self.tokens.clone().into_iter().map(Ok));
        let failure = stream::iter(
            self.fail_with
                .clone()
                .map(|message| Err(anyhow::anyhow!(message))),
        );
        tokens.chain(failure).boxed()
    }
}

/// Sink collecting everything in memory
#[derive(Debug, Default)]
pub struct BufferSink {
    pub text: String,
    pub statuses: Vec<String>,
    pub errors: Vec<String>,
    pub others: Vec<Event>,
}

impl EventSink for BufferSink {
    fn on_token(&mut self, token: &str) {
        self.text.push_str(token);
    }

    fn on_status(&mut self, status: &str) {
        self.statuses.push(status.to_string());
    }

    fn on_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }

    fn on_other(&mut self, event: &Event) {
        self.others.push(event.clone());
    }
}
