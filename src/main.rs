mod client;
mod common;
mod gateway;
mod http_client;
mod model;
mod producer;
mod sse;
#[cfg(test)]
mod test_util;

use std::sync::Arc;

use clap::Parser;
use client::{GatewayClient, Outcome, TerminalSink};
use gateway::{Relay, RelayConfig};
use model::arg::{Args, Command};
use model::config::{Config, DEFAULT_GATEWAY_PORT, DEFAULT_PRODUCER_PORT};

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging (stderr, so the client's stdout carries only the reply)
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config_path = args
        .config
        .unwrap_or_else(|| Config::default_config_path().to_string());
    let mut config = Config::load(&config_path).unwrap_or_else(|e| {
        tracing::error!("Failed to load config: {:#}", e);
        std::process::exit(1);
    });
    config.apply_env_overrides();
    tracing::debug!(path = ?config.config_path(), "Configuration loaded");

    let result = match args.command {
        Command::Producer { port } => {
            if port.is_some() {
                config.port = port;
            }
            run_producer(config).await
        }
        Command::Gateway { port, upstream } => {
            if port.is_some() {
                config.port = port;
            }
            if let Some(upstream) = upstream {
                config.upstream_url = upstream;
            }
            run_gateway(config).await
        }
        Command::Stream { prompt, gateway } => {
            if let Some(gateway) = gateway {
                config.gateway_url = gateway;
            }
            run_client(config, &prompt).await
        }
    };

    if let Err(e) = result {
        tracing::error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run_producer(config: Config) -> anyhow::Result<()> {
    let source: Arc<dyn producer::TokenSource> = Arc::from(producer::source::from_config(&config)?);
    tracing::info!("Token source: {}", source.name());

    let app = producer::create_router(source);
    let addr = format!("{}:{}", config.host, config.port_or(DEFAULT_PRODUCER_PORT));
    tracing::info!("Starting producer: {}", addr);
    tracing::info!("  POST /chat");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn run_gateway(config: Config) -> anyhow::Result<()> {
    let relay = Relay::new(RelayConfig::from_config(&config))?;
    tracing::info!("Relaying to upstream: {}", relay.chat_url());
    if let Some(proxy_url) = &config.proxy_url {
        tracing::info!("HTTP proxy configured: {}", proxy_url);
    }

    let app = gateway::create_router(relay);
    let addr = format!("{}:{}", config.host, config.port_or(DEFAULT_GATEWAY_PORT));
    tracing::info!("Starting gateway: {}", addr);
    tracing::info!("  GET  /stream?prompt=...");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn run_client(config: Config, prompt: &str) -> anyhow::Result<()> {
    if prompt.trim().is_empty() {
        anyhow::bail!("Prompt must not be empty");
    }

    let client = GatewayClient::from_config(&config)?;
    let mut sink = TerminalSink::default();
    let outcome = client.stream(prompt, &mut sink).await?;
    sink.finish_line();

    match outcome {
        Outcome::Completed => Ok(()),
        other => anyhow::bail!("Stream {}", other),
    }
}
