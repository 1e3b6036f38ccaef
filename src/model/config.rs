use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TlsBackend {
    Rustls,
    NativeTls,
}

impl Default for TlsBackend {
    fn default() -> Self {
        Self::Rustls
    }
}

/// Pipeline configuration
///
/// Shared by the producer, gateway and client; each subcommand reads the
/// fields it needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,

    /// Listen port (defaults per role when not set)
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Base URL of the producer service the gateway relays from
    #[serde(default = "default_upstream_url")]
    pub upstream_url: String,

    /// Base URL of the gateway the client streams from
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,

    /// Upstream connect timeout in seconds
    /// An established stream has no deadline
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Seconds to wait for upstream response headers once connected (0 disables)
    #[serde(default = "default_response_timeout_secs")]
    pub response_timeout_secs: u64,

    #[serde(default = "default_tls_backend")]
    pub tls_backend: TlsBackend,

    /// HTTP proxy URL (optional)
    /// Supported formats: http://host:port, https://host:port, socks5://host:port
    #[serde(default)]
    pub proxy_url: Option<String>,

    /// Proxy authentication username (optional)
    #[serde(default)]
    pub proxy_username: Option<String>,

    /// Proxy authentication password (optional)
    #[serde(default)]
    pub proxy_password: Option<String>,

    /// OpenAI API key (optional, the echo token source is used without it)
    #[serde(default)]
    pub openai_api_key: Option<String>,

    #[serde(default = "default_openai_model")]
    pub openai_model: String,

    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,

    /// Delay between echo tokens in milliseconds
    #[serde(default = "default_echo_delay_ms")]
    pub echo_delay_ms: u64,

    /// Config file path (runtime metadata, not written to JSON)
    #[serde(skip)]
    config_path: Option<PathBuf>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_upstream_url() -> String {
    "http://127.0.0.1:8001".to_string()
}

fn default_gateway_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_response_timeout_secs() -> u64 {
    30
}

fn default_tls_backend() -> TlsBackend {
    TlsBackend::Rustls
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_echo_delay_ms() -> u64 {
    10
}

/// Default producer listen port
pub const DEFAULT_PRODUCER_PORT: u16 = 8001;

/// Default gateway listen port
pub const DEFAULT_GATEWAY_PORT: u16 = 8000;

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: None,
            upstream_url: default_upstream_url(),
            gateway_url: default_gateway_url(),
            connect_timeout_secs: default_connect_timeout_secs(),
            response_timeout_secs: default_response_timeout_secs(),
            tls_backend: default_tls_backend(),
            proxy_url: None,
            proxy_username: None,
            proxy_password: None,
            openai_api_key: None,
            openai_model: default_openai_model(),
            openai_base_url: default_openai_base_url(),
            echo_delay_ms: default_echo_delay_ms(),
            config_path: None,
        }
    }
}

impl Config {
    /// Get default config file path
    pub fn default_config_path() -> &'static str {
        "config.json"
    }

    /// Listen port, falling back to the given role default
    pub fn port_or(&self, default: u16) -> u16 {
        self.port.unwrap_or(default)
    }

    /// OpenAI API key, treating an empty string as not configured
    pub fn openai_api_key(&self) -> Option<&str> {
        self.openai_api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            // Config file doesn't exist, return default config
            let mut config = Self::default();
            config.config_path = Some(path.to_path_buf());
            return Ok(config);
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let mut config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Apply overrides from environment variables
    ///
    /// `LLM_URL`, `GATEWAY_URL`, `OPENAI_API_KEY`, `OPENAI_MODEL`
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("LLM_URL") {
            self.upstream_url = url;
        }
        if let Some(url) = lookup("GATEWAY_URL") {
            self.gateway_url = url;
        }
        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.openai_api_key = Some(key);
        }
        if let Some(model) = lookup("OPENAI_MODEL") {
            self.openai_model = model;
        }
    }

    /// Get config file path (if available)
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }
}
