//! HTTP Client builder module
//!
//! Provides unified HTTP Client building functionality with proxy support.
//! Clients built here never set a total request timeout: a token stream may
//! stay open indefinitely, so only the connect phase is bounded.

use reqwest::{Client, Proxy};
use std::time::Duration;

use crate::model::config::{Config, TlsBackend};

/// Proxy configuration
#[derive(Debug, Clone, Default)]
pub struct ProxyConfig {
    /// Proxy URL, supports http/https/socks5
    pub url: String,
    /// Proxy authentication username
    pub username: Option<String>,
    /// Proxy authentication password
    pub password: Option<String>,
}

impl ProxyConfig {
    /// Create proxy configuration from URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            username: None,
            password: None,
        }
    }

    /// Set authentication credentials
    pub fn with_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Build proxy configuration from application config, if a proxy is set
    pub fn from_config(config: &Config) -> Option<Self> {
        config.proxy_url.as_ref().map(|url| {
            let mut proxy = Self::new(url);
            if let (Some(username), Some(password)) = (&config.proxy_username, &config.proxy_password) {
                proxy = proxy.with_auth(username, password);
            }
            proxy
        })
    }
}

/// Build HTTP Client
///
/// # Arguments
/// * `proxy` - Optional proxy configuration
/// * `connect_timeout` - Optional bound on establishing the connection
/// * `tls_backend` - TLS implementation to use
///
/// # Returns
/// Configured reqwest::Client
pub fn build_client(
    proxy: Option<&ProxyConfig>,
    connect_timeout: Option<Duration>,
    tls_backend: TlsBackend,
) -> anyhow::Result<Client> {
    let mut builder = Client::builder();

    if let Some(timeout) = connect_timeout {
        builder = builder.connect_timeout(timeout);
    }

    if tls_backend == TlsBackend::Rustls {
        builder = builder.use_rustls_tls();
    }

    if let Some(proxy_config) = proxy {
        let mut proxy = Proxy::all(&proxy_config.url)?;

        // Set proxy authentication
        if let (Some(username), Some(password)) = (&proxy_config.username, &proxy_config.password) {
            proxy = proxy.basic_auth(username, password);
        }

        builder = builder.proxy(proxy);
        tracing::debug!("HTTP Client using proxy: {}", proxy_config.url);
    }

    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proxy_config_with_auth() {
        let config = ProxyConfig::new("socks5://127.0.0.1:1080").with_auth("user", "pass");
        assert_eq!(config.url, "socks5://127.0.0.1:1080");
        assert_eq!(config.username, Some("user".to_string()));
        assert_eq!(config.password, Some("pass".to_string()));
    }

    #[test]
    fn test_proxy_config_from_config() {
        let mut config = Config::default();
        assert!(ProxyConfig::from_config(&config).is_none());

        config.proxy_url = Some("http://127.0.0.1:7890".to_string());
        let proxy = ProxyConfig::from_config(&config).unwrap();
        assert_eq!(proxy.url, "http://127.0.0.1:7890");
        assert!(proxy.username.is_none());

        // Auth requires both username and password
        config.proxy_username = Some("user".to_string());
        assert!(ProxyConfig::from_config(&config).unwrap().username.is_none());
        config.proxy_password = Some("pass".to_string());
        assert_eq!(
            ProxyConfig::from_config(&config).unwrap().password,
            Some("pass".to_string())
        );
    }

    #[test]
    fn test_build_client_without_proxy() {
        let client = build_client(None, Some(Duration::from_secs(5)), TlsBackend::Rustls);
        assert!(client.is_ok());
    }

    #[test]
    fn test_build_client_with_proxy() {
        let config = ProxyConfig::new("http://127.0.0.1:7890");
        let client = build_client(Some(&config), None, TlsBackend::Rustls);
        assert!(client.is_ok());
    }
}
