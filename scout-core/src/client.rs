//! # Client Factory
//!
//! Builds the outbound clients that populate the client pool: one direct
//! client plus one per configured SOCKS5 proxy, each with its own
//! [`RateLimiter`].
//!
//! The checker talks to the network only through [`HttpTransport`], so a
//! pooled client can be backed by reqwest in production and by a scripted
//! transport in tests.

use crate::error::{ConfigError, TransportError};
use crate::pool::{PooledClient, Resource, ResourcePool};
use crate::utils::proxy_manager::ProxySpec;
use crate::utils::rate_limiter::RateLimiter;
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Raw HTTP response handed to the checker for classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Issues a GET. Any connection-level failure, including a timeout while
    /// reading the body, is a [`TransportError`]; every completed exchange
    /// is an `Ok`, whatever its status code.
    async fn get(&self, url: &str) -> Result<HttpResponse, TransportError>;
}

/// [`HttpTransport`] over a configured `reqwest::Client`.
pub struct ReqwestTransport {
    label: String,
    client: Client,
}

impl ReqwestTransport {
    pub fn new(label: impl Into<String>, client: Client) -> Self {
        Self {
            label: label.into(),
            client,
        }
    }

    fn failure(&self, e: reqwest::Error) -> TransportError {
        let reason = if e.is_timeout() {
            format!("timeout: {e}")
        } else if e.is_connect() {
            format!("connect: {e}")
        } else {
            e.to_string()
        };
        TransportError {
            client: self.label.clone(),
            reason,
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        let response = self.client.get(url).send().await.map_err(|e| self.failure(e))?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| self.failure(e))?;
        Ok(HttpResponse { status, body })
    }
}

/// Builds rate-limited clients, direct or tunnelled through SOCKS5.
#[derive(Debug, Clone)]
pub struct ClientFactory {
    rate_per_minute: u32,
    request_timeout: Duration,
}

impl ClientFactory {
    pub const LOCAL_LABEL: &'static str = "local client";

    pub fn new(rate_per_minute: u32, request_timeout: Duration) -> Self {
        Self {
            rate_per_minute,
            request_timeout,
        }
    }

    fn builder(&self) -> reqwest::ClientBuilder {
        Client::builder()
            .timeout(self.request_timeout)
            .connect_timeout(Duration::from_secs(30))
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(10)
    }

    fn pooled(&self, label: String, client: Client) -> PooledClient {
        let transport = Arc::new(ReqwestTransport::new(label.clone(), client));
        PooledClient::new(label, transport, RateLimiter::per_minute(self.rate_per_minute))
    }

    /// Client using direct egress.
    pub fn direct(&self) -> Result<PooledClient, ConfigError> {
        let client = self.builder().build().map_err(|e| ConfigError::ClientBuild {
            client: Self::LOCAL_LABEL.to_string(),
            reason: e.to_string(),
        })?;
        Ok(self.pooled(Self::LOCAL_LABEL.to_string(), client))
    }

    /// Client whose connections are all dialled through `proxy`.
    pub fn proxied(&self, proxy: &ProxySpec) -> Result<PooledClient, ConfigError> {
        let label = proxy.label();
        let build_error = |e: reqwest::Error| ConfigError::ClientBuild {
            client: label.clone(),
            reason: e.to_string(),
        };

        let proxy_cfg = reqwest::Proxy::all(proxy.to_url()).map_err(build_error)?;
        let client = self.builder().proxy(proxy_cfg).build().map_err(build_error)?;
        debug!("Built SOCKS5 client via {}", label);
        Ok(self.pooled(label, client))
    }

    /// Client pool: the direct client first, then one client per proxy.
    pub fn build_pool(&self, proxies: &[ProxySpec]) -> Result<ResourcePool, ConfigError> {
        let pool = ResourcePool::new("client");
        pool.add(Resource::Client(self.direct()?));
        for proxy in proxies {
            pool.add(Resource::Client(self.proxied(proxy)?));
        }

        info!(
            "Client pool ready: {} clients at {} req/min each",
            pool.len(),
            self.rate_per_minute
        );
        Ok(pool)
    }
}
