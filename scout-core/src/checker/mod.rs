//! # Balance Checker
//!
//! Queries explorer APIs for a batch of addresses, rotating API keys and
//! outbound clients on every attempt.
//!
//! ## Attempt protocol
//!
//! Each call makes at most [`MAX_ATTEMPTS`] attempts:
//!
//! 1. take the next API key (chains that need one)
//! 2. take the next client
//! 3. wait on that client's rate limiter
//! 4. send the request and classify the outcome
//!
//! | outcome | effect |
//! |---|---|
//! | transport failure | client evicted, nothing recorded, retry |
//! | non-2xx status | recorded, retry |
//! | explorer-reported failure | recorded, retry |
//! | malformed payload | returned immediately |
//! | success | returned immediately |
//!
//! An empty pool ends the call at once. When the budget runs out the last
//! recorded error is returned, or [`CheckError::NoAttemptCompleted`].

mod response;

pub use response::{is_nonzero_amount, AccountBalance, CheckResult, ListBalance};

use crate::chain::{ApiStyle, Chain};
use crate::client::ClientFactory;
use crate::config::ScanConfig;
use crate::error::{CheckError, ConfigError, PoolError};
use crate::pool::{Credential, PooledClient, Resource, ResourcePool};
use crate::utils::proxy_manager::ProxyManager;
use response::Decoded;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const MAX_ATTEMPTS: u32 = 5;

/// Base URLs of the explorer APIs. Overridable so the scanner can point at
/// mirrors or self-hosted explorers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiEndpoints {
    pub blockchain_info: String,
    pub etherscan: String,
    pub bscscan: String,
}

impl Default for ApiEndpoints {
    fn default() -> Self {
        Self {
            blockchain_info: "https://blockchain.info/balance".to_string(),
            etherscan: "https://api.etherscan.io/api".to_string(),
            bscscan: "https://api.bscscan.com/api".to_string(),
        }
    }
}

impl ApiEndpoints {
    pub fn base(&self, chain: Chain) -> &str {
        match chain {
            Chain::Btc => &self.blockchain_info,
            Chain::Eth => &self.etherscan,
            Chain::Bsc => &self.bscscan,
        }
    }

    /// Request URL for `addresses`. `api_key` is ignored for chains that do
    /// not take one.
    pub fn request_url(&self, chain: Chain, api_key: Option<&str>, addresses: &[String]) -> String {
        let base = self.base(chain);
        match chain.api_style() {
            ApiStyle::BalanceByList => {
                format!("{}?cors=true&active={}", base, addresses.join("|"))
            }
            ApiStyle::MultiBalance => format!(
                "{}?module=account&action=balancemulti&apikey={}&address={}",
                base,
                api_key.unwrap_or_default(),
                addresses.join(",")
            ),
        }
    }

    fn host(&self, chain: Chain) -> &str {
        let base = self.base(chain);
        let without_scheme = base.split_once("://").map_or(base, |(_, rest)| rest);
        without_scheme.split('/').next().unwrap_or(without_scheme)
    }
}

/// Result of a successful [`BalanceChecker::check`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    pub results: CheckResult,
    pub any_found: bool,
}

impl CheckOutcome {
    fn new(results: CheckResult) -> Self {
        let any_found = results.any_found();
        Self { results, any_found }
    }

    fn empty(chain: Chain) -> Self {
        let results = match chain.api_style() {
            ApiStyle::BalanceByList => CheckResult::List(Default::default()),
            ApiStyle::MultiBalance => CheckResult::Multi(Vec::new()),
        };
        Self::new(results)
    }
}

/// Shared by every worker; all interior state lives in the two pools.
#[derive(Debug)]
pub struct BalanceChecker {
    credentials: ResourcePool,
    clients: ResourcePool,
    endpoints: ApiEndpoints,
}

impl BalanceChecker {
    pub fn new(credentials: ResourcePool, clients: ResourcePool, endpoints: ApiEndpoints) -> Self {
        Self {
            credentials,
            clients,
            endpoints,
        }
    }

    /// Builds both pools from configuration. Any invalid proxy line or
    /// missing API key fails here, before a single worker starts.
    pub fn from_config(config: &ScanConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let credentials = ResourcePool::new("credential");
        for key in &config.api_keys {
            credentials.add(Resource::Credential(Credential::new(key.trim())));
        }

        let proxies = ProxyManager::load_proxies(&config.proxy_file)?;
        let factory = ClientFactory::new(config.rate_per_minute(), config.request_timeout());
        let clients = factory.build_pool(&proxies)?;

        info!(
            "Balance checker for {}: {} API keys, {} clients",
            config.chain,
            credentials.len(),
            clients.len()
        );
        Ok(Self::new(credentials, clients, config.endpoints.clone()))
    }

    /// Live size of the client pool (shrinks as proxies are evicted).
    pub fn available_clients(&self) -> usize {
        self.clients.len()
    }

    pub fn available_credentials(&self) -> usize {
        self.credentials.len()
    }

    pub fn endpoints(&self) -> &ApiEndpoints {
        &self.endpoints
    }

    pub async fn check(&self, chain: Chain, addresses: &[String]) -> Result<CheckOutcome, CheckError> {
        let max = chain.max_batch_size();
        if addresses.len() > max {
            return Err(CheckError::BatchTooLarge {
                chain: chain.name(),
                size: addresses.len(),
                max,
            });
        }
        if addresses.is_empty() {
            return Ok(CheckOutcome::empty(chain));
        }

        let endpoint = self.endpoints.host(chain).to_string();
        let mut last_error: Option<CheckError> = None;

        for attempt in 1..=MAX_ATTEMPTS {
            let credential = if chain.requires_credential() {
                Some(self.next_credential()?)
            } else {
                None
            };
            let client = self.next_client()?;
            let pooled = client
                .as_client()
                .ok_or(PoolError::WrongKind {
                    pool: self.clients.name(),
                    found: client.kind(),
                })?;

            pooled.limiter().take().await;

            let api_key = credential
                .as_ref()
                .and_then(|c| c.as_credential())
                .map(Credential::key);
            let url = self.endpoints.request_url(chain, api_key, addresses);

            let response = match pooled.transport().get(&url).await {
                Ok(response) => response,
                Err(e) => {
                    self.evict(&client, pooled, &e.reason);
                    continue;
                }
            };

            if !response.is_success() {
                debug!(
                    "{} attempt {}/{} via {}: HTTP {}",
                    endpoint,
                    attempt,
                    MAX_ATTEMPTS,
                    pooled.label(),
                    response.status
                );
                last_error = Some(CheckError::Status {
                    endpoint: endpoint.clone(),
                    status_code: response.status,
                });
                continue;
            }

            let decoded = match chain.api_style() {
                ApiStyle::BalanceByList => response::decode_balance_list(&response.body),
                ApiStyle::MultiBalance => response::decode_multi_balance(&response.body),
            };

            match decoded {
                Ok(Decoded::Success(results)) => return Ok(CheckOutcome::new(results)),
                Ok(Decoded::Rejected { status, message }) => {
                    debug!(
                        "{} attempt {}/{} rejected: status {} ({})",
                        endpoint, attempt, MAX_ATTEMPTS, status, message
                    );
                    last_error = Some(CheckError::Rejected {
                        endpoint: endpoint.clone(),
                        status,
                        message,
                    });
                }
                Err(reason) => return Err(CheckError::Decode { endpoint, reason }),
            }
        }

        Err(last_error.unwrap_or(CheckError::NoAttemptCompleted {
            attempts: MAX_ATTEMPTS,
        }))
    }

    fn next_credential(&self) -> Result<Arc<Resource>, PoolError> {
        let credential = self.credentials.next()?;
        if credential.as_credential().is_none() {
            return Err(PoolError::WrongKind {
                pool: self.credentials.name(),
                found: credential.kind(),
            });
        }
        Ok(credential)
    }

    fn next_client(&self) -> Result<Arc<Resource>, PoolError> {
        self.clients.next()
    }

    fn evict(&self, client: &Resource, pooled: &PooledClient, reason: &str) {
        // Several workers may race to evict the same client; only the one
        // that actually removed it reports.
        if self.clients.delete(client) {
            warn!(
                "Proxy not working [{}] removed from pool ({} left): {}",
                pooled.label(),
                self.clients.len(),
                reason
            );
        }
    }
}
