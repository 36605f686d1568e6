//! # Scout Core - Balance Scanning Engine
//!
//! Concurrent resource rotation and balance querying against public
//! explorer APIs. Workers scan pages of candidate accounts, a shared
//! [`BalanceChecker`] rotates API keys and (optionally proxied) clients under
//! per-client rate limits, and a [`StatusAggregator`] folds progress into a
//! live status line.
//!
//! ## Modules
//!
//! - [`chain`] - Supported chains, batch limits and default quotas
//! - [`checker`] - Retrying, failure-classifying balance checks
//! - [`client`] - HTTP transport seam and client factory (direct / SOCKS5)
//! - [`config`] - Startup configuration
//! - [`discovery`] - Durable discovery log
//! - [`error`] - Typed error handling with thiserror
//! - [`pool`] - Round-robin resource pool with identity-based eviction
//! - [`status`] - Report aggregation and status rendering
//! - [`traits`] - Extension points implemented outside this crate
//! - [`worker`] - Per-task page scanning loop
//! - `utils` - Rate limiting, proxy parsing, logging, orchestration

pub mod chain;
pub mod checker;
pub mod client;
pub mod config;
pub mod discovery;
pub mod error;
pub mod pool;
pub mod status;
pub mod traits;
pub mod worker;
pub(crate) mod utils;

pub use chain::{ApiStyle, Chain};
pub use checker::{
    AccountBalance, ApiEndpoints, BalanceChecker, CheckOutcome, CheckResult, ListBalance,
    MAX_ATTEMPTS,
};
pub use client::{ClientFactory, HttpResponse, HttpTransport, ReqwestTransport};
pub use config::{parse_page, ResumePoint, ScanConfig};
pub use discovery::{Discovery, DiscoveryLog};
pub use error::{CheckError, ConfigError, PoolError, ScanError, TransportError};
pub use pool::{Credential, PoolMember, PooledClient, Resource, ResourceId, ResourcePool};
pub use status::{render_line, AggregateState, SharedStatus, StatusAggregator, StatusSnapshot};
pub use traits::{CandidateGenerator, DiscoverySink};
pub use worker::{Candidate, PageSelector, ScanWorker, WorkerReport, KEYSPACE_PAGES};

pub use utils::{
    setup_logger, setup_logger_with_file, ProxyManager, ProxySpec, RateLimiter, ScanRunner,
    DISCOVERY_TARGET,
};
