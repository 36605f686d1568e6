//! # Utilities Module
//!
//! Internal utility modules for the scout-core crate.
//! These modules are marked as `pub(crate)` to enforce API boundaries.

// Internal modules - not part of public API
pub(crate) mod logger;
pub(crate) mod proxy_manager;
pub(crate) mod rate_limiter;
pub(crate) mod runner;

// Selective exports - only public utilities
pub use logger::{setup_logger, setup_logger_with_file, DISCOVERY_TARGET};
pub use proxy_manager::{ProxyManager, ProxySpec};
pub use rate_limiter::RateLimiter;
pub use runner::ScanRunner;
