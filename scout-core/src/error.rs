//! # Core Error Types
//!
//! Centralized error definitions for the scout-core crate.
//! All errors implement `std::error::Error` and `std::fmt::Display`.
//!
//! Retryable failures (`TransportError`, `CheckError::Status`,
//! `CheckError::Rejected`) are absorbed by the balance checker until its
//! attempt budget runs out; only the final unresolved error reaches a worker.

use thiserror::Error;

/// Configuration-related errors. All of them are fatal at startup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid proxy specifier '{spec}': {reason}")]
    InvalidProxy { spec: String, reason: String },

    #[error("Invalid proxy on line {line} of {path}: {source}")]
    InvalidProxyLine {
        path: String,
        line: usize,
        #[source]
        source: Box<ConfigError>,
    },

    #[error("Missing required configuration field: '{field}'")]
    MissingField { field: String },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("I/O error reading {path}: {msg}")]
    IoError { path: String, msg: String },

    #[error("Failed to load configuration: {msg}")]
    Load { msg: String },

    #[error("Failed to build HTTP client '{client}': {reason}")]
    ClientBuild { client: String, reason: String },
}

/// Resource pool acquisition errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("{pool} pool is empty")]
    Empty { pool: &'static str },

    #[error("{pool} pool returned a {found} resource")]
    WrongKind {
        pool: &'static str,
        found: &'static str,
    },
}

/// Connection-level failure of a single request (connect, TLS, proxy
/// handshake, timeout, body read).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Transport failure via {client}: {reason}")]
pub struct TransportError {
    pub client: String,
    pub reason: String,
}

/// Errors escaping [`BalanceChecker::check`](crate::BalanceChecker::check)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckError {
    #[error("Batch of {size} addresses exceeds the {chain} maximum of {max}")]
    BatchTooLarge {
        chain: &'static str,
        size: usize,
        max: usize,
    },

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error("{endpoint} responded with HTTP {status_code}")]
    Status { endpoint: String, status_code: u16 },

    #[error("{endpoint} rejected the request: status {status} ({message})")]
    Rejected {
        endpoint: String,
        status: String,
        message: String,
    },

    #[error("Malformed response from {endpoint}: {reason}")]
    Decode { endpoint: String, reason: String },

    #[error("No attempt completed after {attempts} tries")]
    NoAttemptCompleted { attempts: u32 },
}

/// Errors carried by a worker report for one scanned page
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error(transparent)]
    Check(#[from] CheckError),

    #[error("Candidate generation failed: {reason}")]
    Generator { reason: String },

    #[error("Failed to persist discovery: {reason}")]
    Persist { reason: String },
}
