use crate::worker::Candidate;
use anyhow::Result;
use async_trait::async_trait;
use num_bigint::BigUint;

/// Derives candidate accounts from page indices.
///
/// Implemented outside this crate. Calls may be CPU heavy and are made from
/// a blocking thread.
pub trait CandidateGenerator: Send + Sync {
    /// `count` candidates for page `page`.
    fn generate(&self, page: &BigUint, count: usize) -> Result<Vec<Candidate>>;

    /// Page that contains `private_key` when pages hold `batch_size` keys.
    fn locate(&self, private_key: &str, batch_size: usize) -> Result<BigUint>;
}

/// Append-only destination for discovery lines.
#[async_trait]
pub trait DiscoverySink: Send + Sync {
    /// Appends one record atomically. `line` carries no trailing newline.
    async fn append(&self, line: &str) -> Result<()>;
}
