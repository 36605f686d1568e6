//! # Scan Worker
//!
//! One worker scans one page per iteration: generate candidates, check
//! their balances, persist anything found, and emit exactly one
//! [`WorkerReport`]. Failures are reported and the loop moves on to the
//! next page; only cancellation stops it.

use crate::chain::Chain;
use crate::checker::{BalanceChecker, CheckResult};
use crate::discovery::Discovery;
use crate::error::ScanError;
use crate::traits::{CandidateGenerator, DiscoverySink};
use num_bigint::{BigUint, RandBigInt};
use once_cell::sync::Lazy;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Number of pages in the keyspace; random pages are drawn from
/// `[0, KEYSPACE_PAGES)`.
pub static KEYSPACE_PAGES: Lazy<BigUint> = Lazy::new(|| {
    BigUint::parse_bytes(
        b"904625697166532776746648320380374280100293470930272690489102837043110636675",
        10,
    )
    .unwrap_or_default()
});

/// A generated account.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Candidate {
    /// Identifier sent to the explorer.
    pub address: String,
    /// Secondary form of the same account (e.g. uncompressed address).
    pub alternate_address: Option<String>,
    pub private_key: String,
}

impl Candidate {
    pub fn new(address: impl Into<String>, private_key: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            alternate_address: None,
            private_key: private_key.into(),
        }
    }

    pub fn with_alternate(mut self, alternate: impl Into<String>) -> Self {
        self.alternate_address = Some(alternate.into());
        self
    }
}

impl std::fmt::Debug for Candidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Candidate")
            .field("address", &self.address)
            .field("alternate_address", &self.alternate_address)
            .finish_non_exhaustive()
    }
}

/// How a worker picks the page for each iteration.
#[derive(Debug, Clone)]
pub enum PageSelector {
    Random { bound: BigUint },
    Sequential { start: BigUint },
}

impl PageSelector {
    pub fn random() -> Self {
        PageSelector::Random {
            bound: KEYSPACE_PAGES.clone(),
        }
    }

    pub fn sequential(start: BigUint) -> Self {
        PageSelector::Sequential { start }
    }

    /// Page for the `iteration`-th loop (0-based). Sequential pages depend
    /// only on `iteration`, not on which worker asks.
    pub fn page(&self, iteration: u64) -> BigUint {
        match self {
            PageSelector::Random { bound } => rand::thread_rng().gen_biguint_below(bound),
            PageSelector::Sequential { start } => start + iteration,
        }
    }
}

/// Outcome of one worker iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerReport {
    pub worker_id: usize,
    /// `"<page>(<n> addresses)"`
    pub page: String,
    pub found: usize,
    pub error: Option<ScanError>,
}

pub struct ScanWorker {
    id: usize,
    chain: Chain,
    checker: Arc<BalanceChecker>,
    generator: Arc<dyn CandidateGenerator>,
    sink: Arc<dyn DiscoverySink>,
    pages: PageSelector,
    reports: mpsc::Sender<WorkerReport>,
}

impl ScanWorker {
    pub fn new(
        id: usize,
        chain: Chain,
        checker: Arc<BalanceChecker>,
        generator: Arc<dyn CandidateGenerator>,
        sink: Arc<dyn DiscoverySink>,
        pages: PageSelector,
        reports: mpsc::Sender<WorkerReport>,
    ) -> Self {
        Self {
            id,
            chain,
            checker,
            generator,
            sink,
            pages,
            reports,
        }
    }

    /// Scans until `token` is cancelled or the report channel closes.
    /// Cancellation is observed between pages, never in the middle of one,
    /// so a page that found something is always persisted and reported.
    /// Returns the number of completed iterations.
    pub async fn run(self, token: CancellationToken) -> u64 {
        let mut iteration: u64 = 0;
        loop {
            if token.is_cancelled() {
                break;
            }

            let report = self.scan_page(iteration).await;
            iteration += 1;

            if self.reports.send(report).await.is_err() {
                debug!("Worker {} report channel closed", self.id);
                break;
            }
        }

        info!("Worker {} stopped after {} pages", self.id, iteration);
        iteration
    }

    /// One full iteration. Never fails: errors are carried in the report.
    pub async fn scan_page(&self, iteration: u64) -> WorkerReport {
        let page = self.pages.page(iteration);
        let batch = self.chain.max_batch_size();
        let mut report = WorkerReport {
            worker_id: self.id,
            page: format!("{}({} addresses)", page, batch),
            found: 0,
            error: None,
        };

        let candidates = match self.generate(page, batch).await {
            Ok(candidates) => candidates,
            Err(e) => {
                report.error = Some(e);
                return report;
            }
        };

        let addresses: Vec<String> = candidates.iter().map(|c| c.address.clone()).collect();
        let outcome = match self.checker.check(self.chain, &addresses).await {
            Ok(outcome) => outcome,
            Err(e) => {
                report.error = Some(ScanError::Check(e));
                return report;
            }
        };

        if outcome.any_found {
            let (found, error) = self.persist(&outcome.results, &candidates).await;
            report.found = found;
            report.error = error;
        }
        report
    }

    async fn generate(&self, page: BigUint, count: usize) -> Result<Vec<Candidate>, ScanError> {
        let generator = Arc::clone(&self.generator);
        tokio::task::spawn_blocking(move || generator.generate(&page, count))
            .await
            .map_err(|e| ScanError::Generator {
                reason: e.to_string(),
            })?
            .map_err(|e| ScanError::Generator {
                reason: format!("{e:#}"),
            })
    }

    /// Writes one line per positive result. Returns how many were written
    /// and the first write error, if any.
    async fn persist(
        &self,
        results: &CheckResult,
        candidates: &[Candidate],
    ) -> (usize, Option<ScanError>) {
        let mut lines: Vec<Zeroizing<String>> = Vec::new();
        match results {
            CheckResult::List(entries) => {
                for (address, balance) in entries.iter().filter(|(_, b)| b.is_positive()) {
                    let candidate = find(candidates, address);
                    let line = Discovery::List {
                        address,
                        alternate: candidate
                            .and_then(|c| c.alternate_address.as_deref())
                            .unwrap_or_default(),
                        balance: *balance,
                        private_key: candidate.map(|c| c.private_key.as_str()).unwrap_or_default(),
                    };
                    lines.push(Zeroizing::new(line.to_string()));
                }
            }
            CheckResult::Multi(accounts) => {
                for account in accounts.iter().filter(|a| a.is_positive()) {
                    let candidate = find(candidates, &account.account);
                    let line = Discovery::Multi {
                        account,
                        private_key: candidate.map(|c| c.private_key.as_str()).unwrap_or_default(),
                    };
                    lines.push(Zeroizing::new(line.to_string()));
                }
            }
        }

        let mut written = 0;
        for line in &lines {
            if let Err(e) = self.sink.append(line).await {
                return (
                    written,
                    Some(ScanError::Persist {
                        reason: format!("{e:#}"),
                    }),
                );
            }
            written += 1;
            info!(target: "discovery", "FOUND by worker {}: {} on {}", self.id, self.chain, redact(line));
        }
        (written, None)
    }
}

/// Explorers may normalise case (checksummed hex addresses), so fall back
/// to a case-insensitive match.
fn find<'a>(candidates: &'a [Candidate], address: &str) -> Option<&'a Candidate> {
    candidates
        .iter()
        .find(|c| c.address == address)
        .or_else(|| {
            candidates
                .iter()
                .find(|c| c.address.eq_ignore_ascii_case(address))
        })
}

/// Discovery line without its trailing private material, for logs.
fn redact(line: &str) -> &str {
    line.rsplit_once(" | ").map_or(line, |(head, _)| head)
}
