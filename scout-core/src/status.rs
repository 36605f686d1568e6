//! # Status Aggregator
//!
//! Folds worker reports into cumulative counters and renders them as a
//! single self-overwriting status line once per second.

use crate::error::ScanError;
use crate::worker::WorkerReport;
use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Cumulative progress across all workers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateState {
    pub pages: u64,
    pub found: u64,
    pub errors: u64,
    pub last_page: Option<String>,
    pub last_error: Option<ScanError>,
}

impl AggregateState {
    pub fn apply(&mut self, report: &WorkerReport) {
        self.pages += 1;
        self.found += report.found as u64;
        self.last_page = Some(report.page.clone());
        if let Some(error) = &report.error {
            self.errors += 1;
            self.last_error = Some(error.clone());
        }
    }
}

/// Serializable view of [`AggregateState`] at a point in time.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub timestamp: String,
    pub pages: u64,
    pub found: u64,
    pub errors: u64,
    pub last_page: Option<String>,
    pub last_error: Option<String>,
}

/// [`AggregateState`] together with the lock that guards it.
#[derive(Debug, Default)]
pub struct SharedStatus {
    state: Mutex<AggregateState>,
}

impl SharedStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, report: &WorkerReport) {
        self.state.lock().apply(report);
    }

    pub fn state(&self) -> AggregateState {
        self.state.lock().clone()
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        let state = self.state.lock();
        StatusSnapshot {
            timestamp: Utc::now().to_rfc3339(),
            pages: state.pages,
            found: state.found,
            errors: state.errors,
            last_page: state.last_page.clone(),
            last_error: state.last_error.as_ref().map(ToString::to_string),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Renders the status line (without the leading carriage return).
pub fn render_line(state: &AggregateState, workers: usize, proxies: usize) -> String {
    let mut line = format!(
        " workers[{}] proxies[{}] pages={} found={} errors={} page={}",
        workers,
        proxies,
        state.pages,
        state.found,
        state.errors,
        state.last_page.as_deref().unwrap_or("-")
    );
    if let Some(error) = &state.last_error {
        line.push_str(&format!(" (last error: {})", error));
    }
    line
}

pub struct StatusAggregator {
    status: Arc<SharedStatus>,
}

impl StatusAggregator {
    pub const RENDER_INTERVAL: Duration = Duration::from_secs(1);

    pub fn new(status: Arc<SharedStatus>) -> Self {
        Self { status }
    }

    pub fn status(&self) -> &Arc<SharedStatus> {
        &self.status
    }

    /// Drains `reports` until every sender is dropped. Returns the number of
    /// reports folded.
    pub async fn run(&self, mut reports: mpsc::Receiver<WorkerReport>) -> u64 {
        let mut folded = 0;
        while let Some(report) = reports.recv().await {
            self.status.record(&report);
            folded += 1;
        }
        debug!("Status aggregator drained {} reports", folded);
        folded
    }

    /// Redraws the status line on `out` every second until `token` is
    /// cancelled. `workers` and `proxies` are sampled on every tick.
    pub async fn render_ticker<W, P, O>(
        &self,
        token: CancellationToken,
        workers: W,
        proxies: P,
        mut out: O,
    ) where
        W: Fn() -> usize + Send,
        P: Fn() -> usize + Send,
        O: Write + Send,
    {
        let mut ticker = tokio::time::interval(Self::RENDER_INTERVAL);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // the first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    let line = render_line(&self.status.state(), workers(), proxies());
                    let _ = write!(out, "\r\x1b[K{}", line);
                    let _ = out.flush();
                }
            }
        }
        let _ = writeln!(out);
        let _ = out.flush();
    }
}
