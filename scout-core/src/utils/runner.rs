use crate::chain::Chain;
use crate::checker::BalanceChecker;
use crate::config::{parse_page, ResumePoint, ScanConfig};
use crate::discovery::DiscoveryLog;
use crate::status::{AggregateState, SharedStatus, StatusAggregator};
use crate::traits::{CandidateGenerator, DiscoverySink};
use crate::worker::{PageSelector, ScanWorker};
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, Instrument};

/// Report channel capacity shared by all workers.
const REPORT_BUFFER: usize = 10;

/// Wires N scan workers, the status aggregator and the render ticker around
/// one shared [`BalanceChecker`].
///
/// Every worker gets a clone of the same [`PageSelector`]. With a resume
/// point all workers walk the same sequence `start, start + 1, ...`, so a
/// page is scanned once per worker and a discovery on it is logged once per
/// worker. Run a single worker when resuming to avoid duplicate lines.
pub struct ScanRunner {
    chain: Chain,
    workers: usize,
    checker: Arc<BalanceChecker>,
    generator: Arc<dyn CandidateGenerator>,
    sink: Arc<dyn DiscoverySink>,
    pages: PageSelector,
    status_line: bool,
}

impl ScanRunner {
    pub fn new(
        chain: Chain,
        workers: usize,
        checker: Arc<BalanceChecker>,
        generator: Arc<dyn CandidateGenerator>,
        sink: Arc<dyn DiscoverySink>,
        pages: PageSelector,
    ) -> Self {
        Self {
            chain,
            workers: workers.max(1),
            checker,
            generator,
            sink,
            pages,
            status_line: false,
        }
    }

    pub fn with_status_line(mut self, enabled: bool) -> Self {
        self.status_line = enabled;
        self
    }

    /// Does every fallible startup step: pools, proxies, resume point and
    /// the discovery log. Nothing is spawned yet.
    pub async fn from_config(
        config: &ScanConfig,
        generator: Arc<dyn CandidateGenerator>,
    ) -> Result<Self> {
        let checker =
            BalanceChecker::from_config(config).context("Failed to build balance checker")?;
        let pages = Self::page_selector(config, generator.as_ref())?;
        let output = config.output_file();
        let sink = DiscoveryLog::open(&output).await?;

        Ok(Self::new(
            config.chain,
            config.workers,
            Arc::new(checker),
            generator,
            Arc::new(sink),
            pages,
        )
        .with_status_line(config.status_line))
    }

    fn page_selector(config: &ScanConfig, generator: &dyn CandidateGenerator) -> Result<PageSelector> {
        let selector = match &config.resume {
            None => PageSelector::random(),
            Some(ResumePoint::Page(page)) => PageSelector::sequential(parse_page(page)?),
            Some(ResumePoint::Key(key)) => {
                let start = generator
                    .locate(key, config.chain.max_batch_size())
                    .context("Failed to locate resume key")?;
                PageSelector::sequential(start)
            }
        };
        if let PageSelector::Sequential { start } = &selector {
            info!("Sequential scan starting at page {}", start);
        }
        Ok(selector)
    }

    pub fn checker(&self) -> &Arc<BalanceChecker> {
        &self.checker
    }

    /// Runs until `token` is cancelled, then waits for every worker to
    /// finish its current page and returns the final counters.
    pub async fn run(self, token: CancellationToken) -> Result<AggregateState> {
        let status = Arc::new(SharedStatus::new());
        let aggregator = Arc::new(StatusAggregator::new(Arc::clone(&status)));
        let (tx, rx) = mpsc::channel(REPORT_BUFFER);

        let consumer = {
            let aggregator = Arc::clone(&aggregator);
            tokio::spawn(async move { aggregator.run(rx).await })
        };

        let ticker_token = token.child_token();
        let ticker = if self.status_line {
            let aggregator = Arc::clone(&aggregator);
            let checker = Arc::clone(&self.checker);
            let workers = self.workers;
            let ticker_token = ticker_token.clone();
            Some(tokio::spawn(async move {
                aggregator
                    .render_ticker(
                        ticker_token,
                        move || workers,
                        move || checker.available_clients(),
                        std::io::stdout(),
                    )
                    .await
            }))
        } else {
            None
        };

        let start_time = std::time::Instant::now();
        info!("Starting {} {} scan workers...", self.workers, self.chain);

        let mut set = JoinSet::new();
        for id in 1..=self.workers {
            let worker = ScanWorker::new(
                id,
                self.chain,
                Arc::clone(&self.checker),
                Arc::clone(&self.generator),
                Arc::clone(&self.sink),
                self.pages.clone(),
                tx.clone(),
            );
            let span = tracing::info_span!("worker", worker_id = format!("{:03}", id));
            set.spawn(worker.run(token.clone()).instrument(span));
        }
        // Workers hold the only senders now; the consumer ends after the last
        // worker exits.
        drop(tx);

        while let Some(res) = set.join_next().await {
            if let Err(e) = res {
                error!("A worker task panicked or failed to join: {:?}", e);
            }
        }

        if let Err(e) = consumer.await {
            error!("Status aggregator failed to join: {:?}", e);
        }
        ticker_token.cancel();
        if let Some(ticker) = ticker {
            let _ = ticker.await;
        }

        let state = status.state();
        info!("🛑 Shutdown Complete.");
        info!(
            "Total Time: {:.1}s | Pages: {} | Found: {} | Errors: {} | Clients left: {}",
            start_time.elapsed().as_secs_f64(),
            state.pages,
            state.found,
            state.errors,
            self.checker.available_clients()
        );
        Ok(state)
    }

    /// [`run`](Self::run) with Ctrl+C wired to cancellation.
    pub async fn run_until_ctrl_c(self) -> Result<AggregateState> {
        let token = CancellationToken::new();
        let cloned_token = token.clone();

        tokio::spawn(async move {
            match signal::ctrl_c().await {
                Ok(()) => {
                    info!("🛑 Received Ctrl+C. Initiating graceful shutdown...");
                    cloned_token.cancel();
                }
                Err(err) => {
                    error!("Unable to listen for shutdown signal: {}", err);
                }
            }
        });

        self.run(token).await
    }
}
