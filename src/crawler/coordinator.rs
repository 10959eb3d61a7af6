//! Harvest coordinator - main fetch orchestration logic
//!
//! This module drains the frontier in fixed-size batches:
//! - Skipping URLs the progress store already has as successful (diff mode)
//! - Checking the session before every batch
//! - Fetching each URL with pool-wide pacing and bounded retries
//! - Extracting, archiving and recording every URL exactly once
//! - Sleeping between batches and checkpointing the progress log

use crate::config::Config;
use crate::crawler::backoff::RetryPolicy;
use crate::crawler::fetcher::{FetchResult, PageFetcher};
use crate::crawler::scheduler::{RateLimiter, ScheduledFetch, Scheduler};
use crate::crawler::session::{AlwaysValid, ProbeSessionValidator, SessionCheck};
use crate::extract::Extractor;
use crate::frontier::FrontierEntry;
use crate::output::ArchiveWriter;
use crate::progress::{Outcome, ProgressRecord, ProgressStore};
use crate::state::UrlState;
use crate::url::CanonicalUrl;
use crate::{HarvestError, Result};
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every queued URL was processed
    Completed,

    /// The session check failed before batch `batch` (1-based); nothing from
    /// that batch onward was attempted
    SessionExpired { batch: usize },

    /// A user stop was requested; in-flight URLs were finished and recorded
    Cancelled,
}

/// Counters for one batch, used to log the batch boundary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchState {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl BatchState {
    fn record(&mut self, outcome: Outcome) {
        self.attempted += 1;
        match outcome {
            Outcome::Success => self.succeeded += 1,
            Outcome::Failure => self.failed += 1,
            Outcome::Skipped => self.skipped += 1,
        }
    }
}

/// Summary of one harvest run
#[derive(Debug, Clone)]
pub struct RunReport {
    /// URLs in the frontier handed to the run
    pub frontier_size: usize,

    /// URLs skipped because a previous run already archived them
    pub already_done: usize,

    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,

    /// Batches that ran to their barrier
    pub batches: usize,

    pub duration: Duration,
    pub outcome: RunOutcome,
}

impl RunReport {
    fn new(frontier_size: usize, already_done: usize) -> Self {
        Self {
            frontier_size,
            already_done,
            attempted: 0,
            succeeded: 0,
            failed: 0,
            skipped: 0,
            batches: 0,
            duration: Duration::ZERO,
            outcome: RunOutcome::Completed,
        }
    }

    fn absorb(&mut self, batch: BatchState) {
        self.attempted += batch.attempted;
        self.succeeded += batch.succeeded;
        self.failed += batch.failed;
        self.skipped += batch.skipped;
        self.batches += 1;
    }

    /// Percentage of attempted URLs that ended in success
    pub fn success_rate(&self) -> f64 {
        crate::output::stats::success_rate(self.succeeded, self.attempted)
    }
}

/// Batch-level settings taken from `[harvest]`
#[derive(Debug, Clone, Copy)]
struct BatchSettings {
    batch_size: usize,
    batch_delay: Duration,
    save_interval: usize,
    diff_mode: bool,
}

/// Main harvest coordinator
pub struct Coordinator {
    worker: UrlWorker,
    session: Arc<dyn SessionCheck>,
    scheduler: Scheduler,
    cancel: CancellationToken,
    settings: BatchSettings,
}

impl Coordinator {
    /// Creates a coordinator from explicit collaborators
    ///
    /// # Arguments
    ///
    /// * `config` - The harvest configuration
    /// * `fetcher` - Used for every article request
    /// * `session` - Consulted before each batch
    /// * `store` - The opened progress store
    pub fn new(
        config: &Config,
        fetcher: Arc<dyn PageFetcher>,
        session: Arc<dyn SessionCheck>,
        store: ProgressStore,
    ) -> Self {
        let harvest = &config.harvest;
        let cancel = CancellationToken::new();

        let worker = UrlWorker {
            fetcher,
            extractor: Arc::new(Extractor::new(harvest.min_content_length)),
            archive: Arc::new(ArchiveWriter::new(&config.output.archive_dir)),
            store: Arc::new(Mutex::new(store)),
            limiter: Arc::new(RateLimiter::new(harvest.base_delay())),
            policy: RetryPolicy::new(
                harvest.base_delay(),
                harvest.backoff_multiplier,
                harvest.max_retries,
            ),
            save_interval: harvest.save_interval,
            cancel: cancel.clone(),
        };

        Self {
            worker,
            session,
            scheduler: Scheduler::new(harvest.workers),
            cancel,
            settings: BatchSettings {
                batch_size: harvest.batch_size.max(1),
                batch_delay: harvest.batch_delay(),
                save_interval: harvest.save_interval,
                diff_mode: harvest.diff_mode,
            },
        }
    }

    /// Creates a coordinator with the session validator and progress store
    /// described by `config`
    ///
    /// `fetcher` is shared with discovery so both use one cookie jar.
    pub fn from_config(config: &Config, fetcher: Arc<dyn PageFetcher>) -> Result<Self> {
        let session: Arc<dyn SessionCheck> = match &config.session {
            Some(session_config) => {
                match ProbeSessionValidator::new(fetcher.clone(), session_config) {
                    Some(validator) => Arc::new(validator),
                    None => {
                        return Err(crate::ConfigError::Validation(format!(
                            "session.marker-selector '{}' is not a valid CSS selector",
                            session_config.marker_selector
                        ))
                        .into())
                    }
                }
            }
            None => Arc::new(AlwaysValid),
        };

        let store = ProgressStore::open(
            &config.output.progress_path(),
            &config.output.capture_log_path(),
        )?;

        Ok(Self::new(config, fetcher, session, store))
    }

    /// Overrides diff mode (skip URLs already archived)
    pub fn with_diff_mode(mut self, diff_mode: bool) -> Self {
        self.settings.diff_mode = diff_mode;
        self
    }

    /// The run-scope stop signal
    ///
    /// Cancelling it stops the run after in-flight URLs are recorded and
    /// cuts short any batch delay or retry wait in progress.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Shared handle to the progress store
    pub fn store(&self) -> Arc<Mutex<ProgressStore>> {
        self.worker.store.clone()
    }

    /// Runs the harvest over `frontier`
    ///
    /// URL-level failures never surface here; they become progress records.
    /// An `Err` means the progress log itself could not be written, and the
    /// run stopped as soon as that was seen.
    pub async fn run(&self, frontier: &[FrontierEntry]) -> Result<RunReport> {
        let start_time = Instant::now();

        let queue: Vec<FrontierEntry> = {
            let store = self.worker.store.lock().await;
            frontier
                .iter()
                .filter(|entry| !(self.settings.diff_mode && store.is_done(&entry.url)))
                .cloned()
                .collect()
        };

        let mut report = RunReport::new(frontier.len(), frontier.len() - queue.len());
        let total_batches = queue.len().div_ceil(self.settings.batch_size);

        tracing::info!(
            "Harvest starting: {} queued, {} already done, {} batch(es) of up to {}, {} worker(s)",
            queue.len(),
            report.already_done,
            total_batches,
            self.settings.batch_size,
            self.scheduler.workers()
        );

        for (index, batch) in queue.chunks(self.settings.batch_size).enumerate() {
            let batch_number = index + 1;

            if self.cancel.is_cancelled() {
                report.outcome = RunOutcome::Cancelled;
                break;
            }

            if !self.session.is_valid().await {
                tracing::error!(batch = batch_number, "Session expired, aborting run");
                self.cancel.cancel();
                report.outcome = RunOutcome::SessionExpired {
                    batch: batch_number,
                };
                break;
            }

            let state = self.run_batch(batch_number, batch).await?;
            report.absorb(state);

            tracing::info!(
                batch = batch_number,
                "Batch {}/{} done: {} succeeded, {} failed, {} skipped",
                batch_number,
                total_batches,
                state.succeeded,
                state.failed,
                state.skipped
            );

            if self.cancel.is_cancelled() {
                report.outcome = RunOutcome::Cancelled;
                break;
            }

            if batch_number < total_batches && !self.settings.batch_delay.is_zero() {
                tracing::debug!(
                    delay_ms = self.settings.batch_delay.as_millis() as u64,
                    "Sleeping between batches"
                );
                tokio::select! {
                    _ = self.cancel.cancelled() => {
                        tracing::debug!("Stop requested during batch delay");
                    }
                    _ = tokio::time::sleep(self.settings.batch_delay) => {}
                }
            }
        }

        self.worker.store.lock().await.checkpoint()?;

        report.duration = start_time.elapsed();
        tracing::info!(
            "Harvest finished ({:?}): {} attempted, {} succeeded, {} failed, {} skipped in {:?}",
            report.outcome,
            report.attempted,
            report.succeeded,
            report.failed,
            report.skipped,
            report.duration
        );

        Ok(report)
    }

    /// Runs one batch to its barrier
    ///
    /// Worker slots are taken in frontier order before each task is spawned.
    /// The cancel token is consulted before every URL; URLs already started
    /// are always awaited and recorded.
    async fn run_batch(&self, batch_number: usize, batch: &[FrontierEntry]) -> Result<BatchState> {
        tracing::debug!(batch = batch_number, "Starting batch of {}", batch.len());

        let mut tasks = JoinSet::new();
        let mut state = BatchState::default();

        for entry in batch {
            if self.cancel.is_cancelled() {
                break;
            }
            let Some(scheduled) = self.scheduler.admit(entry.url.clone()).await else {
                break;
            };
            if self.cancel.is_cancelled() {
                break;
            }

            let worker = self.worker.clone();
            tasks.spawn(async move {
                let ScheduledFetch { item, _permit } = scheduled;
                worker.process(item).await
            });
        }

        let mut first_error = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(outcome)) => state.record(outcome),
                Ok(Err(e)) => {
                    self.cancel.cancel();
                    first_error.get_or_insert(e);
                }
                Err(e) => {
                    self.cancel.cancel();
                    first_error.get_or_insert(HarvestError::Worker(e.to_string()));
                }
            }
        }

        if let Some(e) = first_error {
            tracing::error!(batch = batch_number, "Aborting run: {}", e);
            return Err(e);
        }

        if self.settings.save_interval > 0 {
            self.worker
                .store
                .lock()
                .await
                .checkpoint_if_due(self.settings.save_interval)?;
        }

        Ok(state)
    }
}

/// Everything one URL needs, cheap to clone into a task
#[derive(Clone)]
struct UrlWorker {
    fetcher: Arc<dyn PageFetcher>,
    extractor: Arc<Extractor>,
    archive: Arc<ArchiveWriter>,
    store: Arc<Mutex<ProgressStore>>,
    limiter: Arc<RateLimiter>,
    policy: RetryPolicy,
    save_interval: usize,
    cancel: CancellationToken,
}

impl UrlWorker {
    /// Takes one URL from pending to a recorded terminal state
    async fn process(&self, url: CanonicalUrl) -> Result<Outcome> {
        let (mut state, retries, fetched) = self.fetch_with_retry(&url).await?;

        let (outcome, error, method) = match fetched {
            FetchResult::Success { body, .. } => {
                let extraction = self.extractor.extract(&url, &body);
                match extraction.stage.filter(|_| extraction.success) {
                    Some(stage) => match self.archive.write(&extraction, Utc::now()) {
                        Ok(_) => (Outcome::Success, None, Some(stage.as_str())),
                        Err(e) => {
                            tracing::warn!(url = %url, "{}", e);
                            (Outcome::Failure, Some(e.to_string()), Some(stage.as_str()))
                        }
                    },
                    None => {
                        tracing::warn!(url = %url, "Extraction exhausted");
                        (
                            Outcome::Failure,
                            Some("extraction exhausted".to_string()),
                            None,
                        )
                    }
                }
            }
            other if other.is_gone() => {
                tracing::info!(url = %url, "Skipping: {}", other.describe());
                (Outcome::Skipped, Some(other.describe()), None)
            }
            other => {
                tracing::warn!(
                    url = %url,
                    retries,
                    "Giving up after {} attempt(s): {}",
                    retries + 1,
                    other.describe()
                );
                (Outcome::Failure, Some(other.describe()), None)
            }
        };

        state = state.transition(match outcome {
            Outcome::Success => UrlState::Success,
            Outcome::Skipped => UrlState::Skipped,
            Outcome::Failure => UrlState::Failed,
        })?;
        tracing::debug!(url = %url, state = %state, "URL finished");

        let record = ProgressRecord::new(url, outcome, retries, error);
        if let Err(e) = self.append(record, method).await {
            self.cancel.cancel();
            return Err(e);
        }

        Ok(outcome)
    }

    /// Fetches until success, a permanent miss, the retry bound, or a stop
    ///
    /// Returns the state the URL is left in (`Fetching`, or `Retrying` when a
    /// stop cut the backoff wait short), the number of retries taken, and the
    /// last fetch result.
    async fn fetch_with_retry(&self, url: &CanonicalUrl) -> Result<(UrlState, u32, FetchResult)> {
        let mut state = UrlState::Pending;
        let mut retries = 0;

        loop {
            state = state.transition(UrlState::Fetching)?;
            self.limiter.acquire().await;

            tracing::debug!(url = %url, attempt = retries + 1, "Fetching");
            let result = self.fetcher.fetch(url.as_str()).await;

            if result.is_success() || result.is_gone() || !self.policy.should_retry(retries) {
                return Ok((state, retries, result));
            }

            state = state.transition(UrlState::Retrying)?;
            let delay = self.policy.delay_for(retries);
            tracing::warn!(
                url = %url,
                retries,
                delay_ms = delay.as_millis() as u64,
                "Fetch failed: {}, retrying",
                result.describe()
            );
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::info!(url = %url, "Stop requested, not retrying");
                    return Ok((state, retries, result));
                }
                _ = tokio::time::sleep(delay) => {}
            }
            retries += 1;
        }
    }

    async fn append(&self, record: ProgressRecord, method: Option<&str>) -> Result<()> {
        let mut store = self.store.lock().await;
        store.record_outcome(record, method)?;
        store.checkpoint_if_due(self.save_interval)?;
        Ok(())
    }
}
