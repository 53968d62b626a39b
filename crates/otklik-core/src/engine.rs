//! Pagination driver: fetches successive listing pages, runs each extracted
//! vacancy through the filter and the submission controller, and decides
//! when to advance, back off, or halt.
//!
//! Strictly sequential: one network operation in flight at a time, entries
//! in feed order, pages in ascending order. The stop signal and pause state
//! are checked at every loop boundary; a stop takes effect within at most
//! one in-flight call's completion.

use chrono::{Local, Timelike};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::applog::{AppLog, LogEntry};
use crate::error::EngineError;
use crate::filter::{FilterConfig, evaluate};
use crate::ledger::{DEFAULT_LEDGER_CAP, DedupLedger};
use crate::models::{RunStats, RunStatus, SubmissionOutcome, Vacancy};
use crate::run::RunHandle;
use crate::schedule::{DelayConfig, RetryConfig, next_submission_delay};
use crate::submit::SubmissionController;
use crate::traits::{CredentialSource, PageFetcher, StatusProbe, Store, Submitter, VacancyExtractor};

/// Engine-wide limits and pacing for one run. Immutable while running.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Hard page cap per run.
    pub max_pages: u32,

    /// Run-wide submission cap.
    pub max_responses: u64,

    /// Consecutive page-level failures before the feed is declared broken.
    pub max_page_failures: u32,

    /// Consecutive pages without extractable entries before the feed is
    /// declared exhausted.
    pub max_empty_pages: u32,

    /// Consecutive server-reported "already applied" responses before the
    /// run stops (anti-loop safeguard against a stale feed).
    pub max_duplicate_hits: u32,

    /// Dedup ledger size cap.
    pub ledger_cap: usize,

    pub delays: DelayConfig,
    pub retry: RetryConfig,
    pub filter: FilterConfig,

    /// Cover-letter template; `{#vacancyName}` is replaced per vacancy.
    pub cover_letter: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_pages: 100,
            max_responses: 200,
            max_page_failures: 3,
            max_empty_pages: 2,
            max_duplicate_hits: 3,
            ledger_cap: DEFAULT_LEDGER_CAP,
            delays: DelayConfig::default(),
            retry: RetryConfig::default(),
            filter: FilterConfig::default(),
            cover_letter: String::new(),
        }
    }
}

/// Events emitted by the engine for monitoring/logging.
#[derive(Debug, Clone)]
pub enum EngineEvent<'a> {
    RunStarted {
        run_id: &'a str,
        base_url: &'a str,
    },
    PageStarted {
        page: u32,
    },
    PageFailed {
        page: u32,
        error: &'a str,
    },
    VacancyProcessed {
        id: &'a str,
        title: &'a str,
        outcome: &'a SubmissionOutcome,
    },
    ResponseCapReached {
        sent: u64,
    },
    DuplicateStreakStop {
        hits: u32,
    },
    FeedExhausted {
        empty_pages: u32,
        failed_pages: u32,
    },
    RunStopped {
        stats: &'a RunStats,
    },
}

/// Trait for receiving engine events (decoupled logging).
pub trait EngineReporter: Send + Sync {
    fn report(&self, event: EngineEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl EngineReporter for TracingReporter {
    fn report(&self, event: EngineEvent<'_>) {
        match event {
            EngineEvent::RunStarted { run_id, base_url } => {
                tracing::info!(%run_id, %base_url, "Run started");
            }
            EngineEvent::PageStarted { page } => {
                tracing::info!(page, "Processing listing page");
            }
            EngineEvent::PageFailed { page, error } => {
                tracing::warn!(page, %error, "Page failed");
            }
            EngineEvent::VacancyProcessed { id, title, outcome } => match outcome {
                SubmissionOutcome::Success => {
                    tracing::info!(%id, %title, "Application sent");
                }
                SubmissionOutcome::Skipped { reason } => {
                    tracing::debug!(%id, %title, %reason, "Vacancy skipped");
                }
                SubmissionOutcome::Failed { reason, .. } => {
                    tracing::warn!(%id, %title, %reason, "Submission failed");
                }
                SubmissionOutcome::FatalStop { reason } => {
                    tracing::error!(%id, %title, %reason, "Fatal condition, stopping run");
                }
            },
            EngineEvent::ResponseCapReached { sent } => {
                tracing::info!(sent, "Submission cap reached");
            }
            EngineEvent::DuplicateStreakStop { hits } => {
                tracing::warn!(hits, "Repeated already-applied responses, stopping run");
            }
            EngineEvent::FeedExhausted {
                empty_pages,
                failed_pages,
            } => {
                tracing::info!(empty_pages, failed_pages, "Feed exhausted");
            }
            EngineEvent::RunStopped { stats } => {
                tracing::info!(
                    sent = stats.sent,
                    processed = stats.processed,
                    skipped = stats.skipped,
                    errors = stats.errors,
                    elapsed_ms = stats.elapsed_ms,
                    "Run stopped"
                );
            }
        }
    }
}

/// The response engine: generic over all external collaborators via traits,
/// enabling dependency injection and testability without real HTTP.
pub struct ResponseEngine<F, X, P, B, C, S>
where
    F: PageFetcher,
    X: VacancyExtractor,
    P: StatusProbe,
    B: Submitter,
    C: CredentialSource,
    S: Store,
{
    fetcher: F,
    extractor: X,
    credentials: C,
    controller: SubmissionController<P, B, C>,
    store: S,
    config: EngineConfig,
}

impl<F, X, P, B, C, S> ResponseEngine<F, X, P, B, C, S>
where
    F: PageFetcher,
    X: VacancyExtractor,
    P: StatusProbe,
    B: Submitter,
    C: CredentialSource,
    S: Store,
{
    pub fn new(
        fetcher: F,
        extractor: X,
        probe: P,
        submitter: B,
        credentials: C,
        store: S,
        config: EngineConfig,
    ) -> Self {
        let controller = SubmissionController::new(
            probe,
            submitter,
            credentials.clone(),
            config.retry.clone(),
            config.cover_letter.clone(),
        );
        Self {
            fetcher,
            extractor,
            credentials,
            controller,
            store,
            config,
        }
    }

    /// Run the engine over the feed until a termination condition is hit:
    /// submission cap, page cap, fatal stop, feed exhaustion, or an
    /// external stop/cancel. Returns the final counters.
    pub async fn run<R: EngineReporter>(
        &self,
        base_url: &str,
        run: &RunHandle,
        cancel: CancellationToken,
        reporter: &R,
    ) -> Result<RunStats, EngineError> {
        // A run cannot start without a session credential.
        if self.credentials.credential().await?.is_none() {
            return Err(EngineError::NoCredential);
        }
        run.start()?;

        let run_id = format!("run-{}", &Uuid::new_v4().to_string()[..8]);
        reporter.report(EngineEvent::RunStarted {
            run_id: &run_id,
            base_url,
        });

        let mut ledger = DedupLedger::load_with_cap(self.store.clone(), self.config.ledger_cap)?;
        let applog = AppLog::new(self.store.clone());

        let mut failed_pages = 0u32;
        let mut empty_pages = 0u32;

        'pages: for page in 0..self.config.max_pages {
            if self.checkpoint(run, &cancel).await != RunStatus::Running {
                break;
            }
            run.set_page(page);
            reporter.report(EngineEvent::PageStarted { page });

            let entries = match self.fetcher.fetch_page(base_url, page).await {
                Ok(html) => Some(self.extractor.extract(&html)),
                Err(e) => {
                    let msg = e.to_string();
                    reporter.report(EngineEvent::PageFailed {
                        page,
                        error: &msg,
                    });
                    None
                }
            };

            match entries {
                // A fetch failure counts toward the page-failure streak,
                // never crashes the loop.
                None => {
                    failed_pages += 1;
                    if failed_pages >= self.config.max_page_failures {
                        reporter.report(EngineEvent::FeedExhausted {
                            empty_pages,
                            failed_pages,
                        });
                        break;
                    }
                }
                Some(list) if list.is_empty() => {
                    empty_pages += 1;
                    if empty_pages >= self.config.max_empty_pages {
                        reporter.report(EngineEvent::FeedExhausted {
                            empty_pages,
                            failed_pages,
                        });
                        break;
                    }
                }
                Some(list) => {
                    failed_pages = 0;
                    empty_pages = 0;

                    let count = list.len();
                    for (i, vacancy) in list.iter().enumerate() {
                        if run.sent() >= self.config.max_responses {
                            reporter.report(EngineEvent::ResponseCapReached { sent: run.sent() });
                            break 'pages;
                        }
                        if self.checkpoint(run, &cancel).await != RunStatus::Running {
                            break 'pages;
                        }

                        let outcome = self.process_vacancy(vacancy, &mut ledger, run).await;
                        run.record_outcome(&outcome);
                        self.log_outcome(&applog, vacancy, &outcome);
                        reporter.report(EngineEvent::VacancyProcessed {
                            id: &vacancy.id,
                            title: &vacancy.title,
                            outcome: &outcome,
                        });

                        if outcome.is_fatal() {
                            break 'pages;
                        }
                        if run.duplicate_hits() >= self.config.max_duplicate_hits {
                            reporter.report(EngineEvent::DuplicateStreakStop {
                                hits: run.duplicate_hits(),
                            });
                            break 'pages;
                        }

                        // Pacing delay, skipped after the page's last entry.
                        if i + 1 < count {
                            let hour = Local::now().hour() as u8;
                            let delay = next_submission_delay(
                                &self.config.delays,
                                &self.config.retry,
                                hour,
                                run.consecutive_failures(),
                            );
                            if !sleep_or_cancel(delay, &cancel).await {
                                break 'pages;
                            }
                        }
                    }
                }
            }

            if page + 1 < self.config.max_pages
                && !sleep_or_cancel(self.config.delays.page_delay, &cancel).await
            {
                break;
            }
        }

        run.stop()?;
        let stats = run.stats();
        if let Err(e) = applog.record_run(&stats) {
            tracing::warn!(error = %e, "Failed to persist run statistics");
        }
        reporter.report(EngineEvent::RunStopped { stats: &stats });
        Ok(stats)
    }

    /// Filter first; only accepted vacancies touch the network.
    async fn process_vacancy<St: Store>(
        &self,
        vacancy: &Vacancy,
        ledger: &mut DedupLedger<St>,
        run: &RunHandle,
    ) -> SubmissionOutcome {
        let verdict = evaluate(vacancy, &self.config.filter);
        if !verdict.accepted {
            return SubmissionOutcome::skipped(verdict.summary());
        }
        self.controller.submit(vacancy, ledger, run).await
    }

    fn log_outcome<St: Store>(&self, applog: &AppLog<St>, vacancy: &Vacancy, outcome: &SubmissionOutcome) {
        let entry = LogEntry {
            id: vacancy.id.clone(),
            title: vacancy.title.clone(),
            time: chrono::Utc::now(),
            success: outcome.is_success(),
            message: outcome.reason().map(String::from),
        };
        if let Err(e) = applog.append(entry) {
            tracing::warn!(id = %vacancy.id, error = %e, "Failed to append application log");
        }
    }

    /// Loop-boundary check: honours cancellation and parks while paused.
    async fn checkpoint(&self, run: &RunHandle, cancel: &CancellationToken) -> RunStatus {
        if cancel.is_cancelled() {
            let _ = run.stop();
            return RunStatus::Stopped;
        }
        let status = run.wait_if_paused().await;
        if cancel.is_cancelled() {
            let _ = run.stop();
            return RunStatus::Stopped;
        }
        status
    }
}

/// Sleep unless cancelled first; returns false when the run should end.
async fn sleep_or_cancel(delay: std::time::Duration, cancel: &CancellationToken) -> bool {
    if delay.is_zero() {
        return !cancel.is_cancelled();
    }
    tokio::select! {
        () = tokio::time::sleep(delay) => true,
        () = cancel.cancelled() => false,
    }
}
