//! Per-vacancy submission controller.
//!
//! Drives one vacancy through duplicate check → status probe → credential
//! check → submit → outcome classification, with a bounded retry loop for
//! transient failures. Retry is an explicit counter, not recursion, so
//! cancellation checks and stack depth stay trivial.

use crate::ledger::DedupLedger;
use crate::models::{ApplyRejection, ApplyResponse, SubmissionOutcome, Vacancy};
use crate::run::RunHandle;
use crate::schedule::RetryConfig;
use crate::traits::{CredentialSource, StatusProbe, Store, Submitter};

/// Placeholder in the cover-letter template replaced with the vacancy title.
pub const TITLE_PLACEHOLDER: &str = "{#vacancyName}";

enum Attempt {
    Done(SubmissionOutcome),
    Retry(String),
}

/// Controller for submitting applications one vacancy at a time.
pub struct SubmissionController<P, B, C>
where
    P: StatusProbe,
    B: Submitter,
    C: CredentialSource,
{
    probe: P,
    submitter: B,
    credentials: C,
    retry: RetryConfig,
    cover_letter: String,
}

impl<P, B, C> SubmissionController<P, B, C>
where
    P: StatusProbe,
    B: Submitter,
    C: CredentialSource,
{
    pub fn new(
        probe: P,
        submitter: B,
        credentials: C,
        retry: RetryConfig,
        cover_letter: String,
    ) -> Self {
        Self {
            probe,
            submitter,
            credentials,
            retry,
            cover_letter,
        }
    }

    /// Submit one application. Enters fresh for each vacancy with a zero
    /// retry count; transient failures re-enter from the duplicate check
    /// (safe, since the check is idempotent).
    pub async fn submit<S: Store>(
        &self,
        vacancy: &Vacancy,
        ledger: &mut DedupLedger<S>,
        run: &RunHandle,
    ) -> SubmissionOutcome {
        let mut retries = 0u32;
        loop {
            if ledger.has(&vacancy.id) {
                return SubmissionOutcome::skipped("duplicate");
            }

            match self.attempt(vacancy, ledger, run).await {
                Attempt::Done(outcome) => return outcome,
                Attempt::Retry(reason) => {
                    if retries >= self.retry.max_retries {
                        tracing::warn!(
                            id = %vacancy.id,
                            retries,
                            error = %reason,
                            "Submission failed after exhausting retries"
                        );
                        return SubmissionOutcome::Failed {
                            reason,
                            retryable: false,
                        };
                    }
                    retries += 1;
                    tracing::debug!(
                        id = %vacancy.id,
                        attempt = retries,
                        max = self.retry.max_retries,
                        error = %reason,
                        "Retrying submission"
                    );
                    tokio::time::sleep(self.retry.retry_delay).await;
                }
            }
        }
    }

    /// One pass through steps 2-4. Probe and transport errors come back as
    /// `Retry`; everything else is a final outcome.
    async fn attempt<S: Store>(
        &self,
        vacancy: &Vacancy,
        ledger: &mut DedupLedger<S>,
        run: &RunHandle,
    ) -> Attempt {
        let status = match self.probe.check(&vacancy.id).await {
            Ok(status) => status,
            Err(e) => return Attempt::Retry(e.to_string()),
        };
        if !status.eligible {
            let reason = status.reason.unwrap_or_else(|| "ineligible".to_string());
            return Attempt::Done(SubmissionOutcome::skipped(reason));
        }

        let credential = match self.credentials.credential().await {
            Ok(Some(credential)) => credential,
            Ok(None) | Err(_) => {
                return Attempt::Done(SubmissionOutcome::Failed {
                    reason: "no-token".to_string(),
                    retryable: false,
                });
            }
        };

        let letter = self.cover_letter.replace(TITLE_PLACEHOLDER, &vacancy.title);
        match self.submitter.apply(vacancy, &credential, &letter).await {
            Ok(ApplyResponse::Accepted) => {
                self.mark(vacancy, ledger);
                Attempt::Done(SubmissionOutcome::Success)
            }
            Ok(ApplyResponse::Rejected(ApplyRejection::QuotaExceeded)) => {
                Attempt::Done(SubmissionOutcome::FatalStop {
                    reason: "submission quota exceeded".to_string(),
                })
            }
            Ok(ApplyResponse::Rejected(ApplyRejection::TestRequired)) => {
                Attempt::Done(SubmissionOutcome::skipped("test required"))
            }
            Ok(ApplyResponse::Rejected(ApplyRejection::AlreadyApplied)) => {
                // The server disagrees with the local ledger; trust the
                // server and remember the id.
                self.mark(vacancy, ledger);
                let hits = run.note_server_duplicate();
                tracing::warn!(id = %vacancy.id, hits, "Server reports application already exists");
                Attempt::Done(SubmissionOutcome::skipped("already-applied"))
            }
            Ok(ApplyResponse::Rejected(ApplyRejection::Other(code))) => Attempt::Retry(code),
            Err(e) if e.is_fatal() => Attempt::Done(SubmissionOutcome::FatalStop {
                reason: e.to_string(),
            }),
            Err(e) => Attempt::Retry(e.to_string()),
        }
    }

    fn mark<S: Store>(&self, vacancy: &Vacancy, ledger: &mut DedupLedger<S>) {
        if let Err(e) = ledger.mark(&vacancy.id) {
            // The id is still held in memory; only persistence failed.
            tracing::warn!(id = %vacancy.id, error = %e, "Failed to persist dedup ledger");
        }
    }
}
