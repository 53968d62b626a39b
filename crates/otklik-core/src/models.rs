use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One vacancy extracted from a listing page.
///
/// Identity is `id`, parsed from the vacancy's canonical URL. Instances are
/// immutable and discarded once processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vacancy {
    pub id: String,
    pub title: String,
    pub company: String,
    /// Raw salary text as shown in the listing, e.g. "100 000 – 150 000 ₽".
    pub salary_text: Option<String>,
    /// Short description snippet from the listing card.
    pub snippet: String,
}

/// Result of driving a single vacancy through the submission controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// The application was accepted by the remote service.
    Success,
    /// The vacancy was skipped without (further) network interaction.
    Skipped { reason: String },
    /// The submission failed; `retryable` reports whether another run could
    /// succeed (retries within this run are already exhausted).
    Failed { reason: String, retryable: bool },
    /// A run-ending condition reported by the remote service.
    FatalStop { reason: String },
}

impl SubmissionOutcome {
    pub fn skipped(reason: impl Into<String>) -> Self {
        SubmissionOutcome::Skipped {
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SubmissionOutcome::Success)
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, SubmissionOutcome::FatalStop { .. })
    }

    /// Short label for logging and the application log.
    pub fn label(&self) -> &'static str {
        match self {
            SubmissionOutcome::Success => "success",
            SubmissionOutcome::Skipped { .. } => "skipped",
            SubmissionOutcome::Failed { .. } => "failed",
            SubmissionOutcome::FatalStop { .. } => "fatal",
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            SubmissionOutcome::Success => None,
            SubmissionOutcome::Skipped { reason }
            | SubmissionOutcome::Failed { reason, .. }
            | SubmissionOutcome::FatalStop { reason } => Some(reason),
        }
    }
}

/// Eligibility report from the remote status probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VacancyStatus {
    pub eligible: bool,
    pub reason: Option<String>,
}

impl VacancyStatus {
    pub fn eligible() -> Self {
        Self {
            eligible: true,
            reason: None,
        }
    }

    pub fn ineligible(reason: impl Into<String>) -> Self {
        Self {
            eligible: false,
            reason: Some(reason.into()),
        }
    }
}

/// Domain-level rejection codes the submitter can report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyRejection {
    /// Daily negotiations quota exhausted — ends the whole run.
    QuotaExceeded,
    /// The vacancy requires completing a test first.
    TestRequired,
    /// The server says an application already exists for this vacancy.
    AlreadyApplied,
    /// Any other error code; treated as transient.
    Other(String),
}

/// Outcome of one apply call against the remote service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyResponse {
    Accepted,
    Rejected(ApplyRejection),
}

/// Session credential required to submit applications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    /// Identifier of the resume to attach to each application.
    pub resume_hash: String,
    /// Anti-forgery session token.
    pub session_token: String,
}

/// Status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Idle,
    Running,
    Paused,
    Stopped,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Idle => "idle",
            RunStatus::Running => "running",
            RunStatus::Paused => "paused",
            RunStatus::Stopped => "stopped",
        }
    }

    /// `Stopped` is terminal for the run instance; a new run starts at `Idle`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Stopped)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "idle" => Ok(RunStatus::Idle),
            "running" => Ok(RunStatus::Running),
            "paused" => Ok(RunStatus::Paused),
            "stopped" => Ok(RunStatus::Stopped),
            _ => Err(format!("Unknown run status: {}", s)),
        }
    }
}

/// Snapshot of the cumulative counters for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub status: RunStatus,
    /// Zero-based index of the listing page currently being processed.
    pub page: u32,
    pub sent: u64,
    pub processed: u64,
    pub skipped: u64,
    pub errors: u64,
    pub consecutive_failures: u32,
    pub consecutive_duplicate_hits: u32,
    /// Wall-clock run time in milliseconds, excluding paused time.
    pub elapsed_ms: u64,
}

impl Default for RunStats {
    fn default() -> Self {
        Self {
            status: RunStatus::Idle,
            page: 0,
            sent: 0,
            processed: 0,
            skipped: 0,
            errors: 0,
            consecutive_failures: 0,
            consecutive_duplicate_hits: 0,
            elapsed_ms: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_status_roundtrip() {
        for status in [
            RunStatus::Idle,
            RunStatus::Running,
            RunStatus::Paused,
            RunStatus::Stopped,
        ] {
            let s = status.as_str();
            let parsed: RunStatus = s.parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn test_terminal_states() {
        assert!(!RunStatus::Idle.is_terminal());
        assert!(!RunStatus::Running.is_terminal());
        assert!(!RunStatus::Paused.is_terminal());
        assert!(RunStatus::Stopped.is_terminal());
    }

    #[test]
    fn test_outcome_labels_and_reasons() {
        assert_eq!(SubmissionOutcome::Success.label(), "success");
        assert_eq!(SubmissionOutcome::Success.reason(), None);

        let skipped = SubmissionOutcome::skipped("duplicate");
        assert_eq!(skipped.label(), "skipped");
        assert_eq!(skipped.reason(), Some("duplicate"));

        let fatal = SubmissionOutcome::FatalStop {
            reason: "quota".into(),
        };
        assert!(fatal.is_fatal());
        assert!(!fatal.is_success());
    }
}
