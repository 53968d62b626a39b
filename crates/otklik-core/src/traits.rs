use std::future::Future;

use crate::error::EngineError;
use crate::models::{ApplyResponse, Credential, Vacancy, VacancyStatus};

/// Fetches one listing page of the search feed.
///
/// `page` is zero-based; implementations are responsible for turning it into
/// whatever pagination parameter the feed expects.
pub trait PageFetcher: Send + Sync + Clone {
    fn fetch_page(
        &self,
        base_url: &str,
        page: u32,
    ) -> impl Future<Output = Result<String, EngineError>> + Send;
}

/// Extracts vacancies from raw listing-page markup.
///
/// Implementations try an ordered cascade of strategies; the engine only
/// requires that an empty `Vec` means "nothing found" and that extraction
/// never fails.
pub trait VacancyExtractor: Send + Sync + Clone {
    fn extract(&self, page_content: &str) -> Vec<Vacancy>;
}

/// Queries the remote service for a vacancy's eligibility before applying.
pub trait StatusProbe: Send + Sync + Clone {
    fn check(&self, id: &str) -> impl Future<Output = Result<VacancyStatus, EngineError>> + Send;
}

/// Submits one application against the remote service.
///
/// Transport-level failures surface as `Err`; domain-level rejections come
/// back as `Ok(ApplyResponse::Rejected(_))` so the controller can classify
/// them without string-matching error messages.
pub trait Submitter: Send + Sync + Clone {
    fn apply(
        &self,
        vacancy: &Vacancy,
        credential: &Credential,
        cover_letter: &str,
    ) -> impl Future<Output = Result<ApplyResponse, EngineError>> + Send;
}

/// Supplies the current session credential.
///
/// `Ok(None)` means no credential is available, in which case a run cannot
/// start and in-flight submissions fail without retry.
pub trait CredentialSource: Send + Sync + Clone {
    fn credential(&self) -> impl Future<Output = Result<Option<Credential>, EngineError>> + Send;
}

/// Persistent key-value store backing the dedup ledger, application log,
/// run statistics, and the saved filter URL.
///
/// Reads return last-written values; a missing key is not an error.
pub trait Store: Send + Sync + Clone {
    fn get(&self, key: &str) -> Result<Option<String>, EngineError>;
    fn set(&self, key: &str, value: &str) -> Result<(), EngineError>;
    fn remove(&self, key: &str) -> Result<(), EngineError>;
}

/// Well-known store keys shared between the engine and the CLI.
pub mod keys {
    pub const SENT_RESPONSES: &str = "sent_responses";
    pub const API_LOG: &str = "api_log";
    pub const STATS: &str = "stats";
    pub const FILTER_URL: &str = "filter_url";
}

/// A `CredentialSource` holding a fixed, pre-resolved credential (or none).
#[derive(Debug, Clone)]
pub struct StaticCredentials(Option<Credential>);

impl StaticCredentials {
    pub fn new(credential: Credential) -> Self {
        Self(Some(credential))
    }

    pub fn empty() -> Self {
        Self(None)
    }
}

impl CredentialSource for StaticCredentials {
    async fn credential(&self) -> Result<Option<Credential>, EngineError> {
        Ok(self.0.clone())
    }
}
