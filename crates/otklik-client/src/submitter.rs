use std::time::Duration;

use otklik_core::error::EngineError;
use otklik_core::models::{ApplyRejection, ApplyResponse, Credential, Vacancy};
use otklik_core::traits::Submitter;
use reqwest::Client;

const DEFAULT_BASE: &str = "https://hh.ru";
const RESPONSE_PATH: &str = "/applicant/vacancy_response/popup";

/// Application submitter posting the response form.
///
/// The endpoint answers rejections in-band with error codes in the body;
/// those are mapped to [`ApplyRejection`] variants so the engine can tell
/// a spent daily quota from an ordinary duplicate. Only transport failures
/// and server errors surface as `Err`.
#[derive(Clone)]
pub struct HhSubmitter {
    client: Client,
    base_url: String,
    timeout_secs: u64,
}

impl HhSubmitter {
    pub fn new() -> Result<Self, EngineError> {
        Self::with_base_url(DEFAULT_BASE)
    }

    /// Point the submitter at a different base URL, used by tests.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, EngineError> {
        let timeout = Duration::from_secs(10);
        let client = Client::builder()
            .timeout(timeout)
            .cookie_store(true)
            .build()
            .map_err(|e| EngineError::Http(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout_secs: timeout.as_secs(),
        })
    }
}

impl Submitter for HhSubmitter {
    async fn apply(
        &self,
        vacancy: &Vacancy,
        credential: &Credential,
        cover_letter: &str,
    ) -> Result<ApplyResponse, EngineError> {
        let url = format!("{}{RESPONSE_PATH}", self.base_url);
        let form: Vec<(&str, &str)> = vec![
            ("_xsrf", credential.session_token.as_str()),
            ("vacancy_id", vacancy.id.as_str()),
            ("resume_hash", credential.resume_hash.as_str()),
            ("letter", cover_letter),
            ("ignore_postponed", "true"),
            ("incomplete", "false"),
            ("lux", "true"),
        ];

        let response = self
            .client
            .post(&url)
            .header("x-xsrftoken", &credential.session_token)
            .header("x-requested-with", "XMLHttpRequest")
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EngineError::Timeout(self.timeout_secs)
                } else if e.is_connect() {
                    EngineError::Network(format!("Connection failed: {e}"))
                } else {
                    EngineError::Http(e.to_string())
                }
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(ApplyResponse::Accepted);
        }

        let body = response
            .text()
            .await
            .map_err(|e| EngineError::Http(format!("Failed to read response body: {e}")))?;

        if status.is_server_error() {
            return Err(EngineError::Http(format!(
                "HTTP {} for {}",
                status.as_u16(),
                url
            )));
        }

        Ok(ApplyResponse::Rejected(classify_rejection(
            status.as_u16(),
            &body,
        )))
    }
}

/// Map a rejection body to a domain code; unknown bodies keep a short
/// diagnostic snippet.
fn classify_rejection(status: u16, body: &str) -> ApplyRejection {
    if body.contains("negotiations-limit-exceeded") {
        ApplyRejection::QuotaExceeded
    } else if body.contains("test-required") {
        ApplyRejection::TestRequired
    } else if body.contains("already-applied") || body.contains("negotiations-exist") {
        ApplyRejection::AlreadyApplied
    } else {
        let snippet: String = body.chars().take(120).collect();
        ApplyRejection::Other(format!("HTTP {status}: {}", snippet.trim()))
    }
}
