use std::time::Duration;

use otklik_core::error::EngineError;
use otklik_core::models::VacancyStatus;
use otklik_core::traits::StatusProbe;
use reqwest::Client;
use serde::Deserialize;

const DEFAULT_API_BASE: &str = "https://api.hh.ru";

#[derive(Debug, Deserialize)]
struct VacancyInfo {
    #[serde(default)]
    archived: bool,
    test: Option<TestInfo>,
}

#[derive(Debug, Deserialize)]
struct TestInfo {
    #[serde(default)]
    required: bool,
}

/// Eligibility probe against the public vacancy API.
///
/// An unreachable or archived vacancy, or one demanding a screening test,
/// is reported as ineligible rather than as an error: the run should move
/// on, not retry.
#[derive(Clone)]
pub struct HhStatusProbe {
    client: Client,
    base_url: String,
    timeout_secs: u64,
}

impl HhStatusProbe {
    pub fn new() -> Result<Self, EngineError> {
        Self::with_base_url(DEFAULT_API_BASE)
    }

    /// Point the probe at a different API base, used by tests.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, EngineError> {
        let timeout = Duration::from_secs(10);
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EngineError::Http(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout_secs: timeout.as_secs(),
        })
    }
}

impl StatusProbe for HhStatusProbe {
    async fn check(&self, id: &str) -> Result<VacancyStatus, EngineError> {
        let url = format!("{}/vacancies/{id}", self.base_url);

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                EngineError::Timeout(self.timeout_secs)
            } else if e.is_connect() {
                EngineError::Network(format!("Connection failed: {e}"))
            } else {
                EngineError::Http(e.to_string())
            }
        })?;

        if !response.status().is_success() {
            return Ok(VacancyStatus::ineligible("vacancy unavailable"));
        }

        let info: VacancyInfo = response
            .json()
            .await
            .map_err(|e| EngineError::Http(format!("Malformed vacancy response: {e}")))?;

        if info.archived {
            return Ok(VacancyStatus::ineligible("vacancy archived"));
        }
        if info.test.is_some_and(|t| t.required) {
            return Ok(VacancyStatus::ineligible("test required"));
        }
        Ok(VacancyStatus::eligible())
    }
}
