use std::time::Duration;

use otklik_core::error::EngineError;
use otklik_core::models::Credential;
use otklik_core::traits::CredentialSource;
use reqwest::Client;
use serde::Deserialize;

const DEFAULT_RESUMES_URL: &str = "https://hh.ru/applicant/resumes";

#[derive(Debug, Deserialize)]
struct ResumeList {
    #[serde(default)]
    items: Vec<ResumeItem>,
}

#[derive(Debug, Deserialize)]
struct ResumeItem {
    hash: Option<String>,
}

/// Credential source for a configured session token and an optional resume
/// hash. A missing hash triggers one discovery attempt against the resume
/// list endpoint, using the first resume found; a missing token means no
/// credential at all.
#[derive(Clone)]
pub struct EnvCredentials {
    client: Client,
    resumes_url: String,
    resume_hash: Option<String>,
    session_token: Option<String>,
}

impl EnvCredentials {
    pub fn new(
        resume_hash: Option<String>,
        session_token: Option<String>,
    ) -> Result<Self, EngineError> {
        Self::with_resumes_url(resume_hash, session_token, DEFAULT_RESUMES_URL)
    }

    /// Point discovery at a different resume endpoint, used by tests.
    pub fn with_resumes_url(
        resume_hash: Option<String>,
        session_token: Option<String>,
        resumes_url: impl Into<String>,
    ) -> Result<Self, EngineError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .cookie_store(true)
            .build()
            .map_err(|e| EngineError::Http(e.to_string()))?;
        Ok(Self {
            client,
            resumes_url: resumes_url.into(),
            resume_hash: resume_hash.filter(|h| !h.is_empty()),
            session_token: session_token.filter(|t| !t.is_empty()),
        })
    }

    async fn discover_resume_hash(&self) -> Option<String> {
        let response = self
            .client
            .get(&self.resumes_url)
            .header("accept", "application/json")
            .send()
            .await
            .ok()?;
        if !response.status().is_success() {
            return None;
        }
        let list: ResumeList = response.json().await.ok()?;
        list.items.into_iter().find_map(|item| item.hash)
    }
}

impl CredentialSource for EnvCredentials {
    async fn credential(&self) -> Result<Option<Credential>, EngineError> {
        let Some(token) = &self.session_token else {
            return Ok(None);
        };

        let resume_hash = match &self.resume_hash {
            Some(hash) => hash.clone(),
            None => match self.discover_resume_hash().await {
                Some(hash) => {
                    tracing::info!("Discovered resume hash from the resume list");
                    hash
                }
                None => {
                    tracing::warn!("No resume hash configured and discovery found none");
                    return Ok(None);
                }
            },
        };

        Ok(Some(Credential {
            resume_hash,
            session_token: token.clone(),
        }))
    }
}
