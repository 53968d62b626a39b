//! Test utilities: mock implementations of all collaborator traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::EngineError;
use crate::models::{ApplyResponse, Credential, Vacancy, VacancyStatus};
use crate::traits::{PageFetcher, StatusProbe, Store, Submitter, VacancyExtractor};

// ---------------------------------------------------------------------------
// MockPageFetcher
// ---------------------------------------------------------------------------

/// Mock page fetcher with a queue of responses. Each call pops the first
/// element; an exhausted queue returns an empty page.
#[derive(Clone)]
pub struct MockPageFetcher {
    responses: Arc<Mutex<Vec<Result<String, EngineError>>>>,
    pub fetched_pages: Arc<Mutex<Vec<u32>>>,
}

impl MockPageFetcher {
    pub fn with_responses(responses: Vec<Result<String, EngineError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            fetched_pages: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn empty_feed() -> Self {
        Self::with_responses(Vec::new())
    }

    /// Number of fetch calls made so far.
    pub fn calls(&self) -> usize {
        self.fetched_pages.lock().unwrap().len()
    }
}

impl PageFetcher for MockPageFetcher {
    async fn fetch_page(&self, _base_url: &str, page: u32) -> Result<String, EngineError> {
        self.fetched_pages.lock().unwrap().push(page);
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(String::new())
        } else {
            responses.remove(0)
        }
    }
}

// ---------------------------------------------------------------------------
// MockExtractor
// ---------------------------------------------------------------------------

/// Mock extractor with a queue of entry lists; an exhausted queue yields
/// nothing (feed exhaustion).
#[derive(Clone)]
pub struct MockExtractor {
    pages: Arc<Mutex<Vec<Vec<Vacancy>>>>,
}

impl MockExtractor {
    pub fn with_pages(pages: Vec<Vec<Vacancy>>) -> Self {
        Self {
            pages: Arc::new(Mutex::new(pages)),
        }
    }

    pub fn empty() -> Self {
        Self::with_pages(Vec::new())
    }
}

impl VacancyExtractor for MockExtractor {
    fn extract(&self, _page_content: &str) -> Vec<Vacancy> {
        let mut pages = self.pages.lock().unwrap();
        if pages.is_empty() {
            Vec::new()
        } else {
            pages.remove(0)
        }
    }
}

// ---------------------------------------------------------------------------
// MockProbe
// ---------------------------------------------------------------------------

/// Mock status probe. An exhausted queue reports every vacancy as eligible.
#[derive(Clone)]
pub struct MockProbe {
    responses: Arc<Mutex<Vec<Result<VacancyStatus, EngineError>>>>,
    pub checked_ids: Arc<Mutex<Vec<String>>>,
}

impl MockProbe {
    pub fn always_eligible() -> Self {
        Self::with_responses(Vec::new())
    }

    pub fn with_responses(responses: Vec<Result<VacancyStatus, EngineError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            checked_ids: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl StatusProbe for MockProbe {
    async fn check(&self, id: &str) -> Result<VacancyStatus, EngineError> {
        self.checked_ids.lock().unwrap().push(id.to_string());
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(VacancyStatus::eligible())
        } else {
            responses.remove(0)
        }
    }
}

// ---------------------------------------------------------------------------
// MockSubmitter
// ---------------------------------------------------------------------------

/// Mock submitter recording every apply call. An exhausted queue accepts.
#[derive(Clone)]
pub struct MockSubmitter {
    responses: Arc<Mutex<Vec<Result<ApplyResponse, EngineError>>>>,
    /// Recorded (vacancy id, rendered cover letter) pairs.
    pub applied: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockSubmitter {
    pub fn always_accept() -> Self {
        Self::with_responses(Vec::new())
    }

    pub fn with_responses(responses: Vec<Result<ApplyResponse, EngineError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            applied: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn calls(&self) -> usize {
        self.applied.lock().unwrap().len()
    }

    pub fn last_call(&self) -> Option<(String, String)> {
        self.applied.lock().unwrap().last().cloned()
    }
}

impl Submitter for MockSubmitter {
    async fn apply(
        &self,
        vacancy: &Vacancy,
        _credential: &Credential,
        cover_letter: &str,
    ) -> Result<ApplyResponse, EngineError> {
        self.applied
            .lock()
            .unwrap()
            .push((vacancy.id.clone(), cover_letter.to_string()));
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(ApplyResponse::Accepted)
        } else {
            responses.remove(0)
        }
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// In-memory key-value store for tests.
#[derive(Clone, Default)]
pub struct MemoryStore {
    map: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, EngineError> {
        Ok(self.map.lock().unwrap().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), EngineError> {
        self.map
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), EngineError> {
        self.map.lock().unwrap().remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// RecordingReporter
// ---------------------------------------------------------------------------

/// Engine reporter that records event labels for assertions.
#[derive(Default)]
pub struct RecordingReporter {
    pub events: Arc<Mutex<Vec<String>>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn labels(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl crate::engine::EngineReporter for RecordingReporter {
    fn report(&self, event: crate::engine::EngineEvent<'_>) {
        let label = match &event {
            crate::engine::EngineEvent::RunStarted { .. } => "RunStarted",
            crate::engine::EngineEvent::PageStarted { .. } => "PageStarted",
            crate::engine::EngineEvent::PageFailed { .. } => "PageFailed",
            crate::engine::EngineEvent::VacancyProcessed { .. } => "VacancyProcessed",
            crate::engine::EngineEvent::ResponseCapReached { .. } => "ResponseCapReached",
            crate::engine::EngineEvent::DuplicateStreakStop { .. } => "DuplicateStreakStop",
            crate::engine::EngineEvent::FeedExhausted { .. } => "FeedExhausted",
            crate::engine::EngineEvent::RunStopped { .. } => "RunStopped",
        };
        self.events.lock().unwrap().push(label.to_string());
    }
}

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

/// Create a dummy vacancy for testing.
pub fn make_test_vacancy(id: &str) -> Vacancy {
    Vacancy {
        id: id.to_string(),
        title: format!("Vacancy {id}"),
        company: "Test Company".to_string(),
        salary_text: None,
        snippet: "A job listing used in tests".to_string(),
    }
}
