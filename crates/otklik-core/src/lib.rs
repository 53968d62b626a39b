pub mod applog;
pub mod engine;
pub mod error;
pub mod filter;
pub mod ledger;
pub mod models;
pub mod run;
pub mod schedule;
pub mod submit;
pub mod testutil;
pub mod traits;

pub use engine::{EngineConfig, EngineEvent, EngineReporter, ResponseEngine, TracingReporter};
pub use error::EngineError;
pub use filter::{FilterConfig, FilterVerdict, evaluate};
pub use models::{ApplyRejection, ApplyResponse, Credential, RunStats, RunStatus, SubmissionOutcome, Vacancy};
pub use run::RunHandle;
pub use schedule::{DelayConfig, RetryConfig};
pub use traits::{CredentialSource, PageFetcher, StatusProbe, Store, Submitter, VacancyExtractor};
