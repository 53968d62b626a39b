//! HTTP-facing implementations of the engine's collaborator traits:
//! the listing-page fetcher, the markup extractor, the eligibility probe,
//! the application submitter, and credential discovery.

pub mod credentials;
pub mod extract;
pub mod fetcher;
pub mod normalize;
pub mod probe;
pub mod submitter;

pub use credentials::EnvCredentials;
pub use extract::SelectorExtractor;
pub use fetcher::ReqwestPageFetcher;
pub use probe::HhStatusProbe;
pub use submitter::HhSubmitter;
