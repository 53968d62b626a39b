//! JSON configuration file mapped onto the engine's config types.
//!
//! Every field is optional; omitted values fall back to the engine
//! defaults. Durations are plain millisecond integers.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use otklik_core::engine::EngineConfig;
use otklik_core::filter::FilterConfig;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub max_pages: Option<u32>,
    pub max_responses: Option<u64>,
    pub base_delay_ms: Option<u64>,
    pub page_delay_ms: Option<u64>,
    pub jitter_factor: Option<f64>,
    pub max_retries: Option<u32>,
    pub retry_delay_ms: Option<u64>,
    pub cover_letter: Option<String>,
    pub filter: FilterConfig,
}

impl FileConfig {
    /// Read a config file; a `None` path yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Invalid JSON in config file: {}", path.display()))
    }

    pub fn into_engine_config(self) -> EngineConfig {
        let mut config = EngineConfig::default();
        if let Some(max_pages) = self.max_pages {
            config.max_pages = max_pages;
        }
        if let Some(max_responses) = self.max_responses {
            config.max_responses = max_responses;
        }
        if let Some(ms) = self.base_delay_ms {
            config.delays.base_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = self.page_delay_ms {
            config.delays.page_delay = Duration::from_millis(ms);
        }
        if let Some(factor) = self.jitter_factor {
            config.delays.jitter_factor = factor;
        }
        if let Some(max_retries) = self.max_retries {
            config.retry.max_retries = max_retries;
        }
        if let Some(ms) = self.retry_delay_ms {
            config.retry.retry_delay = Duration::from_millis(ms);
        }
        if let Some(letter) = self.cover_letter {
            config.cover_letter = letter;
        }
        config.filter = self.filter;
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_path_yields_defaults() {
        let config = FileConfig::load(None).unwrap().into_engine_config();
        let defaults = EngineConfig::default();
        assert_eq!(config.max_pages, defaults.max_pages);
        assert_eq!(config.max_responses, defaults.max_responses);
        assert_eq!(config.delays.base_delay, defaults.delays.base_delay);
    }

    #[test]
    fn partial_file_overrides_only_named_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "max_responses": 50,
                "base_delay_ms": 1500,
                "cover_letter": "Hello {{#vacancyName}}",
                "filter": {{ "min_salary": 100000, "blacklisted_companies": ["EvilCorp"] }}
            }}"#
        )
        .unwrap();

        let config = FileConfig::load(Some(file.path()))
            .unwrap()
            .into_engine_config();
        assert_eq!(config.max_responses, 50);
        assert_eq!(config.delays.base_delay, Duration::from_millis(1500));
        assert_eq!(config.cover_letter, "Hello {#vacancyName}");
        assert_eq!(config.filter.min_salary, 100_000);
        assert_eq!(config.filter.blacklisted_companies, vec!["EvilCorp"]);
        assert_eq!(config.max_pages, EngineConfig::default().max_pages);
    }

    #[test]
    fn nonexistent_explicit_path_is_an_error() {
        assert!(FileConfig::load(Some(Path::new("/does/not/exist.json"))).is_err());
    }
}
