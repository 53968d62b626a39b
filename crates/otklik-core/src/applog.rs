//! Store-backed application log and persisted run statistics.
//!
//! Every submission outcome is appended as a [`LogEntry`]; the log is
//! ring-capped so it never grows past [`MAX_LOG_ENTRIES`]. Run totals are
//! persisted separately at the end of each run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::models::RunStats;
use crate::traits::{Store, keys};

/// Maximum number of retained log entries; the oldest are dropped first.
pub const MAX_LOG_ENTRIES: usize = 100;

/// One submission attempt as recorded in the application log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: String,
    pub title: String,
    pub time: DateTime<Utc>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Cumulative totals across runs, persisted under [`keys::STATS`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunTotals {
    pub total_sent: u64,
    pub total_processed: u64,
    pub last_run: Option<DateTime<Utc>>,
    /// Run time of the last run in milliseconds, excluding paused time.
    pub running_time_ms: u64,
}

/// Handle for the persisted log and statistics.
#[derive(Clone)]
pub struct AppLog<S: Store> {
    store: S,
}

impl<S: Store> AppLog<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Append one entry, dropping the oldest past the cap.
    pub fn append(&self, entry: LogEntry) -> Result<(), EngineError> {
        let mut entries = self.entries()?;
        entries.push(entry);
        if entries.len() > MAX_LOG_ENTRIES {
            let excess = entries.len() - MAX_LOG_ENTRIES;
            entries.drain(..excess);
        }
        self.store
            .set(keys::API_LOG, &serde_json::to_string(&entries)?)
    }

    /// All retained entries, oldest first. A missing key is an empty log.
    pub fn entries(&self) -> Result<Vec<LogEntry>, EngineError> {
        match self.store.get(keys::API_LOG)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    /// Fold a finished run into the persisted totals.
    pub fn record_run(&self, stats: &RunStats) -> Result<(), EngineError> {
        let mut totals = self.totals()?;
        totals.total_sent += stats.sent;
        totals.total_processed += stats.processed;
        totals.last_run = Some(Utc::now());
        totals.running_time_ms = stats.elapsed_ms;
        self.store
            .set(keys::STATS, &serde_json::to_string(&totals)?)
    }

    pub fn totals(&self) -> Result<RunTotals, EngineError> {
        match self.store.get(keys::STATS)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(RunTotals::default()),
        }
    }

    /// Export totals and log as a single pretty-printed JSON document.
    pub fn export(&self) -> Result<String, EngineError> {
        let export = serde_json::json!({
            "timestamp": Utc::now(),
            "stats": self.totals()?,
            "log": self.entries()?,
        });
        Ok(serde_json::to_string_pretty(&export)?)
    }

    /// Remove the log and totals. The dedup ledger is cleared separately.
    pub fn clear(&self) -> Result<(), EngineError> {
        self.store.remove(keys::API_LOG)?;
        self.store.remove(keys::STATS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MemoryStore;

    fn entry(id: &str, success: bool) -> LogEntry {
        LogEntry {
            id: id.to_string(),
            title: format!("Vacancy {id}"),
            time: Utc::now(),
            success,
            message: if success {
                None
            } else {
                Some("network error".into())
            },
        }
    }

    #[test]
    fn append_and_read_back() {
        let log = AppLog::new(MemoryStore::new());
        log.append(entry("1", true)).unwrap();
        log.append(entry("2", false)).unwrap();

        let entries = log.entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, "1");
        assert_eq!(entries[1].message.as_deref(), Some("network error"));
    }

    #[test]
    fn log_is_ring_capped() {
        let log = AppLog::new(MemoryStore::new());
        for i in 0..(MAX_LOG_ENTRIES + 5) {
            log.append(entry(&i.to_string(), true)).unwrap();
        }
        let entries = log.entries().unwrap();
        assert_eq!(entries.len(), MAX_LOG_ENTRIES);
        assert_eq!(entries[0].id, "5", "oldest entries dropped first");
    }

    #[test]
    fn totals_accumulate_across_runs() {
        let log = AppLog::new(MemoryStore::new());
        let stats = RunStats {
            sent: 3,
            processed: 10,
            elapsed_ms: 1234,
            ..Default::default()
        };
        log.record_run(&stats).unwrap();
        log.record_run(&stats).unwrap();

        let totals = log.totals().unwrap();
        assert_eq!(totals.total_sent, 6);
        assert_eq!(totals.total_processed, 20);
        assert_eq!(totals.running_time_ms, 1234);
        assert!(totals.last_run.is_some());
    }

    #[test]
    fn clear_removes_log_and_totals() {
        let log = AppLog::new(MemoryStore::new());
        log.append(entry("1", true)).unwrap();
        log.record_run(&RunStats::default()).unwrap();
        log.clear().unwrap();

        assert!(log.entries().unwrap().is_empty());
        assert_eq!(log.totals().unwrap(), RunTotals::default());
    }

    #[test]
    fn export_is_valid_json() {
        let log = AppLog::new(MemoryStore::new());
        log.append(entry("1", true)).unwrap();
        let exported = log.export().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&exported).unwrap();
        assert!(parsed["log"].is_array());
        assert!(parsed["stats"].is_object());
    }
}
