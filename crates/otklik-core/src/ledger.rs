//! Persistent set of vacancy ids that already received an application.
//!
//! Backed by the [`Store`] collaborator and capped so the ledger cannot grow
//! without bound: once `cap` ids are held, the oldest are evicted first.

use std::collections::{HashSet, VecDeque};

use crate::error::EngineError;
use crate::traits::{Store, keys};

/// Default cap on remembered ids.
pub const DEFAULT_LEDGER_CAP: usize = 10_000;

/// FIFO-capped dedup set persisted as a JSON array under
/// [`keys::SENT_RESPONSES`].
pub struct DedupLedger<S: Store> {
    store: S,
    order: VecDeque<String>,
    seen: HashSet<String>,
    cap: usize,
}

impl<S: Store> DedupLedger<S> {
    /// Load the ledger from the store. A missing key is an empty ledger.
    pub fn load(store: S) -> Result<Self, EngineError> {
        Self::load_with_cap(store, DEFAULT_LEDGER_CAP)
    }

    pub fn load_with_cap(store: S, cap: usize) -> Result<Self, EngineError> {
        let order: VecDeque<String> = match store.get(keys::SENT_RESPONSES)? {
            Some(raw) => serde_json::from_str(&raw)?,
            None => VecDeque::new(),
        };
        let seen = order.iter().cloned().collect();
        let mut ledger = Self {
            store,
            order,
            seen,
            cap,
        };
        // A previously persisted ledger may exceed a newly lowered cap.
        if ledger.order.len() > cap {
            ledger.evict_to_cap();
            ledger.persist()?;
        }
        Ok(ledger)
    }

    pub fn has(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Record an id as submitted. Idempotent: marking an already-present id
    /// is a no-op and does not disturb eviction order.
    pub fn mark(&mut self, id: &str) -> Result<(), EngineError> {
        if self.seen.contains(id) {
            return Ok(());
        }
        self.order.push_back(id.to_string());
        self.seen.insert(id.to_string());
        self.evict_to_cap();
        self.persist()
    }

    fn evict_to_cap(&mut self) {
        while self.order.len() > self.cap {
            if let Some(evicted) = self.order.pop_front() {
                self.seen.remove(&evicted);
            }
        }
    }

    fn persist(&self) -> Result<(), EngineError> {
        let raw = serde_json::to_string(&self.order)?;
        self.store.set(keys::SENT_RESPONSES, &raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MemoryStore;

    #[test]
    fn missing_key_is_empty_ledger() {
        let ledger = DedupLedger::load(MemoryStore::new()).unwrap();
        assert!(ledger.is_empty());
        assert!(!ledger.has("1"));
    }

    #[test]
    fn mark_and_reload() {
        let store = MemoryStore::new();
        let mut ledger = DedupLedger::load(store.clone()).unwrap();
        ledger.mark("101").unwrap();
        ledger.mark("102").unwrap();
        assert!(ledger.has("101"));
        assert_eq!(ledger.len(), 2);

        let reloaded = DedupLedger::load(store).unwrap();
        assert!(reloaded.has("101"));
        assert!(reloaded.has("102"));
        assert_eq!(reloaded.len(), 2);
    }

    #[test]
    fn mark_is_idempotent() {
        let mut ledger = DedupLedger::load(MemoryStore::new()).unwrap();
        ledger.mark("101").unwrap();
        ledger.mark("101").unwrap();
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn fifo_eviction_at_cap() {
        let mut ledger = DedupLedger::load_with_cap(MemoryStore::new(), 3).unwrap();
        for id in ["1", "2", "3", "4"] {
            ledger.mark(id).unwrap();
        }
        assert_eq!(ledger.len(), 3);
        assert!(!ledger.has("1"), "oldest id should be evicted first");
        assert!(ledger.has("2"));
        assert!(ledger.has("4"));
    }

    #[test]
    fn reload_with_lower_cap_evicts_oldest() {
        let store = MemoryStore::new();
        let mut ledger = DedupLedger::load(store.clone()).unwrap();
        for id in ["1", "2", "3", "4", "5"] {
            ledger.mark(id).unwrap();
        }
        let reloaded = DedupLedger::load_with_cap(store, 2).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert!(reloaded.has("4"));
        assert!(reloaded.has("5"));
        assert!(!reloaded.has("1"));
    }
}
