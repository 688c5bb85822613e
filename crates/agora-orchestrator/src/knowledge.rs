use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A value in the shared knowledge store, attributed to its last writer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub key: String,
    pub value: serde_json::Value,
    pub written_by: String,
    pub updated_at: DateTime<Utc>,
}

/// Last-write-wins key/value store visible to every agent through the hub.
///
/// There is no versioning: a write replaces the previous value and its
/// attribution.
#[derive(Default)]
pub struct SharedKnowledge {
    entries: RwLock<HashMap<String, KnowledgeEntry>>,
}

impl SharedKnowledge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `value` under `key`, returning the entry it replaced.
    pub fn update(
        &self,
        key: impl Into<String>,
        value: serde_json::Value,
        writer: impl Into<String>,
    ) -> Option<KnowledgeEntry> {
        let key = key.into();
        let entry = KnowledgeEntry {
            key: key.clone(),
            value,
            written_by: writer.into(),
            updated_at: Utc::now(),
        };
        self.entries.write().insert(key, entry)
    }

    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.entries.read().get(key).map(|e| e.value.clone())
    }

    pub fn entry(&self, key: &str) -> Option<KnowledgeEntry> {
        self.entries.read().get(key).cloned()
    }

    /// All entries sorted by key.
    pub fn snapshot(&self) -> Vec<KnowledgeEntry> {
        let mut entries: Vec<KnowledgeEntry> = self.entries.read().values().cloned().collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        entries
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_last_write_wins() {
        let store = SharedKnowledge::new();
        assert!(store.update("k", serde_json::json!(1), "a1").is_none());
        let previous = store.update("k", serde_json::json!(2), "a2").unwrap();
        assert_eq!(previous.written_by, "a1");

        assert_eq!(store.get("k"), Some(serde_json::json!(2)));
        let entry = store.entry("k").unwrap();
        assert_eq!(entry.written_by, "a2");
        assert!(entry.updated_at >= previous.updated_at);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_missing_key() {
        let store = SharedKnowledge::new();
        assert!(store.get("nope").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_snapshot_sorted() {
        let store = SharedKnowledge::new();
        store.update("zeta", serde_json::json!(true), "a1");
        store.update("alpha", serde_json::json!(false), "a2");
        let keys: Vec<_> = store.snapshot().into_iter().map(|e| e.key).collect();
        assert_eq!(keys, vec!["alpha", "zeta"]);
    }
}
