//! In-process record sink for tests and local dry runs

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

use super::{IngestSink, InsertOutcome};
use crate::error::{StoreError, StoreResult};
use crate::record::CatalogRecord;

#[derive(Default)]
struct Inner {
    records: HashMap<String, CatalogRecord>,
    unavailable: bool,
}

#[derive(Default)]
pub struct MemoryRecordSink {
    inner: Mutex<Inner>,
}

impl MemoryRecordSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn get(&self, permalink_url: &str) -> Option<CatalogRecord> {
        self.inner.lock().await.records.get(permalink_url).cloned()
    }

    /// Stored records sorted by permalink.
    pub async fn records(&self) -> Vec<CatalogRecord> {
        let mut records: Vec<_> = self.inner.lock().await.records.values().cloned().collect();
        records.sort_by(|a, b| a.permalink_url.cmp(&b.permalink_url));
        records
    }

    pub async fn set_unavailable(&self, unavailable: bool) {
        self.inner.lock().await.unavailable = unavailable;
    }
}

#[async_trait]
impl IngestSink for MemoryRecordSink {
    async fn insert(&self, record: &CatalogRecord) -> StoreResult<InsertOutcome> {
        let mut inner = self.inner.lock().await;
        if inner.unavailable {
            return Err(StoreError::unavailable("in-memory record sink switched off"));
        }

        if inner.records.contains_key(&record.permalink_url) {
            return Ok(InsertOutcome::Duplicate);
        }
        inner
            .records
            .insert(record.permalink_url.clone(), record.clone());
        Ok(InsertOutcome::Inserted)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn record(permalink: &str, title: &str) -> CatalogRecord {
        CatalogRecord {
            permalink_url: permalink.to_string(),
            download_url: None,
            license: "cc-by".to_string(),
            title: title.to_string(),
            description: String::new(),
            created_at: None,
            genre: String::new(),
            track_type: String::new(),
            username: "someone".to_string(),
            label_name: String::new(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_permalink_keeps_first_record() {
        let sink = MemoryRecordSink::new();

        let first = sink.insert(&record("https://c.example/a", "first")).await.unwrap();
        let second = sink.insert(&record("https://c.example/a", "second")).await.unwrap();

        assert_eq!(first, InsertOutcome::Inserted);
        assert_eq!(second, InsertOutcome::Duplicate);
        assert_eq!(sink.len().await, 1);
        assert_eq!(sink.get("https://c.example/a").await.unwrap().title, "first");
    }

    #[tokio::test]
    async fn test_unavailable_sink_rejects_inserts() {
        let sink = MemoryRecordSink::new();
        sink.set_unavailable(true).await;

        let err = sink.insert(&record("https://c.example/a", "a")).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert!(sink.is_empty().await);
    }
}
