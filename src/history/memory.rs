//! In-memory history store.
//!
//! Records live for the process lifetime, which is all the demo needs. The
//! `HistoryStore` trait is the seam where a hosted-database client would
//! plug in.

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use super::store::{HistoryPage, HistoryRecord, HistoryStore, HistorySummary};
use crate::error::Result;

/// History store backed by a process-local vector.
#[derive(Default)]
pub struct MemoryHistoryStore {
    records: RwLock<Vec<HistoryRecord>>,
}

impl MemoryHistoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records across all users.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn insert(&self, record: HistoryRecord) -> Result<()> {
        self.records.write().push(record);
        Ok(())
    }

    async fn list(&self, user_email: &str, page: u32, limit: u32) -> Result<HistoryPage> {
        let records = self.records.read();

        let mut owned: Vec<&HistoryRecord> = records
            .iter()
            .filter(|r| r.user_email == user_email)
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = owned.len() as u64;
        let total_pages = total.div_ceil(limit.max(1) as u64);
        let offset = page.saturating_sub(1) as usize * limit as usize;

        let summaries: Vec<HistorySummary> = owned
            .into_iter()
            .skip(offset)
            .take(limit as usize)
            .map(HistorySummary::from)
            .collect();

        Ok(HistoryPage {
            records: summaries,
            page,
            limit,
            total,
            total_pages,
        })
    }

    async fn get(&self, user_email: &str, id: Uuid) -> Result<Option<HistoryRecord>> {
        let records = self.records.read();
        Ok(records
            .iter()
            .find(|r| r.id == id && r.user_email == user_email)
            .cloned())
    }

    async fn delete(&self, user_email: &str, id: Uuid) -> Result<bool> {
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|r| !(r.id == id && r.user_email == user_email));
        Ok(records.len() < before)
    }
}
