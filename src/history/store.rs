//! History record types and the storage trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;

/// Per-class probabilities reported by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassProbabilities {
    pub normal: f64,
    pub benign: f64,
    pub malignant: f64,
}

/// A stored inference result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: Uuid,
    pub user_email: String,
    pub created_at: DateTime<Utc>,
    pub image_name: String,
    pub classification: String,
    pub confidence: f64,
    pub probabilities: ClassProbabilities,
    pub gradcam_url: Option<String>,
    pub attention_url: Option<String>,
    pub processing_time_ms: u64,
}

/// Listing projection of a record, without the visualization fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistorySummary {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub image_name: String,
    pub classification: String,
    pub confidence: f64,
    pub processing_time_ms: u64,
}

impl From<&HistoryRecord> for HistorySummary {
    fn from(record: &HistoryRecord) -> Self {
        Self {
            id: record.id,
            created_at: record.created_at,
            image_name: record.image_name.clone(),
            classification: record.classification.clone(),
            confidence: record.confidence,
            processing_time_ms: record.processing_time_ms,
        }
    }
}

/// One page of a user's history, newest first.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryPage {
    pub records: Vec<HistorySummary>,
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
}

/// Storage backend for inference history.
///
/// All operations are scoped to the owning user; a record is never visible
/// to or deletable by another user.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Persist a new record.
    async fn insert(&self, record: HistoryRecord) -> Result<()>;

    /// List one page of the user's records, newest first.
    async fn list(&self, user_email: &str, page: u32, limit: u32) -> Result<HistoryPage>;

    /// Fetch a single record by id.
    async fn get(&self, user_email: &str, id: Uuid) -> Result<Option<HistoryRecord>>;

    /// Delete a record by id. Returns whether a record was removed.
    async fn delete(&self, user_email: &str, id: Uuid) -> Result<bool>;
}
