//! Shared state for request handlers.

use std::sync::Arc;

use crate::config::{LungscanConfig, RateLimitingConfig};
use crate::error::Result;
use crate::history::{HistoryStore, MemoryHistoryStore};
use crate::inference::InferenceClient;
use crate::ratelimit::RateLimiter;

/// State shared across all request handlers.
pub struct AppState {
    /// Admission control for the protected endpoints
    pub limiter: Arc<RateLimiter>,
    /// Per-operation-class quotas
    pub quotas: RateLimitingConfig,
    /// Upstream inference client
    pub inference: InferenceClient,
    /// Inference history storage
    pub history: Arc<dyn HistoryStore>,
}

impl AppState {
    /// Build the shared state from configuration.
    pub fn from_config(config: &LungscanConfig, limiter: Arc<RateLimiter>) -> Result<Arc<Self>> {
        Ok(Arc::new(Self {
            limiter,
            quotas: config.rate_limiting.clone(),
            inference: InferenceClient::new(&config.inference)?,
            history: Arc::new(MemoryHistoryStore::new()),
        }))
    }
}
