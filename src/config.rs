//! Configuration management for the LungScan service.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use crate::ratelimit::{OperationClass, Quota};

/// Main configuration for the LungScan service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LungscanConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Upstream inference service configuration
    #[serde(default)]
    pub inference: InferenceConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limiting: RateLimitingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server address
    #[serde(default = "default_http_addr")]
    pub http_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
        }
    }
}

fn default_http_addr() -> SocketAddr {
    "127.0.0.1:8080".parse().unwrap()
}

/// Upstream inference service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Prediction endpoint URL
    #[serde(default = "default_inference_url")]
    pub url: String,

    /// Optional bearer token sent to the inference service
    #[serde(default)]
    pub api_key: Option<String>,

    /// Upstream request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            url: default_inference_url(),
            api_key: None,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_inference_url() -> String {
    "http://127.0.0.1:8600/predict".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

/// Rate limiting configuration.
///
/// Defaults match the product contract: 10 inference, 30 history read, and
/// 5 delete requests per minute, per user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitingConfig {
    /// Sweep interval for expired window entries, in seconds
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Quota for inference requests
    #[serde(default = "default_inference_quota")]
    pub inference: Quota,

    /// Quota for history reads
    #[serde(default = "default_history_quota")]
    pub history: Quota,

    /// Quota for history deletions
    #[serde(default = "default_delete_quota")]
    pub delete: Quota,
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: default_sweep_interval(),
            inference: default_inference_quota(),
            history: default_history_quota(),
            delete: default_delete_quota(),
        }
    }
}

impl RateLimitingConfig {
    /// Quota for an operation class.
    pub fn quota(&self, class: OperationClass) -> Quota {
        match class {
            OperationClass::Inference => self.inference,
            OperationClass::History => self.history,
            OperationClass::Delete => self.delete,
        }
    }
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_inference_quota() -> Quota {
    Quota::new(10, 60_000)
}

fn default_history_quota() -> Quota {
    Quota::new(30, 60_000)
}

fn default_delete_quota() -> Quota {
    Quota::new(5, 60_000)
}

impl LungscanConfig {
    /// Load configuration from a file path.
    pub fn from_file(path: &str) -> crate::error::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: LungscanConfig = serde_yaml::from_str(&contents)
            .map_err(|e| crate::error::LungscanError::Config(e.to_string()))?;
        Ok(config)
    }
}
