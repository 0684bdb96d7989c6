//! Quota definitions and throttling key composition.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// A quota: how many requests are admitted per fixed window.
///
/// Both fields must be positive; the limiter does not validate them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quota {
    /// Maximum requests admitted within one window
    pub max_requests: u32,
    /// Window duration in milliseconds
    pub window_ms: u64,
}

impl Quota {
    /// Create a new quota.
    pub fn new(max_requests: u32, window_ms: u64) -> Self {
        Self {
            max_requests,
            window_ms,
        }
    }

    /// The window as a `Duration`.
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

/// The class of operation being throttled.
///
/// Each class has its own quota, and the throttling key is namespaced by the
/// class so different operations never share a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationClass {
    /// X-ray classification requests proxied to the inference service
    Inference,
    /// History listing and detail reads
    History,
    /// History record deletion
    Delete,
}

impl OperationClass {
    /// Stable name used as the key namespace.
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationClass::Inference => "inference",
            OperationClass::History => "history",
            OperationClass::Delete => "delete",
        }
    }

    /// Compose the throttling identifier for a caller identity.
    pub fn key(&self, identity: &str) -> String {
        format!("{}:{}", self.as_str(), identity)
    }
}

impl fmt::Display for OperationClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_window_duration() {
        let quota = Quota::new(10, 60_000);
        assert_eq!(quota.window(), Duration::from_secs(60));
    }

    #[test]
    fn test_operation_class_names() {
        assert_eq!(OperationClass::Inference.as_str(), "inference");
        assert_eq!(OperationClass::History.as_str(), "history");
        assert_eq!(OperationClass::Delete.as_str(), "delete");
    }

    #[test]
    fn test_key_is_namespaced_by_class() {
        let key = OperationClass::Inference.key("user@example.com");
        assert_eq!(key, "inference:user@example.com");

        // Same identity, different class, different key
        assert_ne!(key, OperationClass::Delete.key("user@example.com"));
    }
}
