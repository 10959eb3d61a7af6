//! Progress record types
//!
//! One JSON object per line in the progress log:
//! `{"url", "outcome", "timestamp", "retries", "error"}`.

use crate::url::CanonicalUrl;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Final outcome of processing one URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// Fetched and archived as markdown
    Success,
    /// Fetch retries or extraction stages were exhausted
    Failure,
    /// The page is permanently gone; not worth retrying this run
    Skipped,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Skipped => "skipped",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One processed URL, as appended to the progress log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub url: CanonicalUrl,
    pub outcome: Outcome,
    pub timestamp: DateTime<Utc>,
    pub retries: u32,
    pub error: Option<String>,
}

impl ProgressRecord {
    /// Creates a record stamped with the current time
    pub fn new(url: CanonicalUrl, outcome: Outcome, retries: u32, error: Option<String>) -> Self {
        Self {
            url,
            outcome,
            timestamp: Utc::now(),
            retries,
            error,
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::url::normalize_url;

    #[test]
    fn test_json_shape() {
        let record = ProgressRecord {
            url: normalize_url("https://example.com/archives/1").unwrap(),
            outcome: Outcome::Failure,
            timestamp: "2024-05-01T10:00:00Z".parse().unwrap(),
            retries: 3,
            error: Some("HTTP 503".to_string()),
        };

        let value: serde_json::Value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["url"], "https://example.com/archives/1");
        assert_eq!(value["outcome"], "failure");
        assert_eq!(value["timestamp"], "2024-05-01T10:00:00Z");
        assert_eq!(value["retries"], 3);
        assert_eq!(value["error"], "HTTP 503");
        assert_eq!(value.as_object().unwrap().len(), 5);
    }

    #[test]
    fn test_missing_error_serializes_as_null() {
        let record = ProgressRecord::new(
            normalize_url("https://example.com/archives/1").unwrap(),
            Outcome::Success,
            0,
            None,
        );
        let line = serde_json::to_string(&record).unwrap();
        assert!(line.contains("\"error\":null"));
        assert!(record.is_success());
    }

    #[test]
    fn test_outcome_strings() {
        assert_eq!(Outcome::Success.to_string(), "success");
        assert_eq!(Outcome::Failure.to_string(), "failure");
        assert_eq!(Outcome::Skipped.to_string(), "skipped");
    }
}
