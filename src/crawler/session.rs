//! Session validation before each batch

use crate::config::SessionConfig;
use crate::crawler::fetcher::PageFetcher;
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::sync::Arc;

/// Answers whether the harvesting session is still authenticated
///
/// Implementations must be free of side effects on harvest state; the
/// coordinator calls this once per batch.
#[async_trait]
pub trait SessionCheck: Send + Sync {
    async fn is_valid(&self) -> bool;
}

/// Used when no session is configured: public sites never expire
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysValid;

#[async_trait]
impl SessionCheck for AlwaysValid {
    async fn is_valid(&self) -> bool {
        true
    }
}

/// Fetches a members-only probe page and looks for a logged-in marker
pub struct ProbeSessionValidator {
    fetcher: Arc<dyn PageFetcher>,
    probe_url: String,
    marker: Selector,
}

impl ProbeSessionValidator {
    /// Builds a validator from the `[session]` table
    ///
    /// Returns `None` if the marker selector does not parse; configuration
    /// validation rejects that case before a run starts.
    pub fn new(fetcher: Arc<dyn PageFetcher>, config: &SessionConfig) -> Option<Self> {
        let marker = Selector::parse(&config.marker_selector).ok()?;
        Some(Self {
            fetcher,
            probe_url: config.probe_url.clone(),
            marker,
        })
    }
}

#[async_trait]
impl SessionCheck for ProbeSessionValidator {
    async fn is_valid(&self) -> bool {
        let result = self.fetcher.fetch(&self.probe_url).await;
        let detail = result.describe();

        let Some(body) = result.into_body() else {
            tracing::warn!(probe = %self.probe_url, "Session probe failed: {}", detail);
            return false;
        };

        let document = Html::parse_document(&body);
        let valid = document.select(&self.marker).next().is_some();

        if valid {
            tracing::debug!(probe = %self.probe_url, "Session marker present");
        } else {
            tracing::warn!(probe = %self.probe_url, "Session marker missing");
        }
        valid
    }
}
