//! Frontier builder: discovers every article URL a harvest should visit
//!
//! Sources are read in configuration order. Each one adds to a single
//! discovered set, keyed by canonical URL, that the builder owns and lends to
//! the per-source collectors. The first source to find a URL is the one
//! recorded for it.
//!
//! An unreachable source is logged and skipped. Discovery only fails when
//! every source failed or nothing was found at all.

mod category;
mod listing;

pub use category::{parse_category_page, CategoryPage};
pub use listing::{extract_locations, is_nested_listing};

use crate::config::{Config, DiscoveryConfig, SourceEntry, SourceKind};
use crate::crawler::{PageFetcher, RateLimiter, RetryPolicy};
use crate::url::{ArticleShape, CanonicalUrl};
use crate::{ConfigError, HarvestError, Result};
use scraper::Selector;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// One discovered article
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    pub url: CanonicalUrl,

    /// Name of the source that first listed this URL
    pub source: String,

    /// Numeric id from the last path segment, when it is all digits
    pub article_id: Option<u64>,
}

impl FrontierEntry {
    pub fn new(url: CanonicalUrl, source: impl Into<String>) -> Self {
        let article_id = url.article_id();
        Self {
            url,
            source: source.into(),
            article_id,
        }
    }
}

/// Why a single source could not be read
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("{url} unreachable after {attempts} attempt(s): {detail}")]
    Unreachable {
        url: String,
        attempts: u32,
        detail: String,
    },

    #[error("Invalid source URL '{0}'")]
    InvalidUrl(String),
}

/// Canonical URLs found so far, each with the source that found it first
#[derive(Debug, Default)]
pub struct DiscoveredSet {
    entries: HashMap<CanonicalUrl, FrontierEntry>,
}

impl DiscoveredSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a URL unless it is already known; returns true if it was new
    pub fn insert(&mut self, url: CanonicalUrl, source: &str) -> bool {
        if self.entries.contains_key(&url) {
            return false;
        }
        let entry = FrontierEntry::new(url.clone(), source);
        self.entries.insert(url, entry);
        true
    }

    pub fn contains(&self, url: &CanonicalUrl) -> bool {
        self.entries.contains_key(url)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consumes the set into the frontier order
    pub fn into_sorted(self) -> Vec<FrontierEntry> {
        let mut entries: Vec<FrontierEntry> = self.entries.into_values().collect();
        sort_frontier(&mut entries);
        entries
    }
}

/// Newest first: entries with an article id by descending id, then the
/// rest by ascending URL
pub fn sort_frontier(entries: &mut [FrontierEntry]) {
    entries.sort_by(|a, b| match (a.article_id, b.article_id) {
        (Some(x), Some(y)) => y.cmp(&x).then_with(|| a.url.cmp(&b.url)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.url.cmp(&b.url),
    });
}

/// Frontier entries for a previously written URL list, order preserved
pub fn entries_from_list(urls: Vec<CanonicalUrl>) -> Vec<FrontierEntry> {
    urls.into_iter()
        .map(|url| FrontierEntry::new(url, "url-list"))
        .collect()
}

/// Reads index sources and builds the frontier
pub struct FrontierBuilder {
    fetcher: Arc<dyn PageFetcher>,
    shape: ArticleShape,
    next_selector: Selector,
    max_pages: u32,
    page_policy: RetryPolicy,
    limiter: RateLimiter,
}

impl FrontierBuilder {
    pub fn new(config: &Config, fetcher: Arc<dyn PageFetcher>) -> Result<Self> {
        let discovery: &DiscoveryConfig = &config.discovery;
        let next_selector = Selector::parse(&discovery.next_selector).map_err(|e| {
            ConfigError::Validation(format!(
                "Invalid CSS selector for next_selector: {:?}",
                e
            ))
        })?;

        Ok(Self {
            fetcher,
            shape: ArticleShape::from_config(discovery),
            next_selector,
            max_pages: discovery.max_pages,
            page_policy: RetryPolicy::new(
                Duration::from_millis(discovery.page_retry_delay),
                config.harvest.backoff_multiplier,
                discovery.max_page_retries,
            ),
            limiter: RateLimiter::new(config.harvest.base_delay()),
        })
    }

    /// Discovers, deduplicates and orders every article URL
    ///
    /// # Returns
    ///
    /// * `Ok(entries)` - The frontier, newest first
    /// * `Err(HarvestError::NoUrlsFound)` - Every source failed or none
    ///   listed a single article
    pub async fn build(&self, sources: &[SourceEntry]) -> Result<Vec<FrontierEntry>> {
        let mut found = DiscoveredSet::new();
        let mut failed = 0;

        for source in sources {
            tracing::info!("Discovering from {} ({})", source.name, source.url);

            let result = match source.kind {
                SourceKind::Listing => listing::collect(self, source, &mut found).await,
                SourceKind::Category => category::collect(self, source, &mut found).await,
            };

            match result {
                Ok(added) => tracing::info!(
                    "Source {}: {} new URL(s), {} total",
                    source.name,
                    added,
                    found.len()
                ),
                Err(e) => {
                    failed += 1;
                    tracing::warn!("Source {} skipped: {}", source.name, e);
                }
            }
        }

        if failed == sources.len() || found.is_empty() {
            tracing::error!(
                "Discovery found no URLs ({} of {} source(s) failed)",
                failed,
                sources.len()
            );
            return Err(HarvestError::NoUrlsFound);
        }

        Ok(found.into_sorted())
    }

    /// Adds `url` if it has the article shape; returns true if it was new
    fn accept(&self, url: CanonicalUrl, source: &SourceEntry, found: &mut DiscoveredSet) -> bool {
        self.shape.matches(&url) && found.insert(url, &source.name)
    }

    /// Loads one index page, retrying transient failures with backoff
    async fn fetch_page(&self, url: &str) -> std::result::Result<String, DiscoveryError> {
        let mut retries = 0;

        loop {
            self.limiter.acquire().await;
            let result = self.fetcher.fetch(url).await;
            let detail = result.describe();
            let gone = result.is_gone();

            if let Some(body) = result.into_body() {
                return Ok(body);
            }

            if gone || !self.page_policy.should_retry(retries) {
                return Err(DiscoveryError::Unreachable {
                    url: url.to_string(),
                    attempts: retries + 1,
                    detail,
                });
            }

            let delay = self.page_policy.delay_for(retries);
            tracing::warn!(
                url,
                retries,
                delay_ms = delay.as_millis() as u64,
                "Index page failed: {}, retrying",
                detail
            );
            tokio::time::sleep(delay).await;
            retries += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::url::normalize_url;

    fn entry(url: &str) -> FrontierEntry {
        FrontierEntry::new(normalize_url(url).unwrap(), "test")
    }

    #[test]
    fn test_descending_id_order() {
        let mut entries = vec![
            entry("https://h.com/archives/3"),
            entry("https://h.com/archives/1"),
            entry("https://h.com/archives/9"),
        ];
        sort_frontier(&mut entries);

        let ids: Vec<_> = entries.iter().map(|e| e.article_id).collect();
        assert_eq!(ids, vec![Some(9), Some(3), Some(1)]);
    }

    #[test]
    fn test_slugs_follow_ids_lexically() {
        let mut entries = vec![
            entry("https://h.com/articles/zeta"),
            entry("https://h.com/archives/2"),
            entry("https://h.com/articles/alpha"),
        ];
        sort_frontier(&mut entries);

        let urls: Vec<_> = entries.iter().map(|e| e.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://h.com/archives/2",
                "https://h.com/articles/alpha",
                "https://h.com/articles/zeta",
            ]
        );
    }

    #[test]
    fn test_discovered_set_dedupes_variants() {
        let mut found = DiscoveredSet::new();
        assert!(found.insert(normalize_url("https://h/archives/5?utm=1").unwrap(), "a"));
        assert!(!found.insert(normalize_url("https://h/archives/5/").unwrap(), "b"));
        assert_eq!(found.len(), 1);

        let entries = found.into_sorted();
        assert_eq!(entries[0].source, "a");
        assert_eq!(entries[0].article_id, Some(5));
    }

    #[test]
    fn test_entries_from_list_keep_order() {
        let urls = vec![
            normalize_url("https://h.com/archives/1").unwrap(),
            normalize_url("https://h.com/archives/2").unwrap(),
        ];
        let entries = entries_from_list(urls);
        assert_eq!(entries[0].article_id, Some(1));
        assert_eq!(entries[1].source, "url-list");
    }
}
