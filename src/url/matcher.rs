use crate::config::DiscoveryConfig;
use crate::url::CanonicalUrl;

/// Checks if a host matches a wildcard pattern
///
/// 1. Exact match: "example.com" matches only "example.com"
/// 2. Wildcard match: "*.example.com" matches the bare domain and any subdomain
///
/// # Examples
///
/// ```
/// use sumi_harvest::url::matches_wildcard;
///
/// assert!(matches_wildcard("example.com", "example.com"));
/// assert!(!matches_wildcard("example.com", "other.com"));
/// assert!(matches_wildcard("*.example.com", "example.com"));
/// assert!(matches_wildcard("*.example.com", "api.v2.example.com"));
/// assert!(!matches_wildcard("*.example.com", "example.org"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    if let Some(base) = pattern.strip_prefix("*.") {
        candidate == base || candidate.ends_with(&format!(".{}", base))
    } else {
        candidate == pattern
    }
}

/// The link shape that identifies an article
///
/// A link is an article when its host matches one of `hosts` and its path is
/// one of `prefixes` followed by exactly one non-empty segment, e.g.
/// `/archives/<numeric-id>` or `/articles/<slug>`.
#[derive(Debug, Clone)]
pub struct ArticleShape {
    hosts: Vec<String>,
    prefixes: Vec<String>,
}

impl ArticleShape {
    pub fn new(hosts: Vec<String>, prefixes: Vec<String>) -> Self {
        let prefixes = prefixes
            .into_iter()
            .map(|p| {
                if p.ends_with('/') {
                    p
                } else {
                    format!("{}/", p)
                }
            })
            .collect();

        Self {
            hosts: hosts.into_iter().map(|h| h.to_lowercase()).collect(),
            prefixes,
        }
    }

    pub fn from_config(config: &DiscoveryConfig) -> Self {
        Self::new(config.article_hosts.clone(), config.article_prefixes.clone())
    }

    /// Returns true if `url` has the article shape
    pub fn matches(&self, url: &CanonicalUrl) -> bool {
        let Ok(parsed) = url.to_url() else {
            return false;
        };

        let Some(host) = parsed.host_str() else {
            return false;
        };

        if !self.hosts.iter().any(|pattern| matches_wildcard(pattern, host)) {
            return false;
        }

        let path = parsed.path();
        self.prefixes.iter().any(|prefix| {
            path.strip_prefix(prefix.as_str())
                .is_some_and(|rest| !rest.is_empty() && !rest.contains('/'))
        })
    }
}
