use crate::{UrlError, UrlResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// A normalized article identifier: scheme, host, and path only
///
/// Two URLs that differ only by query string, fragment, or trailing slash
/// normalize to the same `CanonicalUrl`, so a set keyed by it never holds
/// the same article twice.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalUrl(String);

impl CanonicalUrl {
    /// Normalizes `url_str`; see [`normalize_url`]
    pub fn parse(url_str: &str) -> UrlResult<Self> {
        normalize_url(url_str)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Re-parses into a `Url`; always succeeds for values built by `normalize_url`
    pub fn to_url(&self) -> UrlResult<Url> {
        Url::parse(&self.0).map_err(|e| UrlError::Parse(e.to_string()))
    }

    /// The last path segment, if any
    pub fn slug(&self) -> Option<&str> {
        let after_scheme = self.0.split_once("://").map(|(_, rest)| rest)?;
        let path = after_scheme.split_once('/').map(|(_, path)| path)?;
        path.rsplit('/').find(|segment| !segment.is_empty())
    }

    /// Numeric article id taken from the last path segment
    ///
    /// `https://h/archives/5` yields `Some(5)`; slugs yield `None`.
    pub fn article_id(&self) -> Option<u64> {
        let slug = self.slug()?;
        if slug.bytes().all(|b| b.is_ascii_digit()) {
            slug.parse().ok()
        } else {
            None
        }
    }
}

impl fmt::Display for CanonicalUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Normalizes a URL into its canonical article form
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Require an HTTP(S) scheme and a host
/// 3. Lowercase the host (the port is kept)
/// 4. Normalize path:
///    - Remove dot segments (. and ..) and empty segments
///    - Remove trailing slash (except for root /)
/// 5. Drop the query string and fragment entirely
///
/// # Examples
///
/// ```
/// use sumi_harvest::url::normalize_url;
///
/// let a = normalize_url("https://h.example/archives/5?utm=1").unwrap();
/// let b = normalize_url("https://h.example/archives/5/").unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.as_str(), "https://h.example/archives/5");
/// ```
pub fn normalize_url(url_str: &str) -> UrlResult<CanonicalUrl> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    let host = url
        .host_str()
        .map(|h| h.to_lowercase())
        .ok_or(UrlError::MissingDomain)?;
    url.set_host(Some(&host))
        .map_err(|e| UrlError::Malformed(format!("Failed to set host: {}", e)))?;

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);
    url.set_query(None);
    url.set_fragment(None);

    Ok(CanonicalUrl(url.to_string()))
}

/// Resolves an `href` found on `base` and normalizes it
///
/// Returns `None` for links that can never be articles: empty hrefs,
/// in-page anchors, and `javascript:`, `mailto:`, `tel:` or `data:` targets.
pub fn normalize_link(href: &str, base: &Url) -> Option<CanonicalUrl> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let absolute = base.join(href).ok()?;
    normalize_url(absolute.as_str()).ok()
}

/// Normalizes a URL path by removing dot segments and trailing slashes
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", segments.join("/"))
    }
}
