//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the harvester, including:
//! - Building HTTP clients with the configured user agent and timeout
//! - Seeding the cookie jar from an exported browser session
//! - GET requests and classification of their outcome
//!
//! Fetching never returns `Err`: every failure is a [`FetchResult`] variant so
//! callers can decide between retrying, skipping, and giving up.

use crate::config::{Config, UserAgentConfig};
use async_trait::async_trait;
use reqwest::cookie::Jar;
use reqwest::{redirect::Policy, Client};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Result of a fetch operation
#[derive(Debug, Clone)]
pub enum FetchResult {
    /// Successfully fetched the page
    Success {
        /// Final URL after redirects
        final_url: String,
        /// HTTP status code
        status_code: u16,
        /// Page body content
        body: String,
    },

    /// The server answered with a non-success status
    HttpError {
        /// The HTTP status code
        status_code: u16,
    },

    /// Network error (connection refused, timeout, unreadable body, ...)
    NetworkError {
        /// Error description
        error: String,
    },
}

impl FetchResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Returns true if the server reports the page permanently absent
    ///
    /// Everything else that is not a success is treated as transient.
    pub fn is_gone(&self) -> bool {
        matches!(
            self,
            Self::HttpError { status_code } if *status_code == 404 || *status_code == 410
        )
    }

    /// Short human-readable description for logs and progress records
    pub fn describe(&self) -> String {
        match self {
            Self::Success { status_code, .. } => format!("HTTP {}", status_code),
            Self::HttpError { status_code } => format!("HTTP {}", status_code),
            Self::NetworkError { error } => error.clone(),
        }
    }

    /// The body, if the fetch succeeded
    pub fn into_body(self) -> Option<String> {
        match self {
            Self::Success { body, .. } => Some(body),
            _ => None,
        }
    }
}

/// Anything that can turn a URL into a [`FetchResult`]
///
/// The orchestrator, the frontier builder, and the session validator all go
/// through this seam so they share one client (and one cookie jar).
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> FetchResult;
}

/// [`PageFetcher`] backed by a `reqwest` client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> FetchResult {
        fetch_url(&self.client, url).await
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Per-request timeout
/// * `cookies` - Optional pre-seeded cookie jar for authenticated sessions
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
    cookies: Option<Arc<Jar>>,
) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true);

    builder = match cookies {
        Some(jar) => builder.cookie_provider(jar),
        None => builder.cookie_store(true),
    };

    builder.build()
}

/// Builds the shared fetcher for a run: configured client plus the
/// session's cookie export, if any
pub fn fetcher_from_config(config: &Config) -> crate::Result<Arc<dyn PageFetcher>> {
    let cookies = config
        .session
        .as_ref()
        .and_then(|session| session.cookie_file.as_deref())
        .and_then(load_cookie_jar);

    let client = build_http_client(
        &config.user_agent,
        Duration::from_secs(config.harvest.request_timeout),
        cookies,
    )?;
    Ok(Arc::new(HttpFetcher::new(client)))
}

/// Fetches a URL once and classifies the outcome
pub async fn fetch_url(client: &Client, url: &str) -> FetchResult {
    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(e) => {
            let error = if e.is_timeout() {
                "Request timeout".to_string()
            } else if e.is_connect() {
                "Connection refused".to_string()
            } else {
                e.to_string()
            };
            return FetchResult::NetworkError { error };
        }
    };

    let status = response.status();
    let final_url = response.url().to_string();

    if !status.is_success() {
        return FetchResult::HttpError {
            status_code: status.as_u16(),
        };
    }

    match response.text().await {
        Ok(body) => FetchResult::Success {
            final_url,
            status_code: status.as_u16(),
            body,
        },
        Err(e) => FetchResult::NetworkError {
            error: format!("Failed to read body: {}", e),
        },
    }
}

/// One cookie as exported by a browser session
#[derive(Debug, Deserialize)]
struct ExportedCookie {
    name: String,
    value: String,
    domain: String,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    secure: bool,
}

/// Loads a JSON cookie export (`[{name, value, domain, path}]`) into a jar
///
/// A missing or unreadable file is logged and yields `None`; harvesting can
/// still proceed, it just may not see members-only content.
pub fn load_cookie_jar(path: &Path) -> Option<Arc<Jar>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!("Cookie file {} not loaded: {}", path.display(), e);
            return None;
        }
    };

    let cookies: Vec<ExportedCookie> = match serde_json::from_str(&content) {
        Ok(cookies) => cookies,
        Err(e) => {
            tracing::warn!("Cookie file {} is not valid JSON: {}", path.display(), e);
            return None;
        }
    };

    let jar = Jar::default();
    let mut loaded = 0;

    for cookie in &cookies {
        let host = cookie.domain.trim_start_matches('.');
        let scheme = if cookie.secure { "https" } else { "http" };
        let Ok(origin) = Url::parse(&format!("{}://{}/", scheme, host)) else {
            tracing::debug!("Skipping cookie {} with bad domain {}", cookie.name, cookie.domain);
            continue;
        };

        let cookie_str = format!(
            "{}={}; Domain={}; Path={}",
            cookie.name,
            cookie.value,
            host,
            cookie.path.as_deref().unwrap_or("/")
        );
        jar.add_cookie_str(&cookie_str, &origin);
        loaded += 1;
    }

    tracing::info!("Loaded {} cookie(s) from {}", loaded, path.display());
    Some(Arc::new(jar))
}
