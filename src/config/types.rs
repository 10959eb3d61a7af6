use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for Sumi-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub harvest: HarvestConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub session: Option<SessionConfig>,
    pub discovery: DiscoveryConfig,
    #[serde(default, rename = "source")]
    pub sources: Vec<SourceEntry>,
}

/// Fetch orchestration settings
///
/// The rate-limit and retry fields have no defaults: every run states them.
#[derive(Debug, Clone, Deserialize)]
pub struct HarvestConfig {
    /// Minimum gap between request starts, pool-wide (milliseconds)
    #[serde(rename = "base-delay")]
    pub base_delay: u64,

    /// Retries allowed per URL after the first attempt
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Growth factor for the retry delay
    #[serde(rename = "backoff-multiplier")]
    pub backoff_multiplier: f64,

    /// URLs per batch; the session is validated before each batch
    #[serde(rename = "batch-size")]
    pub batch_size: usize,

    /// Pause between batches (milliseconds)
    #[serde(rename = "batch-delay")]
    pub batch_delay: u64,

    /// Checkpoint the progress store every N recorded URLs
    #[serde(rename = "save-interval")]
    pub save_interval: usize,

    /// Skip URLs that already have a success record
    #[serde(rename = "diff-mode")]
    pub diff_mode: bool,

    /// Concurrent fetches (1 keeps the pipeline strictly sequential)
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Minimum characters an extraction stage must produce
    #[serde(rename = "min-content-length", default = "default_min_content_length")]
    pub min_content_length: usize,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout", default = "default_request_timeout")]
    pub request_timeout: u64,
}

impl HarvestConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay)
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay)
    }
}

fn default_workers() -> usize {
    1
}

fn default_min_content_length() -> usize {
    500
}

fn default_request_timeout() -> u64 {
    30
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the harvester
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the harvester
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the harvester
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for harvester-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the header value: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Output locations
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory holding the URL list, progress log, and capture log
    #[serde(rename = "index-dir")]
    pub index_dir: PathBuf,

    /// Root directory for the per-URL markdown files
    #[serde(rename = "archive-dir")]
    pub archive_dir: PathBuf,

    #[serde(rename = "url-list-file", default = "default_url_list_file")]
    pub url_list_file: String,

    #[serde(rename = "progress-file", default = "default_progress_file")]
    pub progress_file: String,

    #[serde(rename = "capture-log-file", default = "default_capture_log_file")]
    pub capture_log_file: String,
}

impl OutputConfig {
    pub fn url_list_path(&self) -> PathBuf {
        self.index_dir.join(&self.url_list_file)
    }

    pub fn progress_path(&self) -> PathBuf {
        self.index_dir.join(&self.progress_file)
    }

    pub fn capture_log_path(&self) -> PathBuf {
        self.index_dir.join(&self.capture_log_file)
    }
}

fn default_url_list_file() -> String {
    "url_list.txt".to_string()
}

fn default_progress_file() -> String {
    "manifest.jsonl".to_string()
}

fn default_capture_log_file() -> String {
    "capture_log.csv".to_string()
}

/// Authenticated session probe
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// A page that only renders the marker for a logged-in session
    #[serde(rename = "probe-url")]
    pub probe_url: String,

    /// CSS selector that must match on the probe page
    #[serde(rename = "marker-selector")]
    pub marker_selector: String,

    /// JSON cookie export used to seed the HTTP client
    #[serde(rename = "cookie-file", default)]
    pub cookie_file: Option<PathBuf>,
}

/// URL discovery settings
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryConfig {
    /// Hosts whose links count as articles (e.g., "example.com" or "*.example.com")
    #[serde(rename = "article-hosts")]
    pub article_hosts: Vec<String>,

    /// Path prefixes that identify article links
    #[serde(rename = "article-prefixes")]
    pub article_prefixes: Vec<String>,

    /// CSS selector for the "next page" control on category listings
    #[serde(rename = "next-selector", default = "default_next_selector")]
    pub next_selector: String,

    /// Upper bound on pages walked per category
    #[serde(rename = "max-pages", default = "default_max_pages")]
    pub max_pages: u32,

    /// Retries for a failing category page before the category is abandoned
    #[serde(rename = "max-page-retries", default = "default_max_page_retries")]
    pub max_page_retries: u32,

    /// Base delay for category page retries (milliseconds)
    #[serde(rename = "page-retry-delay", default = "default_page_retry_delay")]
    pub page_retry_delay: u64,
}

fn default_next_selector() -> String {
    "a.next, a[rel='next'], .pagination .next a, li.next a".to_string()
}

fn default_max_pages() -> u32 {
    500
}

fn default_max_page_retries() -> u32 {
    3
}

fn default_page_retry_delay() -> u64 {
    2000
}

/// How an index source is read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// A machine-readable listing document (sitemap style)
    Listing,
    /// Paginated HTML category pages
    Category,
}

/// One index source
#[derive(Debug, Clone, Deserialize)]
pub struct SourceEntry {
    pub kind: SourceKind,

    /// Label recorded on every entry discovered from this source
    pub name: String,

    /// Listing document URL, or page 1 of the category
    pub url: String,
}
