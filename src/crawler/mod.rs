//! Crawler module for article fetching and run orchestration
//!
//! This module contains the core harvesting logic, including:
//! - HTTP fetching and cookie-seeded sessions
//! - Retry policy and pool-wide request pacing
//! - Session validation before each batch
//! - Overall batch coordination

mod backoff;
mod coordinator;
mod fetcher;
mod scheduler;
mod session;

pub use backoff::RetryPolicy;
pub use coordinator::{BatchState, Coordinator, RunOutcome, RunReport};
pub use fetcher::{
    build_http_client, fetch_url, fetcher_from_config, load_cookie_jar, FetchResult, HttpFetcher,
    PageFetcher,
};
pub use scheduler::{RateLimiter, ScheduledFetch, Scheduler};
pub use session::{AlwaysValid, ProbeSessionValidator, SessionCheck};
