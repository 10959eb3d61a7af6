//! Progress module: durable harvest history
//!
//! This module owns everything a harvest persists about its own progress:
//! - The append-only progress log (JSON lines) and its CSV mirror
//! - The plain-text list of discovered canonical URLs
//!
//! Any error here is fatal to a run: without a writable log the no-duplicate,
//! no-loss guarantees across restarts are void.

mod record;
mod store;
mod url_list;

pub use record::{Outcome, ProgressRecord};
pub use store::{OutcomeCounts, ProgressSnapshot, ProgressStore};
pub use url_list::{load_url_list, write_url_list};

use thiserror::Error;

/// Errors that can occur while reading or writing progress files
#[derive(Debug, Error)]
pub enum ProgressError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Capture log error: {0}")]
    Csv(String),
}

/// Result type for progress operations
pub type ProgressResult<T> = Result<T, ProgressError>;
