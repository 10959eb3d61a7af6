//! Output module for archive files and harvest summaries
//!
//! This module handles:
//! - Writing each extracted article as a markdown file with front matter
//! - Summarizing the progress log and individual runs

mod markdown;
pub mod stats;

pub use markdown::{archive_path, content_hash, render_document, sanitize_filename, ArchiveWriter};
pub use stats::{load_statistics, print_run_report, print_statistics, LogStatistics};
