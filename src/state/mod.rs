//! State module for tracking per-URL fetch progress
//!
//! `UrlState` is transient: it lives for the duration of one URL's processing.
//! Durable history belongs to the progress store.

mod url_state;

pub use url_state::UrlState;
