//! URL handling module for Sumi-Harvest
//!
//! This module provides canonical URL normalization, link resolution, host
//! wildcard matching, and the article-shape filter used during discovery.

mod matcher;
mod normalize;

pub use matcher::{matches_wildcard, ArticleShape};
pub use normalize::{normalize_link, normalize_url, CanonicalUrl};
