//! Machine-readable listing documents (sitemap style)
//!
//! Locations are pulled out with two independent passes, one for
//! `<loc><![CDATA[...]]></loc>` and one for plain `<loc>...</loc>`, and the
//! results are merged. Documents are not consistent about which form they
//! use, so neither pass is a fallback for the other.

use super::{DiscoveredSet, DiscoveryError, FrontierBuilder};
use crate::config::SourceEntry;
use crate::url::normalize_url;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use url::Url;

static CDATA_LOC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<loc>\s*<!\[CDATA\[(.*?)\]\]>\s*</loc>").expect("valid CDATA loc pattern")
});

static PLAIN_LOC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<loc>\s*([^<\s]+)\s*</loc>").expect("valid loc pattern"));

/// Every location in a listing document, in first-seen order
pub fn extract_locations(document: &str) -> Vec<String> {
    let escaped = CDATA_LOC
        .captures_iter(document)
        .map(|c| c[1].trim().to_string());
    let plain = PLAIN_LOC
        .captures_iter(document)
        .map(|c| decode_entities(c[1].trim()));

    let mut seen = HashSet::new();
    escaped
        .chain(plain)
        .filter(|loc| !loc.is_empty())
        .filter(|loc| seen.insert(loc.clone()))
        .collect()
}

/// Returns true if a location points at another listing document
pub fn is_nested_listing(location: &str) -> bool {
    Url::parse(location).is_ok_and(|url| url.path().to_ascii_lowercase().ends_with(".xml"))
}

fn decode_entities(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Reads one listing source, following nested listings one level deep
pub(super) async fn collect(
    builder: &FrontierBuilder,
    source: &SourceEntry,
    found: &mut DiscoveredSet,
) -> Result<usize, DiscoveryError> {
    let document = builder.fetch_page(&source.url).await?;
    let locations = extract_locations(&document);
    tracing::debug!("{} lists {} location(s)", source.url, locations.len());

    let mut added = 0;
    let mut children = Vec::new();

    for location in locations {
        if is_nested_listing(&location) {
            children.push(location);
            continue;
        }
        added += accept_location(builder, source, &location, found);
    }

    for child in children {
        match builder.fetch_page(&child).await {
            Ok(document) => {
                for location in extract_locations(&document) {
                    if is_nested_listing(&location) {
                        tracing::debug!("Not following listing nested twice: {}", location);
                        continue;
                    }
                    added += accept_location(builder, source, &location, found);
                }
            }
            Err(e) => tracing::warn!("Nested listing skipped: {}", e),
        }
    }

    Ok(added)
}

fn accept_location(
    builder: &FrontierBuilder,
    source: &SourceEntry,
    location: &str,
    found: &mut DiscoveredSet,
) -> usize {
    match normalize_url(location) {
        Ok(url) => usize::from(builder.accept(url, source, found)),
        Err(e) => {
            tracing::debug!("Ignoring location '{}': {}", location, e);
            0
        }
    }
}
