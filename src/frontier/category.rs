//! Paginated HTML category listings
//!
//! Pages are walked from the source URL by following the "next" control
//! until it is missing or disabled, the page budget runs out, or a page
//! repeats.

use super::{DiscoveredSet, DiscoveryError, FrontierBuilder};
use crate::config::SourceEntry;
use crate::url::{normalize_link, CanonicalUrl};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Links and pagination read from one category page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryPage {
    /// Every normalized link on the page, in document order
    pub links: Vec<CanonicalUrl>,

    /// The next page, if the control is present and enabled
    pub next: Option<Url>,
}

/// Parses a category page fetched from `base`
pub fn parse_category_page(html: &str, base: &Url, next_selector: &Selector) -> CategoryPage {
    let document = Html::parse_document(html);

    let links = match Selector::parse("a[href]") {
        Ok(anchors) => document
            .select(&anchors)
            .filter_map(|a| a.value().attr("href"))
            .filter_map(|href| normalize_link(href, base))
            .collect(),
        Err(_) => Vec::new(),
    };

    let next = document
        .select(next_selector)
        .next()
        .and_then(|control| next_target(control, base));

    CategoryPage { links, next }
}

/// Resolves the next-page control, or `None` if it is disabled or points
/// at a placeholder
fn next_target(control: ElementRef, base: &Url) -> Option<Url> {
    let marked_disabled = std::iter::once(control)
        .chain(control.ancestors().filter_map(ElementRef::wrap).take(2))
        .any(is_disabled);
    if marked_disabled {
        return None;
    }

    let href = match control.value().attr("href") {
        Some(href) => href,
        None => {
            let anchor = Selector::parse("a[href]").ok()?;
            control.select(&anchor).next()?.value().attr("href")?
        }
    };

    let href = href.trim();
    if href.is_empty() || href.starts_with('#') || href.to_ascii_lowercase().starts_with("javascript:") {
        return None;
    }

    let mut next = base.join(href).ok()?;
    next.set_fragment(None);
    Some(next)
}

fn is_disabled(element: ElementRef) -> bool {
    let value = element.value();

    value.classes().any(|class| class.eq_ignore_ascii_case("disabled"))
        || value.attr("disabled").is_some()
        || value
            .attr("aria-disabled")
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
}

/// Walks one category and adds its article links to `found`
///
/// A first page that cannot be loaded fails the source. A later page that
/// cannot be loaded ends the walk; links already gathered are kept.
pub(super) async fn collect(
    builder: &FrontierBuilder,
    source: &SourceEntry,
    found: &mut DiscoveredSet,
) -> Result<usize, DiscoveryError> {
    let mut page_url =
        Url::parse(&source.url).map_err(|_| DiscoveryError::InvalidUrl(source.url.clone()))?;
    let mut visited = HashSet::new();
    let mut pages: u32 = 0;
    let mut added = 0;

    loop {
        if !visited.insert(page_url.to_string()) {
            tracing::warn!("Pagination loop at {}, stopping", page_url);
            break;
        }
        if pages >= builder.max_pages {
            tracing::warn!(
                "Category {} reached the {} page limit",
                source.name,
                builder.max_pages
            );
            break;
        }

        let body = match builder.fetch_page(page_url.as_str()).await {
            Ok(body) => body,
            Err(e) if pages == 0 => return Err(e),
            Err(e) => {
                tracing::warn!("Abandoning category {} at page {}: {}", source.name, pages + 1, e);
                break;
            }
        };
        pages += 1;

        let page = parse_category_page(&body, &page_url, &builder.next_selector);
        let before = added;
        for link in page.links {
            if builder.accept(link, source, found) {
                added += 1;
            }
        }
        tracing::debug!(
            "{} page {}: {} new article link(s)",
            source.name,
            pages,
            added - before
        );

        match page.next {
            Some(next) => page_url = next,
            None => break,
        }
    }

    Ok(added)
}
