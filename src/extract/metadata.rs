//! Page metadata carried into the archive front matter

use scraper::{Html, Selector};

/// Descriptive fields scraped from an article page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMetadata {
    /// Article headline, falling back to the document `<title>`
    pub title: Option<String>,

    /// Section or tag the article is filed under
    pub category: Option<String>,

    /// Whether the page shows a members-only marker
    pub is_premium: bool,

    /// Value of the first `time[datetime]` attribute
    pub publish_date: Option<String>,
}

impl PageMetadata {
    /// Extracts metadata from a parsed document
    pub fn from_document(document: &Html) -> Self {
        let title = first_text(document, "h1, .post-title, .entry-title")
            .or_else(|| first_text(document, "title"));

        Self {
            title,
            category: first_text(document, ".category, .post-category, .tag"),
            is_premium: matches_any(document, ".premium, .lock, .members-only"),
            publish_date: first_attr(document, "time[datetime]", "datetime"),
        }
    }
}

fn first_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;

    document
        .select(&selector)
        .map(|element| collapse_whitespace(&element.text().collect::<String>()))
        .find(|text| !text.is_empty())
}

fn first_attr(document: &Html, selector: &str, attr: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;

    document
        .select(&selector)
        .filter_map(|element| element.value().attr(attr))
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

fn matches_any(document: &Html, selector: &str) -> bool {
    match Selector::parse(selector) {
        Ok(selector) => document.select(&selector).next().is_some(),
        Err(_) => false,
    }
}

/// Collapses every run of whitespace to a single space and trims the ends
pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
