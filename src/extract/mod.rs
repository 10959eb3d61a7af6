//! Content extraction: fetched HTML to markdown
//!
//! Extraction walks an ordered list of strategies, strongest first, and keeps
//! the first output that reaches the minimum content length:
//! 1. `Primary` isolates the main content region, then converts it
//! 2. `Secondary` converts the whole body
//! 3. `Tertiary` keeps only the visible text
//!
//! Nothing here reads the clock or a random source, so the same bytes always
//! give the same stage and the same markdown.

mod convert;
mod metadata;
mod readability;

pub use convert::{body_html, html_to_markdown, plain_text};
pub use metadata::PageMetadata;
pub use readability::main_content_html;

use crate::url::CanonicalUrl;
use scraper::Html;
use std::fmt;

/// One strategy in the fallback chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStage {
    Primary,
    Secondary,
    Tertiary,
}

impl ExtractionStage {
    /// Every stage, strongest first
    pub const CHAIN: [ExtractionStage; 3] = [Self::Primary, Self::Secondary, Self::Tertiary];

    /// Name recorded as the conversion method in logs and front matter
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "readability",
            Self::Secondary => "html-to-markdown",
            Self::Tertiary => "plain-text",
        }
    }

    /// Runs this strategy; `None` means it produced nothing at all
    fn run(&self, document: &Html) -> Option<String> {
        match self {
            Self::Primary => main_content_html(document).and_then(|html| html_to_markdown(&html)),
            Self::Secondary => html_to_markdown(&body_html(document)),
            Self::Tertiary => Some(plain_text(document)),
        }
    }
}

impl fmt::Display for ExtractionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of extracting one page
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    pub url: CanonicalUrl,

    /// Markdown body; empty when every stage fell short
    pub markdown: String,

    /// The stage whose output was kept
    pub stage: Option<ExtractionStage>,

    pub success: bool,

    pub metadata: PageMetadata,
}

/// Runs the strategy chain against fetched pages
#[derive(Debug, Clone)]
pub struct Extractor {
    min_length: usize,
    chain: Vec<ExtractionStage>,
}

impl Extractor {
    /// Creates an extractor with the full three-stage chain
    ///
    /// `min_length` is the number of characters a stage must produce to be
    /// accepted.
    pub fn new(min_length: usize) -> Self {
        Self::with_chain(min_length, ExtractionStage::CHAIN.to_vec())
    }

    /// Creates an extractor that only tries the given stages, in order
    pub fn with_chain(min_length: usize, chain: Vec<ExtractionStage>) -> Self {
        Self { min_length, chain }
    }

    /// Extracts markdown and metadata from a page
    pub fn extract(&self, url: &CanonicalUrl, html: &str) -> ExtractionResult {
        let document = Html::parse_document(html);
        let metadata = PageMetadata::from_document(&document);

        for stage in &self.chain {
            let Some(markdown) = stage.run(&document) else {
                tracing::debug!(url = %url, stage = %stage, "Stage produced nothing");
                continue;
            };

            let length = markdown.trim().chars().count();
            if length >= self.min_length {
                tracing::debug!(url = %url, stage = %stage, length, "Extraction succeeded");
                return ExtractionResult {
                    url: url.clone(),
                    markdown: markdown.trim().to_string(),
                    stage: Some(*stage),
                    success: true,
                    metadata,
                };
            }

            tracing::debug!(
                url = %url,
                stage = %stage,
                length,
                min = self.min_length,
                "Stage output below threshold"
            );
        }

        ExtractionResult {
            url: url.clone(),
            markdown: String::new(),
            stage: None,
            success: false,
            metadata,
        }
    }
}
