//! HTML to markdown and plain-text conversion

use super::metadata::collapse_whitespace;
use scraper::{Html, Node, Selector};

/// Tags whose content is never article text
const NON_CONTENT_TAGS: &[&str] = &["script", "style", "noscript", "template", "iframe", "svg"];

/// Converts an HTML fragment to markdown, dropping non-content tags
///
/// Returns `None` if conversion fails; callers fall through to the next
/// strategy in that case.
pub fn html_to_markdown(html: &str) -> Option<String> {
    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(NON_CONTENT_TAGS.to_vec())
        .build();

    match converter.convert(html) {
        Ok(markdown) => Some(tidy_markdown(&markdown)),
        Err(e) => {
            tracing::debug!("Markdown conversion failed: {}", e);
            None
        }
    }
}

/// Outer HTML of the document body, or the whole document if it has none
pub fn body_html(document: &Html) -> String {
    Selector::parse("body")
        .ok()
        .and_then(|selector| document.select(&selector).next().map(|body| body.html()))
        .unwrap_or_else(|| document.root_element().html())
}

/// Visible text of the body, one paragraph per text node
///
/// Whitespace inside each node is collapsed and empty nodes are dropped, so
/// the result is plain markdown paragraphs.
pub fn plain_text(document: &Html) -> String {
    let root = Selector::parse("body")
        .ok()
        .and_then(|selector| document.select(&selector).next())
        .unwrap_or_else(|| document.root_element());

    let mut paragraphs = Vec::new();
    for node in root.descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };

        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .map_or(false, |element| NON_CONTENT_TAGS.contains(&element.name()))
        });
        if hidden {
            continue;
        }

        let text = collapse_whitespace(text);
        if !text.is_empty() {
            paragraphs.push(text);
        }
    }

    paragraphs.join("\n\n")
}

/// Trims trailing spaces and squeezes runs of blank lines to one
fn tidy_markdown(markdown: &str) -> String {
    let mut out = String::with_capacity(markdown.len());
    let mut blank_run = 0;

    for line in markdown.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }

    out.trim().to_string()
}
