//! Main-content isolation by paragraph scoring
//!
//! Every paragraph with enough text awards points to its parent and half as
//! much to its grandparent. Candidates are then weighted by tag, class and id
//! hints, and penalized by the share of their text that sits inside links.
//! The winner, plus any strong siblings, is the article body.
//!
//! Candidates are kept in document order and ties go to the earlier one, so
//! the same input always yields the same region.

use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;

/// Paragraphs shorter than this contribute nothing
const MIN_PARAGRAPH_CHARS: usize = 25;

/// Below this score no region is considered article content
const MIN_CANDIDATE_SCORE: f64 = 20.0;

const POSITIVE_HINTS: &[&str] = &[
    "article", "body", "content", "entry", "main", "page", "post", "story", "text",
];

const NEGATIVE_HINTS: &[&str] = &[
    "ad-", "banner", "combx", "comment", "footer", "menu", "meta", "nav", "related", "share",
    "sidebar", "social", "sponsor", "widget",
];

/// Returns the outer HTML of the main content region, if one stands out
pub fn main_content_html(document: &Html) -> Option<String> {
    let paragraphs = Selector::parse("p, pre, blockquote").ok()?;

    let mut candidates: Vec<(ElementRef, f64)> = Vec::new();
    let mut index = HashMap::new();

    for paragraph in document.select(&paragraphs) {
        let text = paragraph.text().collect::<String>();
        let text_len = text.trim().chars().count();
        if text_len < MIN_PARAGRAPH_CHARS {
            continue;
        }

        let points = 1.0 + text.matches(',').count() as f64 + (text_len as f64 / 100.0).min(3.0);

        let parent = paragraph.parent().and_then(ElementRef::wrap);
        let grandparent = parent.and_then(|p| p.parent()).and_then(ElementRef::wrap);

        for (ancestor, share) in [(parent, 1.0), (grandparent, 0.5)] {
            let Some(ancestor) = ancestor else { continue };
            let slot = *index.entry(ancestor.id()).or_insert_with(|| {
                candidates.push((ancestor, initial_score(ancestor)));
                candidates.len() - 1
            });
            candidates[slot].1 += points * share;
        }
    }

    let mut best: Option<(ElementRef, f64)> = None;
    for (candidate, score) in &candidates {
        let adjusted = score * (1.0 - link_density(*candidate));
        if best.map_or(true, |(_, top)| adjusted > top) {
            best = Some((*candidate, adjusted));
        }
    }

    let (top, top_score) = best?;
    if top_score < MIN_CANDIDATE_SCORE {
        return None;
    }

    tracing::trace!("Main content <{}> scored {:.1}", top.value().name(), top_score);
    Some(join_siblings(top, top_score, &candidates))
}

/// Appends siblings of the winner that look like part of the same article
fn join_siblings(top: ElementRef, top_score: f64, candidates: &[(ElementRef, f64)]) -> String {
    let Some(parent) = top.parent().and_then(ElementRef::wrap) else {
        return top.html();
    };

    let threshold = (top_score * 0.2).max(10.0);
    let mut html = String::new();

    for sibling in parent.children().filter_map(ElementRef::wrap) {
        let keep = if sibling == top {
            true
        } else if let Some((_, score)) = candidates.iter().find(|(c, _)| *c == sibling) {
            score * (1.0 - link_density(sibling)) >= threshold
        } else if sibling.value().name() == "p" {
            let len = sibling.text().collect::<String>().trim().chars().count();
            len > 80 && link_density(sibling) < 0.25
        } else {
            false
        };

        if keep {
            html.push_str(&sibling.html());
        }
    }

    html
}

/// Starting score from the element's tag and its class and id hints
fn initial_score(element: ElementRef) -> f64 {
    base_tag_score(element.value().name()) + class_id_weight(element)
}

fn base_tag_score(tag: &str) -> f64 {
    match tag {
        "article" => 10.0,
        "div" | "section" | "main" => 5.0,
        "pre" | "td" | "blockquote" => 3.0,
        "address" | "form" | "ol" | "ul" | "dl" | "dd" | "dt" | "li" => -3.0,
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "th" | "header" | "footer" | "nav" | "aside" => {
            -5.0
        }
        _ => 0.0,
    }
}

fn class_id_weight(element: ElementRef) -> f64 {
    let mut weight = 0.0;
    let attrs = [element.value().attr("class"), element.value().id()];

    for value in attrs.into_iter().flatten() {
        let value = value.to_ascii_lowercase();
        if NEGATIVE_HINTS.iter().any(|hint| value.contains(hint)) {
            weight -= 25.0;
        }
        if POSITIVE_HINTS.iter().any(|hint| value.contains(hint)) {
            weight += 25.0;
        }
    }

    weight
}

/// Share of the element's text that is link text, in `0.0..=1.0`
fn link_density(element: ElementRef) -> f64 {
    let total = element.text().map(|t| t.trim().chars().count()).sum::<usize>();
    if total == 0 {
        return 0.0;
    }

    let Ok(links) = Selector::parse("a") else {
        return 0.0;
    };
    let linked = element
        .select(&links)
        .flat_map(|a| a.text())
        .map(|t| t.trim().chars().count())
        .sum::<usize>();

    (linked as f64 / total as f64).min(1.0)
}
