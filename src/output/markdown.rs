//! Markdown archive files
//!
//! Each successfully extracted article becomes one file:
//!
//! ```text
//! <archive-dir>/<YYYY>/<MM>/<YYYY-MM-DD>__<slug>__<safe-title>.md
//! ```
//!
//! The file opens with front matter describing where and how it was captured.

use crate::extract::ExtractionResult;
use crate::{HarvestError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Longest file-name title, in characters
const MAX_TITLE_CHARS: usize = 80;

/// Byte budgets for the title and slug parts of a file name
///
/// With the date, separators, `.md` and the `.tmp` suffix the name stays
/// well under the 255-byte limit of common filesystems.
const MAX_TITLE_BYTES: usize = 120;
const MAX_SLUG_BYTES: usize = 60;

/// Writes extracted articles under a dated directory tree
#[derive(Debug, Clone)]
pub struct ArchiveWriter {
    root: PathBuf,
}

impl ArchiveWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Writes one article and returns the path it landed at
    ///
    /// The document goes to a temporary sibling first and is renamed into
    /// place, so a crash never leaves a truncated article behind.
    pub fn write(&self, result: &ExtractionResult, captured_at: DateTime<Utc>) -> Result<PathBuf> {
        let path = archive_path(&self.root, result, captured_at);
        let document = render_document(result, captured_at);

        write_atomically(&path, document.as_bytes()).map_err(|source| HarvestError::Archive {
            path: path.display().to_string(),
            source,
        })?;

        tracing::debug!(url = %result.url, "Archived to {}", path.display());
        Ok(path)
    }
}

/// Where an article captured at `captured_at` is stored
pub fn archive_path(root: &Path, result: &ExtractionResult, captured_at: DateTime<Utc>) -> PathBuf {
    let slug = result
        .url
        .slug()
        .map(|slug| truncate_to_bytes(sanitize_filename(slug), MAX_SLUG_BYTES))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "index".to_string());

    let title = sanitize_filename(display_title(result));
    let title = if title.is_empty() {
        "Untitled".to_string()
    } else {
        title
    };

    root.join(captured_at.format("%Y").to_string())
        .join(captured_at.format("%m").to_string())
        .join(format!(
            "{}__{}__{}.md",
            captured_at.format("%Y-%m-%d"),
            slug,
            title
        ))
}

/// Front matter followed by the markdown body
pub fn render_document(result: &ExtractionResult, captured_at: DateTime<Utc>) -> String {
    let metadata = &result.metadata;
    let method = result.stage.map(|stage| stage.as_str()).unwrap_or("none");

    let mut doc = String::new();
    doc.push_str("---\n");
    doc.push_str(&format!("source_url: {}\n", result.url));
    doc.push_str(&format!(
        "captured_at: {}\n",
        captured_at.to_rfc3339_opts(SecondsFormat::Millis, true)
    ));
    doc.push_str(&format!("title: \"{}\"\n", escape_quotes(display_title(result))));
    doc.push_str(&format!(
        "category: \"{}\"\n",
        escape_quotes(metadata.category.as_deref().unwrap_or("unknown"))
    ));
    doc.push_str(&format!("is_premium: {}\n", metadata.is_premium));
    doc.push_str(&format!(
        "publish_date: {}\n",
        metadata.publish_date.as_deref().unwrap_or("null")
    ));
    doc.push_str(&format!("conversion_method: {}\n", method));
    doc.push_str(&format!("file_hash: {}\n", content_hash(&result.markdown)));
    doc.push_str("---\n\n");
    doc.push_str(&result.markdown);
    doc.push('\n');
    doc
}

/// First 16 hex characters of the SHA-256 of the body
pub fn content_hash(markdown: &str) -> String {
    let digest = Sha256::digest(markdown.as_bytes());
    let mut hash = hex::encode(digest);
    hash.truncate(16);
    hash
}

/// Strips control and reserved characters, turns whitespace into `-`, and
/// truncates to 80 characters or 120 bytes, whichever is shorter
pub fn sanitize_filename(value: &str) -> String {
    let mut out = String::new();
    let mut in_space = false;

    for c in value.chars() {
        if c.is_control() || matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*') {
            continue;
        }
        if c.is_whitespace() {
            if !in_space {
                out.push('-');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }

    let out: String = out.chars().take(MAX_TITLE_CHARS).collect();
    truncate_to_bytes(out, MAX_TITLE_BYTES)
}

/// Cuts `value` to at most `max_bytes`, on a character boundary
fn truncate_to_bytes(mut value: String, max_bytes: usize) -> String {
    if value.len() > max_bytes {
        let mut end = max_bytes;
        while !value.is_char_boundary(end) {
            end -= 1;
        }
        value.truncate(end);
    }
    value
}

fn display_title(result: &ExtractionResult) -> &str {
    result.metadata.title.as_deref().unwrap_or("Untitled")
}

fn escape_quotes(value: &str) -> String {
    value.replace('"', "\\\"")
}

fn write_atomically(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    {
        let mut file = File::create(&tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }

    std::fs::rename(&tmp_path, path)
}
