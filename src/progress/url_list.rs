//! Newline-delimited list of discovered canonical URLs

use crate::progress::ProgressResult;
use crate::url::{normalize_url, CanonicalUrl};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes one URL per line, replacing the file atomically
///
/// The list is written to a sibling temporary file, synced, and renamed over
/// the target so a crash never leaves a half-written list behind.
pub fn write_url_list<'a, I>(path: &Path, urls: I) -> ProgressResult<usize>
where
    I: IntoIterator<Item = &'a CanonicalUrl>,
{
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = Path::new(&tmp_name);

    let mut count = 0;
    {
        let mut writer = BufWriter::new(File::create(tmp_path)?);
        for url in urls {
            writeln!(writer, "{}", url)?;
            count += 1;
        }
        writer.flush()?;
        writer.get_ref().sync_all()?;
    }

    std::fs::rename(tmp_path, path)?;
    Ok(count)
}

/// Reads a URL list, normalizing each line and dropping blanks, duplicates,
/// and lines that are not URLs
///
/// Order is preserved as written.
pub fn load_url_list(path: &Path) -> ProgressResult<Vec<CanonicalUrl>> {
    let content = std::fs::read_to_string(path)?;
    let mut seen = std::collections::HashSet::new();
    let mut urls = Vec::new();

    for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match normalize_url(line) {
            Ok(url) => {
                if seen.insert(url.clone()) {
                    urls.push(url);
                }
            }
            Err(e) => tracing::warn!("Ignoring invalid URL list entry '{}': {}", line, e),
        }
    }

    Ok(urls)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_then_load_preserves_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index").join("url_list.txt");
        let urls: Vec<CanonicalUrl> = ["/archives/9", "/archives/3", "/articles/a"]
            .iter()
            .map(|p| normalize_url(&format!("https://example.com{}", p)).unwrap())
            .collect();

        assert_eq!(write_url_list(&path, &urls).unwrap(), 3);
        assert_eq!(load_url_list(&path).unwrap(), urls);
        assert!(!dir.path().join("index").join("url_list.txt.tmp").exists());
    }

    #[test]
    fn test_load_normalizes_and_dedupes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("urls.txt");
        std::fs::write(
            &path,
            "https://example.com/archives/5?utm=1\n\nnot a url\nhttps://example.com/archives/5/\n",
        )
        .unwrap();

        let urls = load_url_list(&path).unwrap();
        assert_eq!(urls.len(), 1);
        assert_eq!(urls[0].as_str(), "https://example.com/archives/5");
    }
}
