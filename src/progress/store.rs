//! Append-only progress store
//!
//! The progress log is the only durable record of what a harvest has done.
//! Records are appended, never rewritten; the latest record per URL wins.

use crate::progress::record::{Outcome, ProgressRecord};
use crate::progress::{ProgressError, ProgressResult};
use crate::url::CanonicalUrl;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

const CAPTURE_LOG_HEADER: [&str; 6] = ["url", "outcome", "timestamp", "retries", "method", "error"];

/// Counts of URLs by their latest outcome
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutcomeCounts {
    pub success: usize,
    pub failure: usize,
    pub skipped: usize,
}

impl OutcomeCounts {
    pub fn total(&self) -> usize {
        self.success + self.failure + self.skipped
    }
}

/// Latest record per URL, replayed from a progress log
#[derive(Debug, Clone, Default)]
pub struct ProgressSnapshot {
    latest: HashMap<CanonicalUrl, ProgressRecord>,

    /// Lines in the log that could not be parsed (torn writes)
    discarded_lines: usize,
}

impl ProgressSnapshot {
    /// Replays the log at `log_path` without opening anything for writing
    ///
    /// A missing log reads as empty and is not created.
    pub fn read(log_path: &Path) -> ProgressResult<Self> {
        if !log_path.exists() {
            return Ok(Self::default());
        }
        let (snapshot, _) = replay(log_path)?;
        Ok(snapshot)
    }

    /// Returns true if the latest record for `url` is a success
    pub fn is_done(&self, url: &CanonicalUrl) -> bool {
        self.latest.get(url).is_some_and(ProgressRecord::is_success)
    }

    /// The authoritative (latest) record for `url`
    pub fn latest(&self, url: &CanonicalUrl) -> Option<&ProgressRecord> {
        self.latest.get(url)
    }

    /// Number of distinct URLs with at least one record
    pub fn len(&self) -> usize {
        self.latest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.latest.is_empty()
    }

    pub fn discarded_lines(&self) -> usize {
        self.discarded_lines
    }

    /// Counts URLs by their latest outcome
    pub fn outcome_counts(&self) -> OutcomeCounts {
        let mut counts = OutcomeCounts::default();
        for record in self.latest.values() {
            match record.outcome {
                Outcome::Success => counts.success += 1,
                Outcome::Failure => counts.failure += 1,
                Outcome::Skipped => counts.skipped += 1,
            }
        }
        counts
    }

    /// Latest records whose outcome is not success, sorted by URL
    pub fn unfinished(&self) -> Vec<&ProgressRecord> {
        let mut records: Vec<&ProgressRecord> = self
            .latest
            .values()
            .filter(|r| !r.is_success())
            .collect();
        records.sort_by(|a, b| a.url.cmp(&b.url));
        records
    }

    /// Keeps the later of two records for the same URL; ties go to the newer append
    fn remember(&mut self, record: ProgressRecord) {
        match self.latest.get(&record.url) {
            Some(existing) if existing.timestamp > record.timestamp => {}
            _ => {
                self.latest.insert(record.url.clone(), record);
            }
        }
    }
}

/// Durable, append-only log of [`ProgressRecord`]s with a CSV mirror
pub struct ProgressStore {
    log_path: PathBuf,
    log: BufWriter<File>,
    capture: csv::Writer<File>,

    /// The authoritative view of the log, kept current on every append
    snapshot: ProgressSnapshot,

    /// Records appended since the last checkpoint
    unflushed: usize,
}

impl ProgressStore {
    /// Opens (or creates) the progress log and capture log
    ///
    /// Existing records are replayed to rebuild the latest-outcome view.
    /// A torn final line left by a crash is terminated so later appends
    /// start on a fresh line; the torn text itself is ignored.
    pub fn open(log_path: &Path, capture_path: &Path) -> ProgressResult<Self> {
        for path in [log_path, capture_path] {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
        }

        let (snapshot, torn_tail) = if log_path.exists() {
            replay(log_path)?
        } else {
            (ProgressSnapshot::default(), false)
        };

        if snapshot.discarded_lines > 0 {
            tracing::warn!(
                "Ignored {} unreadable line(s) in {}",
                snapshot.discarded_lines,
                log_path.display()
            );
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;
        let mut log = BufWriter::new(file);
        if torn_tail {
            log.write_all(b"\n")?;
            log.flush()?;
        }

        let capture = open_capture_log(capture_path)?;

        tracing::debug!(
            "Opened progress log {} ({} URLs on record)",
            log_path.display(),
            snapshot.len()
        );

        Ok(Self {
            log_path: log_path.to_path_buf(),
            log,
            capture,
            snapshot,
            unflushed: 0,
        })
    }

    /// Appends one record to the progress log and the capture log
    ///
    /// The record is serialized to a single line and written in one call.
    /// It becomes durable at the next [`checkpoint`](Self::checkpoint).
    pub fn record_outcome(
        &mut self,
        record: ProgressRecord,
        method: Option<&str>,
    ) -> ProgressResult<()> {
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');
        self.log.write_all(line.as_bytes())?;

        let retries = record.retries.to_string();
        let timestamp = record.timestamp.to_rfc3339();
        self.capture.write_record([
            record.url.as_str(),
            record.outcome.as_str(),
            timestamp.as_str(),
            retries.as_str(),
            method.unwrap_or(""),
            record.error.as_deref().unwrap_or(""),
        ])?;

        self.unflushed += 1;
        self.snapshot.remember(record);
        Ok(())
    }

    /// Flushes both logs and syncs the progress log to disk
    pub fn checkpoint(&mut self) -> ProgressResult<()> {
        self.log.flush()?;
        self.log.get_ref().sync_data()?;
        self.capture.flush()?;

        if self.unflushed > 0 {
            tracing::debug!(
                "Checkpointed {} record(s) to {}",
                self.unflushed,
                self.log_path.display()
            );
        }
        self.unflushed = 0;
        Ok(())
    }

    /// Checkpoints if at least `interval` records are pending
    ///
    /// Returns true if a checkpoint was taken.
    pub fn checkpoint_if_due(&mut self, interval: usize) -> ProgressResult<bool> {
        if self.unflushed >= interval.max(1) {
            self.checkpoint()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// The latest-record view of everything logged so far
    pub fn snapshot(&self) -> &ProgressSnapshot {
        &self.snapshot
    }

    /// Returns true if the latest record for `url` is a success
    pub fn is_done(&self, url: &CanonicalUrl) -> bool {
        self.snapshot.is_done(url)
    }

    /// The authoritative (latest) record for `url`
    pub fn latest(&self, url: &CanonicalUrl) -> Option<&ProgressRecord> {
        self.snapshot.latest(url)
    }

    /// Number of distinct URLs with at least one record
    pub fn len(&self) -> usize {
        self.snapshot.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.is_empty()
    }

    /// Records appended since the last checkpoint
    pub fn pending(&self) -> usize {
        self.unflushed
    }

    pub fn outcome_counts(&self) -> OutcomeCounts {
        self.snapshot.outcome_counts()
    }
}

impl Drop for ProgressStore {
    fn drop(&mut self) {
        if self.unflushed > 0 {
            if let Err(e) = self.checkpoint() {
                tracing::error!("Failed to flush progress log on close: {}", e);
            }
        }
    }
}

/// Replays the log, returning its snapshot and whether the file ends
/// without a newline
fn replay(path: &Path) -> ProgressResult<(ProgressSnapshot, bool)> {
    let bytes = std::fs::read(path)?;
    let torn_tail = !bytes.is_empty() && !bytes.ends_with(b"\n");
    let text = String::from_utf8_lossy(&bytes);

    let mut snapshot = ProgressSnapshot::default();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<ProgressRecord>(line) {
            Ok(record) => snapshot.remember(record),
            Err(e) => {
                tracing::debug!("Skipping unreadable progress line: {}", e);
                snapshot.discarded_lines += 1;
            }
        }
    }

    Ok((snapshot, torn_tail))
}

fn open_capture_log(path: &Path) -> ProgressResult<csv::Writer<File>> {
    let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);

    if size == 0 {
        writer.write_record(CAPTURE_LOG_HEADER)?;
        writer.flush()?;
    }

    Ok(writer)
}

impl From<csv::Error> for ProgressError {
    fn from(e: csv::Error) -> Self {
        ProgressError::Csv(e.to_string())
    }
}

#[cfg(test)]
impl ProgressStore {
    /// Swaps the log writer for a read-only handle so the next flush fails
    pub(crate) fn make_log_read_only(&mut self) -> std::io::Result<()> {
        self.log = BufWriter::new(File::open(&self.log_path)?);
        Ok(())
    }
}
