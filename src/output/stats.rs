//! Statistics from the progress log and run reports
//!
//! This module provides the summaries printed after a run and by `--stats`.

use crate::crawler::{RunOutcome, RunReport};
use crate::progress::{OutcomeCounts, ProgressRecord, ProgressSnapshot};

/// Runs below this success rate (percent) get a warning
pub const LOW_SUCCESS_RATE: f64 = 70.0;

/// Summary of everything the progress log knows
#[derive(Debug, Clone)]
pub struct LogStatistics {
    /// Distinct URLs with at least one record
    pub total_urls: usize,

    /// URLs by their latest outcome
    pub counts: OutcomeCounts,

    /// Unparsable lines ignored on load
    pub discarded_lines: usize,

    /// Latest record of every URL not yet archived
    pub unfinished: Vec<ProgressRecord>,
}

impl LogStatistics {
    pub fn success_rate(&self) -> f64 {
        success_rate(self.counts.success, self.counts.total())
    }
}

/// Summarizes a replayed progress log
pub fn load_statistics(snapshot: &ProgressSnapshot) -> LogStatistics {
    LogStatistics {
        total_urls: snapshot.len(),
        counts: snapshot.outcome_counts(),
        discarded_lines: snapshot.discarded_lines(),
        unfinished: snapshot.unfinished().into_iter().cloned().collect(),
    }
}

/// Percentage of `attempted` that succeeded; 100 when nothing was attempted
pub fn success_rate(succeeded: usize, attempted: usize) -> f64 {
    if attempted == 0 {
        100.0
    } else {
        succeeded as f64 / attempted as f64 * 100.0
    }
}

/// Prints progress log statistics to stdout
pub fn print_statistics(stats: &LogStatistics) {
    println!("=== Harvest Statistics ===\n");

    println!("Overview:");
    println!("  URLs recorded: {}", stats.total_urls);
    println!("  Success: {}", stats.counts.success);
    println!("  Failure: {}", stats.counts.failure);
    println!("  Skipped: {}", stats.counts.skipped);
    if stats.discarded_lines > 0 {
        println!("  Unreadable log lines: {}", stats.discarded_lines);
    }
    println!();

    if !stats.unfinished.is_empty() {
        println!("Not archived ({}):", stats.unfinished.len());
        for record in &stats.unfinished {
            println!(
                "  [{}] {} ({} retries){}",
                record.outcome,
                record.url,
                record.retries,
                record
                    .error
                    .as_ref()
                    .map(|e| format!(": {}", e))
                    .unwrap_or_default()
            );
        }
        println!();
    }

    println!(
        "Success Rate: {:.1}% ({} / {} URLs archived)",
        stats.success_rate(),
        stats.counts.success,
        stats.counts.total()
    );
}

/// Prints the summary of a finished run, warning on a low success rate
pub fn print_run_report(report: &RunReport) {
    println!("=== Harvest Run ===\n");
    println!("  Outcome: {}", describe_outcome(report.outcome));
    println!("  Frontier: {}", report.frontier_size);
    println!("  Already done: {}", report.already_done);
    println!("  Attempted: {}", report.attempted);
    println!("  Succeeded: {}", report.succeeded);
    println!("  Failed: {}", report.failed);
    println!("  Skipped: {}", report.skipped);
    println!("  Batches: {}", report.batches);
    println!("  Duration: {:.1}s", report.duration.as_secs_f64());
    println!("  Success Rate: {:.1}%", report.success_rate());

    if report.attempted > 0 && report.success_rate() < LOW_SUCCESS_RATE {
        tracing::warn!(
            "Success rate {:.1}% is below {:.0}%; check the session and failure records",
            report.success_rate(),
            LOW_SUCCESS_RATE
        );
    }
}

fn describe_outcome(outcome: RunOutcome) -> String {
    match outcome {
        RunOutcome::Completed => "completed".to_string(),
        RunOutcome::SessionExpired { batch } => format!("session expired before batch {}", batch),
        RunOutcome::Cancelled => "cancelled".to_string(),
    }
}
