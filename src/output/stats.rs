//! Task table and sink statistics reporting

use crate::state::{Task, TaskStatus};
use crate::storage::SinkStatistics;

/// Formats tasks as a fixed-width table
///
/// # Arguments
///
/// * `tasks` - Tasks in the order they should be listed
///
/// # Returns
///
/// The table text, one line per task after the header
pub fn format_task_table(tasks: &[Task]) -> String {
    let width = tasks
        .iter()
        .map(|t| t.keyword.chars().count())
        .max()
        .unwrap_or(0)
        .max("KEYWORD".len());

    let mut table = format!(
        "{:<width$}  {:<8}  {:>5}  {:>8}  {}\n",
        "KEYWORD",
        "STATUS",
        "LIMIT",
        "ATTEMPTS",
        "ERROR",
        width = width
    );

    for task in tasks {
        table.push_str(&format!(
            "{:<width$}  {:<8}  {:>5}  {:>8}  {}\n",
            task.keyword,
            task.status.to_string(),
            task.requested_limit,
            task.attempts,
            task.error.as_deref().unwrap_or("-"),
            width = width
        ));
    }

    table
}

/// Prints tasks and a per-status summary to stdout
pub fn print_task_table(tasks: &[Task]) {
    println!("=== Tasks ===\n");
    print!("{}", format_task_table(tasks));
    println!();

    let count = |status: TaskStatus| tasks.iter().filter(|t| t.status == status).count();
    println!(
        "Success: {}  Failed: {}  Pending: {}  Running: {}",
        count(TaskStatus::Success),
        count(TaskStatus::Failed),
        count(TaskStatus::Pending),
        count(TaskStatus::Running)
    );
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &SinkStatistics) {
    println!("=== Harvest Statistics ===\n");

    println!("Overview:");
    println!("  Keywords: {}", stats.keywords);
    println!("  Failed keywords: {}", stats.failed_keywords);
    println!("  Records: {}", stats.records);
    println!("  Comments: {}", stats.comments);
    println!();

    let succeeded = stats.keywords.saturating_sub(stats.failed_keywords);
    let success_rate = if stats.keywords > 0 {
        (succeeded as f64 / stats.keywords as f64) * 100.0
    } else {
        0.0
    };
    let comments_per_record = if stats.records > 0 {
        stats.comments as f64 / stats.records as f64
    } else {
        0.0
    };

    println!(
        "Success Rate: {:.1}% ({} / {} keywords)",
        success_rate, succeeded, stats.keywords
    );
    println!("Comments per record: {:.1}", comments_per_record);
}
