//! CLI output formatting.
//!
//! Each display has a `format_*` function returning lines (pure, testable
//! without capturing stdout) and a `print_*` wrapper that writes them. The
//! progress display follows the run's structure: one header line per batch,
//! indented step lines beneath it, unindented lines for the final reduction
//! and summary.

use crate::stack::{StackEvent, StackOutcome};
use std::collections::BTreeMap;
use std::time::Duration;

/// Format the extension census as an indented table.
///
/// ```text
/// File types
///     CR3    48 files
///     jpg    25 files
///     txt    1 file
/// ```
pub fn format_census(counts: &BTreeMap<String, usize>) -> Vec<String> {
    if counts.is_empty() {
        return vec!["No files found".to_string()];
    }
    let width = counts.keys().map(|k| k.len()).max().unwrap_or(0);
    let mut lines = vec!["File types".to_string()];
    for (ext, count) in counts {
        let noun = if *count == 1 { "file" } else { "files" };
        lines.push(format!("    {ext:<width$}    {count} {noun}"));
    }
    lines
}

/// Format one progress event. May return no lines.
pub fn format_stack_event(event: &StackEvent) -> Vec<String> {
    match event {
        StackEvent::RunStarted { inputs, batches } => {
            vec![format!(
                "Stacking {inputs} images in {batches} {}",
                plural(*batches, "batch", "batches")
            )]
        }
        StackEvent::BatchStarted {
            index,
            batches,
            files,
        } => vec![format!(
            "Batch {}/{} ({files} {})",
            index + 1,
            batches,
            plural(*files, "image", "images")
        )],
        StackEvent::Developing { files, .. } => {
            vec![format!("    developing {files} RAW files")]
        }
        StackEvent::Aligning { .. } => vec!["    aligning".to_string()],
        StackEvent::Fusing { artifact, .. } => vec![format!("    fusing → {artifact}")],
        StackEvent::FinalAligning { artifacts } => {
            vec![format!("Final reduction: aligning {artifacts} batch artifacts")]
        }
        StackEvent::FinalFusing { output } => {
            vec![format!("Final reduction: fusing → {output}")]
        }
        StackEvent::MetadataCopied { donor } => {
            vec![format!("Metadata copied from {donor}")]
        }
        StackEvent::MetadataFailed { donor, error } => {
            vec![format!("Metadata copy from {donor} failed: {error}")]
        }
    }
}

/// Format the end-of-run summary.
pub fn format_summary(outcome: &StackOutcome) -> Vec<String> {
    let metadata = if outcome.metadata_applied {
        "copied".to_string()
    } else {
        "copy failed (image is still valid)".to_string()
    };
    vec![
        format!(
            "Stacked {} images → {}",
            outcome.input_count, outcome.final_image
        ),
        format!(
            "    Batch artifacts retained: {}",
            outcome.batch_artifacts.join(", ")
        ),
        format!("    Metadata: {metadata}"),
        format!("    Elapsed: {}", format_duration(outcome.elapsed)),
    ]
}

pub fn print_census(counts: &BTreeMap<String, usize>) {
    for line in format_census(counts) {
        println!("{line}");
    }
}

pub fn print_summary(outcome: &StackOutcome) {
    for line in format_summary(outcome) {
        println!("{line}");
    }
}

fn plural<'a>(count: usize, one: &'a str, many: &'a str) -> &'a str {
    if count == 1 { one } else { many }
}

/// Render a duration as `1h 02m 05s` / `3m 12s` / `45s`.
fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{hours}h {minutes:02}m {seconds:02}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds:02}s")
    } else {
        format!("{seconds}s")
    }
}
