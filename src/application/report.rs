use crate::domain::jobs::{ItemOutcome, ItemReport, RunSummary};
use serde_json::{json, Value};
use std::fmt::Write as _;
use std::path::Path;

/// One human readable line per item.
pub fn item_line(report: &ItemReport) -> String {
    match &report.outcome {
        ItemOutcome::Succeeded(job) => format!(
            "#{} succeeded: {} ({:.2}s narration, footage from {:.2}s{})",
            report.index,
            job.output_path.display(),
            job.narration.duration,
            job.segment.start(),
            if job.segment.is_wrapped() { ", wrapped" } else { "" }
        ),
        ItemOutcome::Skipped { duration, ceiling } => format!(
            "#{} skipped: narration {:.2}s reaches the {:.2}s ceiling",
            report.index, duration, ceiling
        ),
        ItemOutcome::Failed(e) => format!("#{} failed ({}): {}", report.index, e.kind(), e),
    }
}

pub fn render_text(summary: &RunSummary) -> String {
    let mut out = String::new();
    for report in &summary.reports {
        let _ = writeln!(out, "{}", item_line(report));
    }
    let _ = writeln!(
        out,
        "run {}: {} items, {} succeeded, {} skipped, {} failed",
        summary.run_id,
        summary.total(),
        summary.succeeded,
        summary.skipped,
        summary.failed
    );
    out
}

fn item_json(report: &ItemReport) -> Value {
    match &report.outcome {
        ItemOutcome::Succeeded(job) => json!({
            "index": report.index,
            "status": "succeeded",
            "output": job.output_path,
            "narration_duration": job.narration.duration,
            "segment": job.segment,
        }),
        ItemOutcome::Skipped { duration, ceiling } => json!({
            "index": report.index,
            "status": "skipped",
            "narration_duration": duration,
            "ceiling": ceiling,
        }),
        ItemOutcome::Failed(e) => json!({
            "index": report.index,
            "status": "failed",
            "kind": e.kind(),
            "error": e.to_string(),
        }),
    }
}

pub fn to_json(summary: &RunSummary) -> Value {
    json!({
        "run_id": summary.run_id,
        "total": summary.total(),
        "succeeded": summary.succeeded,
        "skipped": summary.skipped,
        "failed": summary.failed,
        "items": summary.reports.iter().map(item_json).collect::<Vec<_>>(),
    })
}

pub async fn write_json(summary: &RunSummary, path: &Path) -> std::io::Result<()> {
    let body = serde_json::to_vec_pretty(&to_json(summary))?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, body).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::jobs::{ItemError, NarrationClip, OutputJob};
    use crate::domain::timeline::{Segment, TimeRange};
    use std::path::PathBuf;
    use tempfile::tempdir;
    use uuid::Uuid;

    fn summary() -> RunSummary {
        let reports = vec![
            ItemReport {
                index: 2,
                outcome: ItemOutcome::Skipped {
                    duration: 61.0,
                    ceiling: 58.0,
                },
            },
            ItemReport {
                index: 1,
                outcome: ItemOutcome::Succeeded(OutputJob {
                    index: 1,
                    segment: Segment::Wrapped {
                        first: TimeRange::new(90.0, 100.0),
                        second: TimeRange::new(0.0, 5.0),
                    },
                    narration: NarrationClip {
                        audio_path: PathBuf::from("narration_1.wav"),
                        duration: 15.0,
                    },
                    output_path: PathBuf::from("output1.mp4"),
                }),
            },
            ItemReport {
                index: 3,
                outcome: ItemOutcome::Failed(ItemError::Cancelled),
            },
        ];
        RunSummary::from_reports(Uuid::new_v4(), reports)
    }

    #[test]
    fn test_text_report() {
        let text = render_text(&summary());
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("#1 succeeded: output1.mp4"));
        assert!(lines[0].ends_with(", wrapped)"));
        assert!(lines[1].starts_with("#2 skipped"));
        assert_eq!(lines[2], "#3 failed (cancelled): cancelled before completion");
        assert!(lines[3].ends_with("3 items, 1 succeeded, 1 skipped, 1 failed"));
    }

    #[test]
    fn test_json_report() {
        let value = to_json(&summary());

        assert_eq!(value["total"], 3);
        assert_eq!(value["items"][0]["status"], "succeeded");
        assert_eq!(value["items"][0]["segment"]["kind"], "wrapped");
        assert_eq!(value["items"][1]["ceiling"], 58.0);
        assert_eq!(value["items"][2]["kind"], "cancelled");
    }

    #[tokio::test]
    async fn test_write_json_creates_parent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reports").join("summary.json");

        write_json(&summary(), &path).await.unwrap();

        let written: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(written["failed"], 1);
    }
}
