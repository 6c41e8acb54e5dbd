use std::time::Duration;

use crate::prepare::{DryRunReport, PrepareSummary, ProbeStatus};

/// Parse an indexing-service timestamp (`H:MM:SS` or `H:MM:SS.ff`) into seconds.
pub fn parse_timestamp(timestamp: &str) -> Option<f64> {
    let mut total = 0.0;
    let mut parts = 0;
    for part in timestamp.trim().split(':') {
        let value: f64 = part.parse().ok()?;
        if value < 0.0 {
            return None;
        }
        total = total * 60.0 + value;
        parts += 1;
    }
    (1..=3).contains(&parts).then_some(total)
}

pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if (secs * 10.0).round() < 600.0 {
        format!("{:.1}s", secs)
    } else {
        let total = secs.round() as u64;
        format!("{}m {}s", total / 60, total % 60)
    }
}

pub fn format_summary_readable(summary: &PrepareSummary) -> String {
    let mut output = String::new();
    output.push_str(&format!("# Prepared {} videos\n\n", summary.videos));

    output.push_str("## Videos\n\n");
    output.push_str(&format!(
        "• {} cached | {} already indexed | {} uploaded\n",
        summary.cached, summary.existing, summary.uploaded
    ));
    output.push_str(&format!(
        "• {} indexed | {} insights saved\n",
        summary.indexed, summary.insights_saved
    ));
    for name in &summary.upload_failures {
        output.push_str(&format!("• upload failed: {}\n", name));
    }
    for name in &summary.processing_failures {
        output.push_str(&format!("• processing failed: {}\n", name));
    }
    output.push('\n');

    output.push_str("## Prompt content\n\n");
    output.push_str(&format!("• {} ready\n", summary.prompt_content_ready));
    for id in &summary.prompt_content_abandoned {
        output.push_str(&format!("• gave up waiting: {}\n", id));
    }
    for id in &summary.prompt_content_failed {
        output.push_str(&format!("• failed: {}\n", id));
    }
    for id in &summary.skipped_videos {
        output.push_str(&format!("• skipped, no sections: {}\n", id));
    }
    output.push('\n');

    output.push_str("## Database\n\n");
    output.push_str(&format!(
        "**Sections:** {} | **Dimensions:** {}\n",
        summary.sections_added, summary.embeddings_size
    ));

    output
}

pub fn format_dry_run_readable(report: &DryRunReport) -> String {
    let mut output = String::new();
    for probe in &report.probes {
        let status = match &probe.status {
            ProbeStatus::Ok => "ok".to_string(),
            ProbeStatus::Failed(error) => format!("failed: {}", error),
            ProbeStatus::Skipped(reason) => format!("skipped: {}", reason),
        };
        output.push_str(&format!("## {} ({})\n\n", probe.service, status));
        for detail in &probe.details {
            output.push_str(&format!("• {}\n", detail));
        }
        if !probe.details.is_empty() {
            output.push('\n');
        }
    }
    output
}
