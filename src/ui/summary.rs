//! Text shown on the dashboard: phase labels, the status line and the
//! posture summary card.

use crate::app::{Mode, Phase, SessionState};
use crate::uploader::AnalysisSummary;

pub fn phase_label(phase: Phase) -> &'static str {
    match phase {
        Phase::Idle => "Idle",
        Phase::Recording => "Recording",
        Phase::Uploading => "Analyzing video, please wait\u{2026}",
        Phase::Result => "Result ready",
    }
}

pub fn mode_label(mode: Mode) -> &'static str {
    match mode {
        Mode::Upload => "Upload Video",
        Mode::Record => "Record Video",
    }
}

/// One-line description of what the session is doing.
pub fn status_line(state: &SessionState) -> String {
    let mut line = phase_label(state.phase()).to_string();
    if let Some(file) = state.selected_file() {
        let size = human_bytes(file.len() as u64);
        line.push_str(&format!(" \u{2022} {} ({size})", file.name()));
    }
    if let Some(capture) = state.capture() {
        let size = human_bytes(capture.feed().bytes_captured());
        line.push_str(&format!(" \u{2022} {} chunk(s), {size}", capture.chunk_count()));
    }
    if let Some(upload) = state.in_flight() {
        line.push_str(&format!(" \u{2022} sending {}", upload.payload_name));
    }
    line
}

pub fn human_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1_048_576 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / 1_048_576.0)
    }
}

/// Render a posture summary the way the results card shows it.
pub fn render_summary(summary: &AnalysisSummary) -> String {
    let mut out = String::from("Posture Summary\n");
    out.push_str(&format!("  Total Frames:       {}\n", summary.total_frames));
    out.push_str(&format!("  Bad Posture Frames: {}\n", summary.bad_posture_frames));
    out.push_str("  Issues Detected:\n");

    let mut issues: Vec<_> = summary.issue_counts.iter().collect();
    issues.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    if issues.is_empty() {
        out.push_str("    none\n");
    }
    for (label, count) in issues {
        out.push_str(&format!("    {label}: {count} times\n"));
    }

    if !summary.bad_posture_timestamps.is_empty() {
        let shown: Vec<String> = summary
            .bad_posture_timestamps
            .iter()
            .take(10)
            .map(|t| format!("{t:.2}s"))
            .collect();
        let more = summary.bad_posture_timestamps.len().saturating_sub(shown.len());
        out.push_str(&format!("  Bad posture at: {}", shown.join(", ")));
        if more > 0 {
            out.push_str(&format!(" (+{more} more)"));
        }
        out.push('\n');
    }
    out
}
