//! Human and JSON renderings of plans, outcomes and failures.

use serde_json::json;

use crate::errors::ArchiveError;
use crate::orchestrator::RunOutcome;
use crate::ui;
use crate::workflow::PlanPreview;

/// Summary printed before a run (and by `--dry-run`).
pub fn plan_summary_lines(preview: &PlanPreview) -> Vec<String> {
    vec![
        format!("Current branch: {}", preview.current_branch),
        format!("Commit branch: {}", preview.plan.source_branch()),
        format!("File name: {}", preview.plan.file_name()),
        format!("Full path: {}", preview.plan.destination().display()),
    ]
}

pub fn outcome_lines(outcome: &RunOutcome) -> Vec<String> {
    match outcome {
        RunOutcome::Archived {
            path,
            size_bytes,
            files,
            ..
        } => {
            let mut v: Vec<String> = files.iter().map(|f| format!("Copied: {f}")).collect();
            v.push(format!("Archive created: {}", path.display()));
            v.push(format!("Size: {size_bytes} bytes"));
            v
        }
        RunOutcome::NothingToCompress { .. } => vec!["No files to compress".to_string()],
    }
}

pub fn print_plan(preview: &PlanPreview) {
    for l in plan_summary_lines(preview) {
        println!("{l}");
    }
}

/// Print the outcome: result lines on stdout, per-file warnings and the final notice on stderr.
pub fn print_outcome(outcome: &RunOutcome) {
    for l in outcome_lines(outcome) {
        println!("{l}");
    }
    for w in outcome.warnings() {
        if w.is_missing() {
            ui::warn_print(&format!("File not found: {}", w.path));
        } else {
            ui::warn_print(&format!("{}: {}", w.path, w.reason));
        }
    }
    match outcome {
        RunOutcome::Archived { path, .. } => {
            ui::notify_success(&format!("Archive ready: {}", path.display()))
        }
        RunOutcome::NothingToCompress { changed, .. } => ui::notify_info(&format!(
            "none of the {changed} changed file(s) exist on the source branch; no archive written"
        )),
    }
}

pub fn outcome_json(preview: Option<&PlanPreview>, outcome: &RunOutcome) -> serde_json::Value {
    json!({
        "plan": preview,
        "outcome": outcome,
    })
}

pub fn error_json(err: &ArchiveError) -> serde_json::Value {
    json!({
        "outcome": {
            "status": "error",
            "message": err.to_string(),
            "exit_code": err.exit_code(),
            "requires_manual_recovery": err.requires_manual_recovery(),
            "guidance": err.guidance(),
        }
    })
}

pub fn print_error(err: &ArchiveError) {
    ui::notify_error(&err.to_string(), &err.guidance());
}
