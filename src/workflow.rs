//! Entry point for "archive the files touched by commit X".

use std::path::PathBuf;

use serde::Serialize;

use crate::emit::{resolve_shell, script_emitter, PlatformEmitter, Toolset};
use crate::errors::ArchiveError;
use crate::inspect::RepositoryInspector;
use crate::lock::acquire_run_lock;
use crate::orchestrator::{run_script, ArchiveOrchestrator, RunOutcome};
use crate::plan::{build_plan, ExecutionPlan};
use crate::sanitize::ShellFlavor;
use crate::CommandRunner;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// Orchestrator runs each step as its own invocation (or in-process).
    #[default]
    Steps,
    /// One rendered script runs the whole workflow in a shell.
    Script,
}

#[derive(Debug, Clone)]
pub struct ArchiveRequest {
    pub commit: String,
    pub workspace_root: PathBuf,
    pub toolset: Toolset,
    pub mode: ExecutionMode,
    /// Interpreter override for script mode with the in-process toolset.
    pub shell: Option<PathBuf>,
}

/// What is about to happen, shown before any mutation.
#[derive(Debug, Clone, Serialize)]
pub struct PlanPreview {
    pub current_branch: String,
    #[serde(flatten)]
    pub plan: ExecutionPlan,
}

/// Validate the commit and build the plan without touching the working tree.
pub fn prepare(
    runner: &dyn CommandRunner,
    commit: &str,
    workspace_root: &std::path::Path,
) -> Result<PlanPreview, ArchiveError> {
    let inspector = RepositoryInspector::new(runner, workspace_root);
    let plan = build_plan(&inspector, commit, workspace_root)?;
    let current_branch = inspector.current_branch()?;
    Ok(PlanPreview {
        current_branch,
        plan,
    })
}

/// Emitter used to render or run the whole-workflow script for `toolset`.
///
/// The in-process toolset has no shell of its own; it borrows the host flavor's interpreter.
pub fn script_emitter_for(
    toolset: &Toolset,
    shell: Option<&std::path::Path>,
) -> Result<Box<dyn PlatformEmitter>, ArchiveError> {
    match toolset {
        Toolset::Posix(e) => Ok(Box::new(e.clone())),
        Toolset::PowerShell(e) => Ok(Box::new(e.clone())),
        Toolset::Native => {
            let flavor = ShellFlavor::host();
            let interpreter = resolve_shell(flavor, shell).ok_or_else(|| {
                ArchiveError::BackendUnavailable(format!(
                    "no {} interpreter found in PATH",
                    flavor.as_str()
                ))
            })?;
            Ok(script_emitter(flavor, interpreter))
        }
    }
}

/// Run the whole workflow under the repository run lock.
///
/// `on_plan` sees the preview after validation and before the first mutation.
pub fn archive_commit(
    runner: &dyn CommandRunner,
    req: &ArchiveRequest,
    on_plan: impl FnOnce(&PlanPreview),
) -> Result<RunOutcome, ArchiveError> {
    let commit = req.commit.trim();
    if commit.is_empty() {
        return Err(ArchiveError::InputMissing);
    }
    let inspector = RepositoryInspector::new(runner, &req.workspace_root);
    inspector.ensure_repository()?;
    let git_dir = inspector.git_dir()?;
    let _lock = acquire_run_lock(&git_dir)?;

    let preview = prepare(runner, commit, &req.workspace_root)?;
    on_plan(&preview);
    tracing::info!(
        commit,
        branch = preview.plan.source_branch(),
        toolset = req.toolset.name(),
        mode = ?req.mode,
        "archive run starting"
    );

    match req.mode {
        ExecutionMode::Steps => {
            ArchiveOrchestrator::new(runner, req.toolset.clone()).run(&preview.plan)
        }
        ExecutionMode::Script => {
            let emitter = script_emitter_for(&req.toolset, req.shell.as_deref())?;
            run_script(runner, emitter.as_ref(), &preview.plan)
        }
    }
}
